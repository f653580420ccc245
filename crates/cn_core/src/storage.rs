use async_trait::async_trait;
use crate::types::{Article, Limit, UserEvent};
use crate::Result;

/// Read side of the article collection plus the bulk writes used for seeding.
///
/// Every query returns a total order: ties on the strategy's sort key are
/// broken by article id ascending.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Newest first.
    async fn find_all(&self, limit: Limit) -> Result<Vec<Article>>;

    /// Case-insensitive substring match against any category, newest first.
    async fn find_by_category(&self, pattern: &str, limit: Limit) -> Result<Vec<Article>>;

    /// Case-insensitive substring match against the source name, newest first.
    async fn find_by_source(&self, pattern: &str, limit: Limit) -> Result<Vec<Article>>;

    /// Relevance at or above `threshold`, highest first.
    async fn find_by_score(&self, threshold: f64, limit: Limit) -> Result<Vec<Article>>;

    /// Text-match ranked, then by stored relevance.
    async fn search(&self, text: &str, limit: Limit) -> Result<Vec<Article>>;

    /// Within `radius_km` of the point, nearest first.
    async fn find_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: Limit,
    ) -> Result<Vec<Article>>;

    /// Articles whose id is in `ids`, newest first.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Article>>;

    /// Upsert by id. Returns the number of articles written.
    async fn insert_articles(&self, articles: &[Article]) -> Result<usize>;

    async fn clear_articles(&self) -> Result<()>;
}

/// Append-only log of user interactions.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: &UserEvent) -> Result<()>;

    /// Full history, newest first.
    async fn find_all_events(&self) -> Result<Vec<UserEvent>>;
}
