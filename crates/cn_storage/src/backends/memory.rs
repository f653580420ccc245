use async_trait::async_trait;
use cn_core::{Article, ArticleStore, Coordinates, EventStore, Limit, Result, UserEvent};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::ranking;
use crate::StorageBackend;

#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
    events: Vec<UserEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(&self, filter: impl Fn(&Article) -> bool) -> Vec<Article> {
        let mut articles: Vec<Article> =
            self.articles.iter().filter(|a| filter(a)).cloned().collect();
        articles.sort_by(ranking::by_recency);
        articles
    }

    pub fn find_all(&self, limit: Limit) -> Vec<Article> {
        limit.apply(self.sorted(|_| true))
    }

    pub fn find_by_category(&self, pattern: &str, limit: Limit) -> Vec<Article> {
        limit.apply(self.sorted(|a| ranking::matches_category(a, pattern)))
    }

    pub fn find_by_source(&self, pattern: &str, limit: Limit) -> Vec<Article> {
        limit.apply(self.sorted(|a| ranking::contains_ignore_case(&a.source_name, pattern)))
    }

    pub fn find_by_score(&self, threshold: f64, limit: Limit) -> Vec<Article> {
        let mut articles: Vec<Article> = self
            .articles
            .iter()
            .filter(|a| a.relevance_score >= threshold)
            .cloned()
            .collect();
        articles.sort_by(ranking::by_relevance);
        limit.apply(articles)
    }

    pub fn search(&self, text: &str, limit: Limit) -> Vec<Article> {
        let terms = ranking::search_terms(text);
        if terms.is_empty() {
            return Vec::new();
        }
        limit.apply(ranking::rank_search(self.articles.clone(), &terms))
    }

    pub fn find_nearby(&self, center: Coordinates, radius_km: f64, limit: Limit) -> Vec<Article> {
        limit.apply(ranking::rank_nearby(self.articles.clone(), &center, radius_km))
    }

    pub fn find_by_ids(&self, ids: &[String]) -> Vec<Article> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.sorted(|a| wanted.contains(a.id.as_str()))
    }

    pub fn insert_articles(&mut self, articles: &[Article]) -> usize {
        for article in articles {
            if let Some(existing) = self.articles.iter_mut().find(|a| a.id == article.id) {
                *existing = article.clone();
            } else {
                self.articles.push(article.clone());
            }
        }
        articles.len()
    }

    pub fn clear_articles(&mut self) {
        self.articles.clear();
    }

    pub fn insert_event(&mut self, event: &UserEvent) {
        self.events.push(event.clone());
    }

    pub fn events(&self) -> Vec<UserEvent> {
        let mut events = self.events.clone();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        events
    }
}

/// Process-local storage; contents are lost on exit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_articles(articles: &[Article]) -> Self {
        let storage = Self::new();
        storage.store.write().await.insert_articles(articles);
        storage
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn name() -> &'static str {
        "memory"
    }

    async fn connect(_url: Option<&str>) -> Result<Self> {
        Ok(Self::new())
    }
}

#[async_trait]
impl ArticleStore for InMemoryStorage {
    async fn find_all(&self, limit: Limit) -> Result<Vec<Article>> {
        debug!("'Data Layer': Fetching latest news articles...");
        Ok(self.store.read().await.find_all(limit))
    }

    async fn find_by_category(&self, pattern: &str, limit: Limit) -> Result<Vec<Article>> {
        debug!("'Data Layer': Fetching news articles by category...");
        Ok(self.store.read().await.find_by_category(pattern, limit))
    }

    async fn find_by_source(&self, pattern: &str, limit: Limit) -> Result<Vec<Article>> {
        debug!("'Data Layer': Fetching news articles by source...");
        Ok(self.store.read().await.find_by_source(pattern, limit))
    }

    async fn find_by_score(&self, threshold: f64, limit: Limit) -> Result<Vec<Article>> {
        debug!("'Data Layer': Fetching news articles by score...");
        Ok(self.store.read().await.find_by_score(threshold, limit))
    }

    async fn search(&self, text: &str, limit: Limit) -> Result<Vec<Article>> {
        debug!("'Data Layer': Searching news articles...");
        Ok(self.store.read().await.search(text, limit))
    }

    async fn find_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: Limit,
    ) -> Result<Vec<Article>> {
        debug!("'Data Layer': Fetching nearby news articles...");
        let center = Coordinates::new(latitude, longitude);
        Ok(self.store.read().await.find_nearby(center, radius_km, limit))
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Article>> {
        Ok(self.store.read().await.find_by_ids(ids))
    }

    async fn insert_articles(&self, articles: &[Article]) -> Result<usize> {
        Ok(self.store.write().await.insert_articles(articles))
    }

    async fn clear_articles(&self) -> Result<()> {
        self.store.write().await.clear_articles();
        Ok(())
    }
}

#[async_trait]
impl EventStore for InMemoryStorage {
    async fn insert_event(&self, event: &UserEvent) -> Result<()> {
        debug!("'Data Layer': Inserting user event...");
        self.store.write().await.insert_event(event);
        Ok(())
    }

    async fn find_all_events(&self) -> Result<Vec<UserEvent>> {
        debug!("'Data Layer': Fetching all user events...");
        Ok(self.store.read().await.events())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use cn_core::EventKind;

    fn article(id: &str, days_ago: i64, source: &str, category: &str, score: f64) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Title {}", id),
            description: format!("Description {}", id),
            url: format!("https://example.com/{}", id),
            publication_date: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
                - Duration::days(days_ago),
            source_name: source.to_string(),
            relevance_score: score,
            latitude: 37.4419,
            longitude: -122.1430,
            category: vec![category.to_string()],
            llm_summary: None,
        }
    }

    fn ids(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.id.as_str()).collect()
    }

    async fn storage() -> InMemoryStorage {
        InMemoryStorage::with_articles(&[
            article("a", 3, "Reuters", "Sports", 0.9),
            article("b", 1, "BBC News", "politics", 0.4),
            article("c", 2, "reuters.com", "cricket sports", 0.7),
        ])
        .await
    }

    #[tokio::test]
    async fn test_find_all_newest_first() {
        let storage = storage().await;
        assert_eq!(ids(&storage.find_all(Limit::UNBOUNDED).await.unwrap()), vec!["b", "c", "a"]);
        assert_eq!(ids(&storage.find_all(Limit::new(2)).await.unwrap()), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_find_by_category_and_source() {
        let storage = storage().await;
        assert_eq!(
            ids(&storage.find_by_category("SPORTS", Limit::UNBOUNDED).await.unwrap()),
            vec!["c", "a"]
        );
        assert_eq!(
            ids(&storage.find_by_source("reuters", Limit::new(1)).await.unwrap()),
            vec!["c"]
        );
        assert!(storage.find_by_source("AP", Limit::UNBOUNDED).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_score() {
        let storage = storage().await;
        assert_eq!(
            ids(&storage.find_by_score(0.7, Limit::UNBOUNDED).await.unwrap()),
            vec!["a", "c"]
        );
    }

    #[tokio::test]
    async fn test_find_nearby() {
        let mut far = article("far", 0, "x", "y", 0.0);
        far.latitude = 40.7128;
        far.longitude = -74.0060;
        let storage = storage().await;
        storage.insert_articles(&[far]).await.unwrap();

        let near = storage
            .find_nearby(37.4419, -122.1430, 1.0, Limit::UNBOUNDED)
            .await
            .unwrap();
        assert_eq!(ids(&near), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_find_by_ids_skips_unknown() {
        let storage = storage().await;
        let found = storage
            .find_by_ids(&["a".to_string(), "missing".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(ids(&found), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_insert_upserts_and_clear() {
        let storage = storage().await;
        let mut updated = article("a", 3, "Reuters", "Sports", 0.1);
        updated.title = "Updated".to_string();
        storage.insert_articles(&[updated]).await.unwrap();

        let all = storage.find_all(Limit::UNBOUNDED).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().any(|a| a.title == "Updated"));

        storage.clear_articles().await.unwrap();
        assert!(storage.find_all(Limit::UNBOUNDED).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_events_round_trip() {
        let storage = InMemoryStorage::new();
        let origin = Coordinates::new(1.0, 2.0);
        let first = UserEvent::new("u1", "a", EventKind::View, origin);
        let second = UserEvent::new("u1", "b", EventKind::Click, origin);
        storage.insert_event(&first).await.unwrap();
        storage.insert_event(&second).await.unwrap();

        let events = storage.find_all_events().await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].timestamp >= events[1].timestamp);
    }
}
