use cn_core::{Article, ArticleStore, Result};
use std::path::Path;
use tracing::info;

/// Reads a JSON array of articles.
pub async fn load_articles(path: &Path) -> Result<Vec<Article>> {
    let raw = tokio::fs::read_to_string(path).await?;
    let articles: Vec<Article> = serde_json::from_str(&raw)?;
    Ok(articles)
}

/// Writes `articles` into the store, first clearing it when `replace` is set.
pub async fn seed_articles(
    store: &dyn ArticleStore,
    articles: &[Article],
    replace: bool,
) -> Result<usize> {
    if replace {
        info!("Clearing existing data in the news collection");
        store.clear_articles().await?;
    }
    info!("Inserting {} news articles", articles.len());
    store.insert_articles(articles).await
}
