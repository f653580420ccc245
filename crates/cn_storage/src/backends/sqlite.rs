use async_trait::async_trait;
use chrono::SecondsFormat;
use cn_core::{
    format_timestamp, parse_timestamp, Article, ArticleStore, Coordinates, EventStore, Limit,
    Result, UserEvent,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::ranking;
use crate::StorageBackend;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:news.db";

/// Kilometres per degree of latitude.
const KM_PER_DEGREE: f64 = 111.195;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        url TEXT NOT NULL,
        publication_date TEXT NOT NULL,
        source_name TEXT NOT NULL,
        relevance_score REAL NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        category TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_articles_publication_date
    ON articles (publication_date)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_events (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        article_id TEXT NOT NULL,
        event_type TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        timestamp TEXT NOT NULL
    )
    "#,
];

fn storage_error(context: &str, e: impl std::fmt::Display) -> cn_core::Error {
    cn_core::Error::Storage(format!("{}: {}", context, e))
}

pub struct SQLiteStorage {
    pool: Arc<SqlitePool>,
}

#[async_trait]
impl StorageBackend for SQLiteStorage {
    fn name() -> &'static str {
        "sqlite"
    }

    async fn connect(url: Option<&str>) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url.unwrap_or(DEFAULT_DATABASE_URL))
            .map_err(|e| storage_error("Invalid database url", e))?
            .create_if_missing(true);
        Self::connect_with(options).await
    }
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| storage_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| storage_error(&format!("Failed to run migration {}", i), e))?;
        }

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Every article, newest first. SQLite's `lower()` only folds ASCII, so
    /// case-insensitive matching runs over these rows with the shared rules.
    async fn newest_first(&self, context: &str) -> Result<Vec<Article>> {
        let query =
            QueryBuilder::new("SELECT * FROM articles ORDER BY publication_date DESC, id ASC");
        self.fetch_articles(query, context).await
    }

    async fn fetch_articles(
        &self,
        mut query: QueryBuilder<'_, Sqlite>,
        context: &str,
    ) -> Result<Vec<Article>> {
        let rows = query
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| storage_error(context, e))?;
        rows.iter().map(row_to_article).collect()
    }
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    let get = |column: &str| -> Result<String> {
        row.try_get::<String, _>(column)
            .map_err(|e| storage_error("Failed to decode article", e))
    };
    let get_f64 = |column: &str| -> Result<f64> {
        row.try_get::<f64, _>(column)
            .map_err(|e| storage_error("Failed to decode article", e))
    };

    Ok(Article {
        id: get("id")?,
        title: get("title")?,
        description: get("description")?,
        url: get("url")?,
        publication_date: parse_timestamp(&get("publication_date")?)?,
        source_name: get("source_name")?,
        relevance_score: get_f64("relevance_score")?,
        latitude: get_f64("latitude")?,
        longitude: get_f64("longitude")?,
        category: serde_json::from_str(&get("category")?)?,
        llm_summary: None,
    })
}

fn row_to_event(row: &SqliteRow) -> Result<UserEvent> {
    let get = |column: &str| -> Result<String> {
        row.try_get::<String, _>(column)
            .map_err(|e| storage_error("Failed to decode user event", e))
    };
    let get_f64 = |column: &str| -> Result<f64> {
        row.try_get::<f64, _>(column)
            .map_err(|e| storage_error("Failed to decode user event", e))
    };

    Ok(UserEvent {
        id: get("id")?
            .parse()
            .map_err(|e| storage_error("Invalid event id", e))?,
        user_id: get("user_id")?,
        article_id: get("article_id")?,
        event_type: get("event_type")?.parse()?,
        latitude: get_f64("latitude")?,
        longitude: get_f64("longitude")?,
        timestamp: parse_timestamp(&get("timestamp")?)?,
    })
}

#[async_trait]
impl ArticleStore for SQLiteStorage {
    async fn find_all(&self, limit: Limit) -> Result<Vec<Article>> {
        debug!("'Data Layer': Fetching latest news articles...");
        let mut query = QueryBuilder::new(
            "SELECT * FROM articles ORDER BY publication_date DESC, id ASC LIMIT ",
        );
        query.push_bind(limit.as_sql());
        self.fetch_articles(query, "Failed to fetch latest articles").await
    }

    async fn find_by_category(&self, pattern: &str, limit: Limit) -> Result<Vec<Article>> {
        debug!("'Data Layer': Fetching news articles by category...");
        let articles = self.newest_first("Failed to fetch articles by category").await?;
        Ok(limit.apply(
            articles
                .into_iter()
                .filter(|article| ranking::matches_category(article, pattern))
                .collect(),
        ))
    }

    async fn find_by_source(&self, pattern: &str, limit: Limit) -> Result<Vec<Article>> {
        debug!("'Data Layer': Fetching news articles by source...");
        let articles = self.newest_first("Failed to fetch articles by source").await?;
        Ok(limit.apply(
            articles
                .into_iter()
                .filter(|article| ranking::contains_ignore_case(&article.source_name, pattern))
                .collect(),
        ))
    }

    async fn find_by_score(&self, threshold: f64, limit: Limit) -> Result<Vec<Article>> {
        debug!("'Data Layer': Fetching news articles by score...");
        let mut query = QueryBuilder::new("SELECT * FROM articles WHERE relevance_score >= ");
        query
            .push_bind(threshold)
            .push(" ORDER BY relevance_score DESC, id ASC LIMIT ")
            .push_bind(limit.as_sql());
        self.fetch_articles(query, "Failed to fetch articles by score").await
    }

    async fn search(&self, text: &str, limit: Limit) -> Result<Vec<Article>> {
        debug!("'Data Layer': Searching news articles...");
        let terms = ranking::search_terms(text);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.newest_first("Failed to search articles").await?;
        Ok(limit.apply(ranking::rank_search(candidates, &terms)))
    }

    async fn find_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: Limit,
    ) -> Result<Vec<Article>> {
        debug!("'Data Layer': Fetching nearby news articles...");
        let band = radius_km / KM_PER_DEGREE;
        let mut query = QueryBuilder::new("SELECT * FROM articles WHERE latitude BETWEEN ");
        query
            .push_bind(latitude - band)
            .push(" AND ")
            .push_bind(latitude + band);
        let candidates = self.fetch_articles(query, "Failed to fetch nearby articles").await?;
        let center = Coordinates::new(latitude, longitude);
        Ok(limit.apply(ranking::rank_nearby(candidates, &center, radius_km)))
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Article>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        // One JSON array bind keeps large id sets under the host-parameter limit.
        let mut query = QueryBuilder::new(
            "SELECT * FROM articles WHERE id IN (SELECT value FROM json_each(",
        );
        query
            .push_bind(serde_json::to_string(ids)?)
            .push(")) ORDER BY publication_date DESC, id ASC");
        self.fetch_articles(query, "Failed to fetch articles by id").await
    }

    async fn insert_articles(&self, articles: &[Article]) -> Result<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("Failed to start transaction", e))?;

        for article in articles {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO articles
                (id, title, description, url, publication_date, source_name,
                 relevance_score, latitude, longitude, category)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&article.id)
            .bind(&article.title)
            .bind(&article.description)
            .bind(&article.url)
            .bind(format_timestamp(&article.publication_date))
            .bind(&article.source_name)
            .bind(article.relevance_score)
            .bind(article.latitude)
            .bind(article.longitude)
            .bind(serde_json::to_string(&article.category)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("Failed to store article", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| storage_error("Failed to commit articles", e))?;
        Ok(articles.len())
    }

    async fn clear_articles(&self) -> Result<()> {
        sqlx::query("DELETE FROM articles")
            .execute(&*self.pool)
            .await
            .map_err(|e| storage_error("Failed to clear articles", e))?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for SQLiteStorage {
    async fn insert_event(&self, event: &UserEvent) -> Result<()> {
        debug!("'Data Layer': Inserting user event...");
        sqlx::query(
            r#"
            INSERT INTO user_events
            (id, user_id, article_id, event_type, latitude, longitude, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.to_string())
        .bind(&event.user_id)
        .bind(&event.article_id)
        .bind(event.event_type.as_str())
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&*self.pool)
        .await
        .map_err(|e| storage_error("Failed to insert user event", e))?;
        Ok(())
    }

    async fn find_all_events(&self) -> Result<Vec<UserEvent>> {
        debug!("'Data Layer': Fetching all user events...");
        let rows = sqlx::query("SELECT * FROM user_events ORDER BY timestamp DESC, id ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| storage_error("Failed to fetch user events", e))?;
        rows.iter().map(row_to_event).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use cn_core::EventKind;
    use tempfile::tempdir;

    fn article(id: &str, days_ago: i64, source: &str, category: &str, score: f64) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Rain report {}", id),
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

    #[tokio::test]
    async fn test_sqlite_article_queries() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("test.db"))
            .await
            .unwrap();

        storage
            .insert_articles(&[
                article("a", 3, "Reuters", "Sports", 0.9),
                article("b", 1, "BBC News", "politics", 0.4),
                article("c", 2, "reuters.com", "cricket sports", 0.7),
            ])
            .await
            .unwrap();

        assert_eq!(ids(&storage.find_all(Limit::new(2)).await.unwrap()), vec!["b", "c"]);
        assert_eq!(
            ids(&storage.find_by_category("sports", Limit::UNBOUNDED).await.unwrap()),
            vec!["c", "a"]
        );
        assert_eq!(
            ids(&storage.find_by_source("REUTERS", Limit::UNBOUNDED).await.unwrap()),
            vec!["c", "a"]
        );
        assert_eq!(
            ids(&storage.find_by_score(0.7, Limit::UNBOUNDED).await.unwrap()),
            vec!["a", "c"]
        );
        assert_eq!(
            ids(&storage.search("rain", Limit::UNBOUNDED).await.unwrap()),
            vec!["a", "c", "b"]
        );
        assert_eq!(
            ids(&storage.find_nearby(37.4419, -122.1430, 1.0, Limit::new(1)).await.unwrap()),
            vec!["a"]
        );
        assert_eq!(
            ids(&storage.find_by_ids(&["a".to_string(), "b".to_string()]).await.unwrap()),
            vec!["b", "a"]
        );

        storage.clear_articles().await.unwrap();
        assert!(storage.find_all(Limit::UNBOUNDED).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_events() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("events.db"))
            .await
            .unwrap();

        let event = UserEvent::new("u1", "a", EventKind::Click, Coordinates::new(1.0, 2.0));
        storage.insert_event(&event).await.unwrap();

        let events = storage.find_all_events().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, event.id);
        assert_eq!(events[0].event_type, EventKind::Click);
        assert_eq!(events[0].article_id, "a");
    }

    #[tokio::test]
    async fn test_non_ascii_matching_agrees_with_memory() {
        let temp_dir = tempdir().unwrap();
        let sqlite = SQLiteStorage::new_with_path(&temp_dir.path().join("unicode.db"))
            .await
            .unwrap();
        let memory = crate::InMemoryStorage::new();

        let mut munich = article("m", 0, "ÖRF Nachrichten", "ÉCONOMIE", 0.6);
        munich.title = "ÉLECTIONS À MÜNCHEN".to_string();
        let batch = [munich, article("x", 1, "Reuters", "sports", 0.5)];
        sqlite.insert_articles(&batch).await.unwrap();
        memory.insert_articles(&batch).await.unwrap();

        let stores: [&dyn ArticleStore; 2] = [&sqlite, &memory];
        for store in stores {
            let found = store.search("élections", Limit::UNBOUNDED).await.unwrap();
            assert_eq!(ids(&found), vec!["m"]);
            let found = store.find_by_source("örf", Limit::UNBOUNDED).await.unwrap();
            assert_eq!(ids(&found), vec!["m"]);
            assert_eq!(
                ids(&store.find_by_category("économie", Limit::UNBOUNDED).await.unwrap()),
                vec!["m"]
            );
        }
    }

    #[tokio::test]
    async fn test_find_by_ids_with_large_id_set() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("ids.db"))
            .await
            .unwrap();
        storage
            .insert_articles(&[
                article("a", 2, "Reuters", "sports", 0.5),
                article("b", 1, "Reuters", "sports", 0.5),
            ])
            .await
            .unwrap();

        let mut wanted: Vec<String> = (0..40_000).map(|i| format!("missing-{}", i)).collect();
        wanted.push("a".to_string());
        wanted.push("b".to_string());

        let found = storage.find_by_ids(&wanted).await.unwrap();
        assert_eq!(ids(&found), vec!["b", "a"]);
    }
}
