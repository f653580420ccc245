use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use cn_core::{Article, ArticleStore, Coordinates, Error, GeocodeResolver, Limit, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Store operations as observed by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FindAll(Limit),
    Category(String, Limit),
    Source(String, Limit),
    Score(f64, Limit),
    Search(String, Limit),
    Nearby(f64, f64, f64, Limit),
    ByIds(Vec<String>),
}

/// Records every query and answers with a fixed batch.
#[derive(Default)]
pub struct RecordingStore {
    pub calls: Mutex<Vec<Call>>,
    pub answer: Vec<Article>,
}

impl RecordingStore {
    pub fn answering(answer: Vec<Article>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            answer,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<Vec<Article>> {
        self.calls.lock().unwrap().push(call);
        Ok(self.answer.clone())
    }
}

#[async_trait]
impl ArticleStore for RecordingStore {
    async fn find_all(&self, limit: Limit) -> Result<Vec<Article>> {
        self.record(Call::FindAll(limit))
    }

    async fn find_by_category(&self, pattern: &str, limit: Limit) -> Result<Vec<Article>> {
        self.record(Call::Category(pattern.to_string(), limit))
    }

    async fn find_by_source(&self, pattern: &str, limit: Limit) -> Result<Vec<Article>> {
        self.record(Call::Source(pattern.to_string(), limit))
    }

    async fn find_by_score(&self, threshold: f64, limit: Limit) -> Result<Vec<Article>> {
        self.record(Call::Score(threshold, limit))
    }

    async fn search(&self, text: &str, limit: Limit) -> Result<Vec<Article>> {
        self.record(Call::Search(text.to_string(), limit))
    }

    async fn find_nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: Limit,
    ) -> Result<Vec<Article>> {
        self.record(Call::Nearby(latitude, longitude, radius_km, limit))
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Article>> {
        self.calls.lock().unwrap().push(Call::ByIds(ids.to_vec()));
        Ok(self
            .answer
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn insert_articles(&self, articles: &[Article]) -> Result<usize> {
        Ok(articles.len())
    }

    async fn clear_articles(&self) -> Result<()> {
        Ok(())
    }
}

/// Resolves only the names it was given; records every lookup.
#[derive(Default)]
pub struct StubGeocoder {
    pub places: HashMap<String, Coordinates>,
    pub lookups: Mutex<Vec<String>>,
}

impl StubGeocoder {
    pub fn with(places: &[(&str, f64, f64)]) -> Self {
        Self {
            places: places
                .iter()
                .map(|(name, lat, lon)| (name.to_string(), Coordinates::new(*lat, *lon)))
                .collect(),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl GeocodeResolver for StubGeocoder {
    fn name(&self) -> &str {
        "stub"
    }

    async fn resolve(&self, text: &str) -> Result<Coordinates> {
        self.lookups.lock().unwrap().push(text.to_string());
        self.places
            .get(text)
            .copied()
            .ok_or_else(|| Error::Geocode(format!("no match for '{}'", text)))
    }
}

pub fn article(id: &str, days_ago: i64) -> Article {
    Article {
        id: id.to_string(),
        title: format!("Title {}", id),
        description: format!("Description {}", id),
        url: format!("https://example.com/{}", id),
        publication_date: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
            - Duration::days(days_ago),
        source_name: "Reuters".to_string(),
        relevance_score: 0.5,
        latitude: 37.4419,
        longitude: -122.1430,
        category: vec!["general".to_string()],
        llm_summary: None,
    }
}
