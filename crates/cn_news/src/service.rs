use cn_core::{
    Article, ArticleStore, CompletionClient, Coordinates, Error, EventKind, EventStore, GeoWindow,
    GeocodeResolver, Limit, Result, UserEvent,
};
use cn_inference::summary::DEFAULT_CONCURRENCY;
use cn_inference::{IntentClassifier, SummaryEnricher};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::dispatcher::{RetrievalDispatcher, RetrievalStrategy, DEFAULT_NEARBY_RADIUS_KM};
use crate::trending::TrendingAggregator;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOptions {
    /// Radius used when a free-text query resolves to a place.
    pub nearby_radius_km: f64,
    pub summary_concurrency: usize,
    pub trending_geo_filter: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            nearby_radius_km: DEFAULT_NEARBY_RADIUS_KM,
            summary_concurrency: DEFAULT_CONCURRENCY,
            trending_geo_filter: false,
        }
    }
}

/// The news operations exposed to the transport layers.
///
/// Every retrieval path ends in summary enrichment; an enrichment failure
/// fails the whole call.
pub struct NewsService {
    articles: Arc<dyn ArticleStore>,
    events: Arc<dyn EventStore>,
    classifier: IntentClassifier,
    dispatcher: RetrievalDispatcher,
    trending: TrendingAggregator,
    enricher: SummaryEnricher,
}

impl fmt::Debug for NewsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsService")
            .field("classifier", &self.classifier)
            .field("dispatcher", &self.dispatcher)
            .field("trending", &self.trending)
            .field("enricher", &self.enricher)
            .finish()
    }
}

impl NewsService {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        events: Arc<dyn EventStore>,
        model: Arc<dyn CompletionClient>,
        geocoder: Arc<dyn GeocodeResolver>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(model.clone()),
            dispatcher: RetrievalDispatcher::new(articles.clone(), geocoder)
                .with_nearby_radius(options.nearby_radius_km),
            trending: TrendingAggregator::new(articles.clone(), events.clone())
                .with_geo_filter(options.trending_geo_filter),
            enricher: SummaryEnricher::new(model).with_concurrency(options.summary_concurrency),
            articles,
            events,
        }
    }

    pub async fn latest_news(&self, limit: Limit) -> Result<Vec<Article>> {
        self.retrieve(RetrievalStrategy::Latest, limit).await
    }

    pub async fn category_news(&self, category: &str, limit: Limit) -> Result<Vec<Article>> {
        let category = required("category", category)?;
        self.retrieve(RetrievalStrategy::Category(category), limit).await
    }

    pub async fn score_news(&self, threshold: f64, limit: Limit) -> Result<Vec<Article>> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::validation(format!(
                "threshold must be between 0 and 1, got {}",
                threshold
            )));
        }
        self.retrieve(RetrievalStrategy::Score(threshold), limit).await
    }

    pub async fn source_news(&self, source: &str, limit: Limit) -> Result<Vec<Article>> {
        let source = required("source", source)?;
        self.retrieve(RetrievalStrategy::Source(source), limit).await
    }

    pub async fn search_news(&self, query: &str, limit: Limit) -> Result<Vec<Article>> {
        let query = required("query", query)?;
        let result = self.classifier.classify(&query).await?;
        info!(intent = %result.intent, entities = ?result.entities, "Classified search query");

        let keywords = result.search_text();
        let articles = self.dispatcher.dispatch(&result, &keywords, limit).await?;
        self.summarize(articles, "news articles by search").await
    }

    pub async fn nearby_news(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: Limit,
    ) -> Result<Vec<Article>> {
        let center = coordinates(latitude, longitude)?;
        let radius_km = radius(radius_km)?;
        self.retrieve(RetrievalStrategy::Nearby { center, radius_km }, limit).await
    }

    pub async fn trending_news(
        &self,
        limit: Limit,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<Vec<Article>> {
        let window = GeoWindow::new(coordinates(latitude, longitude)?, radius(radius_km)?);
        let articles = self.trending.trending(limit, window).await?;
        self.summarize(articles, "trending news articles").await
    }

    pub async fn simulate_event(
        &self,
        user_id: &str,
        article_id: &str,
        kind: EventKind,
        latitude: f64,
        longitude: f64,
    ) -> Result<UserEvent> {
        let user_id = required("user_id", user_id)?;
        let article_id = required("article_id", article_id)?;
        let event = UserEvent::new(user_id, article_id, kind, coordinates(latitude, longitude)?);

        self.events.insert_event(&event).await?;
        info!(
            event_id = %event.id,
            "Recorded simulated {} event for article {}",
            event.event_type,
            event.article_id
        );
        Ok(event)
    }

    async fn retrieve(&self, strategy: RetrievalStrategy, limit: Limit) -> Result<Vec<Article>> {
        debug!(strategy = ?strategy, limit = %limit, "Retrieving articles");
        let articles = strategy.execute(&*self.articles, limit).await?;
        self.summarize(articles, strategy.label()).await
    }

    async fn summarize(&self, articles: Vec<Article>, label: &str) -> Result<Vec<Article>> {
        info!("Fetched {} {}, creating summaries...", articles.len(), label);
        let articles = self.enricher.enrich(articles).await?;
        info!("Summarized {} {}", articles.len(), label);
        Ok(articles)
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn coordinates(latitude: f64, longitude: f64) -> Result<Coordinates> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::validation(format!(
            "lat must be between -90 and 90, got {}",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::validation(format!(
            "lon must be between -180 and 180, got {}",
            longitude
        )));
    }
    Ok(Coordinates::new(latitude, longitude))
}

fn radius(radius_km: f64) -> Result<f64> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(Error::validation(format!(
            "radius must be a non-negative number, got {}",
            radius_km
        )));
    }
    Ok(radius_km)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{article, StubGeocoder};
    use async_trait::async_trait;
    use cn_core::ErrorKind;
    use cn_inference::models::DummyModel;
    use cn_storage::InMemoryStorage;

    /// Summarizes every article except the one whose title contains `fail_on`.
    struct FlakyModel {
        fail_on: &'static str,
    }

    #[async_trait]
    impl CompletionClient for FlakyModel {
        fn name(&self) -> &str {
            "Flaky"
        }

        async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
            if user_prompt.contains(self.fail_on) {
                return Err(Error::Completion("quota exceeded".to_string()));
            }
            Ok("summary".to_string())
        }
    }

    fn sample() -> Vec<Article> {
        let mut sports = article("sports-1", 1);
        sports.category = vec!["sports".to_string()];
        sports.relevance_score = 0.9;
        sports.title = "Cricket final in Mumbai".to_string();

        let mut tech = article("tech-1", 0);
        tech.category = vec!["technology".to_string()];
        tech.source_name = "The Verge".to_string();
        tech.relevance_score = 0.4;
        tech.title = "New chips announced".to_string();
        tech.latitude = 52.52;
        tech.longitude = 13.40;

        let mut old = article("old-1", 30);
        old.relevance_score = 0.75;

        vec![sports, tech, old]
    }

    async fn service_with(model: Arc<dyn CompletionClient>) -> (NewsService, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::with_articles(&sample()).await);
        let geocoder = Arc::new(StubGeocoder::with(&[("Berlin", 52.52, 13.40)]));
        let service = NewsService::new(
            storage.clone(),
            storage.clone(),
            model,
            geocoder,
            ServiceOptions::default(),
        );
        (service, storage)
    }

    async fn service() -> (NewsService, Arc<InMemoryStorage>) {
        service_with(Arc::new(DummyModel::new())).await
    }

    fn ids(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_latest_news_is_summarized_and_limited() {
        let (service, _) = service().await;
        let articles = service.latest_news(Limit::new(2)).await.unwrap();
        assert_eq!(ids(&articles), vec!["tech-1", "sports-1"]);
        assert!(articles.iter().all(|a| a.llm_summary.is_some()));

        let all = service.latest_news(Limit::new(0)).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_direct_strategies() {
        let (service, _) = service().await;

        let sports = service.category_news("SPORT", Limit::new(5)).await.unwrap();
        assert_eq!(ids(&sports), vec!["sports-1"]);

        let verge = service.source_news("verge", Limit::new(5)).await.unwrap();
        assert_eq!(ids(&verge), vec!["tech-1"]);

        let relevant = service.score_news(0.7, Limit::new(5)).await.unwrap();
        assert_eq!(ids(&relevant), vec!["sports-1", "old-1"]);

        let berlin = service.nearby_news(52.52, 13.40, 5.0, Limit::new(5)).await.unwrap();
        assert_eq!(ids(&berlin), vec!["tech-1"]);
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let (service, _) = service().await;

        let cases = vec![
            service.category_news("  ", Limit::new(5)).await.unwrap_err(),
            service.source_news("", Limit::new(5)).await.unwrap_err(),
            service.score_news(1.5, Limit::new(5)).await.unwrap_err(),
            service.search_news("", Limit::new(5)).await.unwrap_err(),
            service.nearby_news(91.0, 0.0, 1.0, Limit::new(5)).await.unwrap_err(),
            service.trending_news(Limit::new(5), 0.0, 0.0, -1.0).await.unwrap_err(),
        ];
        for err in cases {
            assert_eq!(err.kind(), ErrorKind::Validation, "{}", err);
        }
    }

    #[tokio::test]
    async fn test_search_news_uses_keywords() {
        let (service, _) = service().await;
        let articles = service.search_news("Cricket in Mumbai", Limit::new(5)).await.unwrap();
        assert_eq!(ids(&articles), vec!["sports-1"]);
        assert!(articles[0].llm_summary.is_some());
    }

    #[tokio::test]
    async fn test_simulated_events_drive_trending() {
        let (service, storage) = service().await;
        for (article_id, kind) in [
            ("tech-1", EventKind::View),
            ("sports-1", EventKind::Click),
            ("tech-1", EventKind::View),
            ("old-1", EventKind::Share),
        ] {
            let event = service
                .simulate_event("user-1", article_id, kind, 37.44, -122.14)
                .await
                .unwrap();
            assert_eq!(event.article_id, article_id);
        }
        assert_eq!(storage.find_all_events().await.unwrap().len(), 4);

        let trending = service.trending_news(Limit::new(5), 37.44, -122.14, 10.0).await.unwrap();
        let mut trending_ids = ids(&trending);
        trending_ids.sort();
        assert_eq!(trending_ids, vec!["sports-1", "tech-1"]);
        assert!(trending.iter().all(|a| a.llm_summary.is_some()));
    }

    #[tokio::test]
    async fn test_trending_without_events() {
        let (service, _) = service().await;
        let trending = service.trending_news(Limit::new(5), 0.0, 0.0, 1.0).await.unwrap();
        assert!(trending.is_empty());
    }

    #[tokio::test]
    async fn test_enrichment_failure_fails_the_request() {
        let (service, _) = service_with(Arc::new(FlakyModel { fail_on: "New chips" })).await;
        let err = service.latest_news(Limit::new(5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);

        let sports = service.category_news("sports", Limit::new(5)).await.unwrap();
        assert_eq!(sports[0].llm_summary.as_deref(), Some("summary"));
    }
}
