use cn_core::{
    Article, ArticleStore, Coordinates, Error, GeocodeResolver, Intent, IntentResult, Limit, Result,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 1.0;

/// One way of reading the article collection.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalStrategy {
    Latest,
    Category(String),
    Source(String),
    Score(f64),
    Search(String),
    Nearby { center: Coordinates, radius_km: f64 },
}

impl RetrievalStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            RetrievalStrategy::Latest => "latest news articles",
            RetrievalStrategy::Category(_) => "news articles by category",
            RetrievalStrategy::Source(_) => "news articles by source",
            RetrievalStrategy::Score(_) => "news articles by score",
            RetrievalStrategy::Search(_) => "news articles by search",
            RetrievalStrategy::Nearby { .. } => "nearby news articles",
        }
    }

    pub async fn execute(&self, store: &dyn ArticleStore, limit: Limit) -> Result<Vec<Article>> {
        let articles = match self {
            RetrievalStrategy::Latest => store.find_all(limit).await?,
            RetrievalStrategy::Category(category) => store.find_by_category(category, limit).await?,
            RetrievalStrategy::Source(source) => store.find_by_source(source, limit).await?,
            RetrievalStrategy::Score(threshold) => store.find_by_score(*threshold, limit).await?,
            RetrievalStrategy::Search(text) => store.search(text, limit).await?,
            RetrievalStrategy::Nearby { center, radius_km } => {
                store
                    .find_nearby(center.latitude, center.longitude, *radius_km, limit)
                    .await?
            }
        };
        Ok(limit.apply(articles))
    }
}

/// Chooses and runs a retrieval strategy for a classified free-text query.
///
/// `nearby` tries every entity in order against the geocoder and falls back
/// to keyword search when none resolves. `score`, `search` and anything
/// unrecognized go to keyword search.
pub struct RetrievalDispatcher {
    articles: Arc<dyn ArticleStore>,
    geocoder: Arc<dyn GeocodeResolver>,
    nearby_radius_km: f64,
}

impl fmt::Debug for RetrievalDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalDispatcher")
            .field("geocoder", &self.geocoder.name())
            .field("nearby_radius_km", &self.nearby_radius_km)
            .finish()
    }
}

impl RetrievalDispatcher {
    pub fn new(articles: Arc<dyn ArticleStore>, geocoder: Arc<dyn GeocodeResolver>) -> Self {
        Self {
            articles,
            geocoder,
            nearby_radius_km: DEFAULT_NEARBY_RADIUS_KM,
        }
    }

    pub fn with_nearby_radius(mut self, radius_km: f64) -> Self {
        self.nearby_radius_km = radius_km;
        self
    }

    pub async fn dispatch(
        &self,
        result: &IntentResult,
        keywords: &str,
        limit: Limit,
    ) -> Result<Vec<Article>> {
        let strategy = self.plan(result, keywords).await?;
        debug!(strategy = ?strategy, "Dispatching free-text query");
        strategy.execute(&*self.articles, limit).await
    }

    pub async fn plan(&self, result: &IntentResult, keywords: &str) -> Result<RetrievalStrategy> {
        let search = || RetrievalStrategy::Search(keywords.to_string());

        match &result.intent {
            Intent::Category => Ok(RetrievalStrategy::Category(first_entity(result)?)),
            Intent::Source => Ok(RetrievalStrategy::Source(first_entity(result)?)),
            Intent::Nearby => match self.locate(&result.entities).await {
                Some(center) => Ok(RetrievalStrategy::Nearby {
                    center,
                    radius_km: self.nearby_radius_km,
                }),
                None => {
                    error!(
                        locations = ?result.entities,
                        "No valid location found with respect to user query"
                    );
                    warn!("Fallback to 'Normal Search on title and description'");
                    Ok(search())
                }
            },
            Intent::Search => Ok(search()),
            other => {
                warn!(intent = %other, "Unknown intent, Fallback to normal search");
                Ok(search())
            }
        }
    }

    async fn locate(&self, entities: &[String]) -> Option<Coordinates> {
        for location in entities {
            match self.geocoder.resolve(location).await {
                Ok(center) => return Some(center),
                Err(e) => warn!(
                    location = %location,
                    error = %e,
                    "Failed to extract latitude and longitude from location"
                ),
            }
        }
        None
    }
}

fn first_entity(result: &IntentResult) -> Result<String> {
    result
        .entities
        .first()
        .map(|entity| entity.trim())
        .filter(|entity| !entity.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::validation(format!(
                "Intent '{}' requires at least one entity but none were extracted",
                result.intent
            ))
        })
}
