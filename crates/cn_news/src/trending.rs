use cn_core::{Article, ArticleStore, EventStore, GeoWindow, Limit, Result, UserEvent};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Accumulated event weight of one article.
///
/// Orders by score descending, then article id ascending, so a ranking is
/// a total order regardless of how the events were stored.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendingScore {
    pub article_id: String,
    pub score: f64,
}

impl Eq for TrendingScore {}

impl Ord for TrendingScore {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.article_id.cmp(&other.article_id))
    }
}

impl PartialOrd for TrendingScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sums event weights per article and ranks them. Articles whose events
/// carry no weight are left out.
pub fn rank_events<'a>(events: impl IntoIterator<Item = &'a UserEvent>) -> Vec<TrendingScore> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for event in events {
        *totals.entry(event.article_id.as_str()).or_insert(0.0) += event.event_type.weight();
    }

    let mut ranking: Vec<TrendingScore> = totals
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .map(|(article_id, score)| TrendingScore {
            article_id: article_id.to_string(),
            score,
        })
        .collect();
    ranking.sort();
    ranking
}

/// Ranks articles by interaction history and fetches the top of the ranking.
pub struct TrendingAggregator {
    articles: Arc<dyn ArticleStore>,
    events: Arc<dyn EventStore>,
    geo_filter: bool,
}

impl fmt::Debug for TrendingAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrendingAggregator")
            .field("geo_filter", &self.geo_filter)
            .finish()
    }
}

impl TrendingAggregator {
    pub fn new(articles: Arc<dyn ArticleStore>, events: Arc<dyn EventStore>) -> Self {
        Self {
            articles,
            events,
            geo_filter: false,
        }
    }

    /// When enabled, only events originating inside the window are ranked.
    pub fn with_geo_filter(mut self, enabled: bool) -> Self {
        self.geo_filter = enabled;
        self
    }

    pub async fn ranking(&self, window: GeoWindow) -> Result<Vec<TrendingScore>> {
        let events = self.events.find_all_events().await?;
        debug!("Fetched {} user events for trending articles", events.len());

        let ranking = if self.geo_filter {
            rank_events(events.iter().filter(|e| window.contains(&e.origin())))
        } else {
            rank_events(&events)
        };
        Ok(ranking)
    }

    pub async fn trending(&self, limit: Limit, window: GeoWindow) -> Result<Vec<Article>> {
        let top: Vec<String> = limit
            .apply(self.ranking(window).await?)
            .into_iter()
            .map(|entry| entry.article_id)
            .collect();

        if top.is_empty() {
            return Ok(Vec::new());
        }

        let articles = self.articles.find_by_ids(&top).await?;
        Ok(limit.apply(articles))
    }
}
