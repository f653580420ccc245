use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{StatusCode, Uri},
    response::Response,
    Json,
};
use cn_core::{EventKind, Limit};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::response::Endpoint;
use crate::AppState;

pub const DEFAULT_ARTICLE_LIMIT: i64 = 5;
pub const DEFAULT_THRESHOLD: f64 = 0.7;
pub const DEFAULT_RADIUS_KM: f64 = 1.0;

const LOCATION_REQUIRED: &str = "Latitude as 'lat' and longitude as 'lon' parameters are required";

type Params = Query<BTreeMap<String, String>>;
type Reply = Result<Response, Response>;

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub user_id: String,
    pub article_id: String,
    pub event_type: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Absent or unparseable limits fall back to the default.
fn article_limit(endpoint: &Endpoint) -> Limit {
    let raw = endpoint
        .param("articleLimit")
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_ARTICLE_LIMIT);
    Limit::new(raw)
}

fn required<'a>(endpoint: &'a Endpoint, key: &str, message: &str) -> Result<&'a str, Response> {
    match endpoint.param(key).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(endpoint.bad_request(message)),
    }
}

fn float(
    endpoint: &Endpoint,
    key: &str,
    default: Option<f64>,
    message: &str,
) -> Result<f64, Response> {
    match endpoint.param(key).map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| endpoint.bad_request(message)),
        None => default.ok_or_else(|| endpoint.bad_request(LOCATION_REQUIRED)),
    }
}

/// `lat`, `lon` and `radius` shared by the location-based endpoints.
fn location(endpoint: &Endpoint) -> Result<(f64, f64, f64), Response> {
    if endpoint.param("lat").is_none() || endpoint.param("lon").is_none() {
        return Err(endpoint.bad_request(LOCATION_REQUIRED));
    }
    let latitude = float(endpoint, "lat", None, "Invalid latitude parameter")?;
    let longitude = float(endpoint, "lon", None, "Invalid longitude parameter")?;
    let radius = float(endpoint, "radius", Some(DEFAULT_RADIUS_KM), "Invalid radius parameter")?;
    Ok((latitude, longitude, radius))
}

pub async fn latest_news(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Query(params): Params,
) -> Reply {
    debug!("'Handler layer': Fetching latest news articles...");
    let endpoint = Endpoint::new(&uri, params);
    let limit = article_limit(&endpoint);

    match state.deadline(state.service.latest_news(limit)).await {
        Ok(articles) => Ok(endpoint.articles("Successfully retrieved all news articles", articles)),
        Err(e) => Err(endpoint.error("Failed to retrieve news articles", &e)),
    }
}

pub async fn category_news(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Query(params): Params,
) -> Reply {
    debug!("'Handler layer': Fetching news articles by category...");
    let endpoint = Endpoint::new(&uri, params);
    let category = required(&endpoint, "category", "Category parameter is required")?;
    let limit = article_limit(&endpoint);

    match state.deadline(state.service.category_news(category, limit)).await {
        Ok(articles) => Ok(endpoint.articles(
            "Successfully retrieved news articles by category",
            articles,
        )),
        Err(e) => Err(endpoint.error("Failed to retrieve news articles by category", &e)),
    }
}

pub async fn score_news(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Query(params): Params,
) -> Reply {
    debug!("'Handler layer': Fetching news articles by score...");
    let endpoint = Endpoint::new(&uri, params);
    let message = "Threshold parameter must be a float between 0 and 1";
    let threshold = float(&endpoint, "threshold", Some(DEFAULT_THRESHOLD), message)?;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(endpoint.bad_request(message));
    }
    let limit = article_limit(&endpoint);

    match state.deadline(state.service.score_news(threshold, limit)).await {
        Ok(articles) => Ok(endpoint.articles(
            "Successfully retrieved news articles by score",
            articles,
        )),
        Err(e) => Err(endpoint.error("Failed to retrieve news articles by score", &e)),
    }
}

pub async fn search_news(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Query(params): Params,
) -> Reply {
    debug!("'Handler layer': Searching news articles...");
    let endpoint = Endpoint::new(&uri, params);
    let query = required(&endpoint, "query", "Query parameter is required")?;
    let limit = article_limit(&endpoint);

    match state.deadline(state.service.search_news(query, limit)).await {
        Ok(articles) => Ok(endpoint.articles("Successfully searched news articles", articles)),
        Err(e) => Err(endpoint.error("Failed to search news articles", &e)),
    }
}

pub async fn source_news(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Query(params): Params,
) -> Reply {
    debug!("'Handler layer': Fetching news articles by source...");
    let endpoint = Endpoint::new(&uri, params);
    let source = required(&endpoint, "source", "Source parameter is required")?;
    let limit = article_limit(&endpoint);

    match state.deadline(state.service.source_news(source, limit)).await {
        Ok(articles) => Ok(endpoint.articles(
            "Successfully retrieved news articles by source",
            articles,
        )),
        Err(e) => Err(endpoint.error("Failed to retrieve news articles by source", &e)),
    }
}

pub async fn nearby_news(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Query(params): Params,
) -> Reply {
    debug!("'Handler layer': Fetching nearby news articles...");
    let endpoint = Endpoint::new(&uri, params);
    let (latitude, longitude, radius) = location(&endpoint)?;
    let limit = article_limit(&endpoint);

    match state
        .deadline(state.service.nearby_news(latitude, longitude, radius, limit))
        .await
    {
        Ok(articles) => Ok(endpoint.articles(
            "Successfully retrieved nearby news articles",
            articles,
        )),
        Err(e) => Err(endpoint.error("Failed to retrieve nearby news articles", &e)),
    }
}

pub async fn trending_news(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Query(params): Params,
) -> Reply {
    debug!("'Handler layer': Fetching trending news articles...");
    let endpoint = Endpoint::new(&uri, params);
    let (latitude, longitude, radius) = location(&endpoint)?;
    let limit = article_limit(&endpoint);

    match state
        .deadline(state.service.trending_news(limit, latitude, longitude, radius))
        .await
    {
        Ok(articles) => Ok(endpoint.articles(
            "Successfully retrieved trending news articles",
            articles,
        )),
        Err(e) => Err(endpoint.error("Failed to retrieve trending news articles", &e)),
    }
}

pub async fn simulate_event(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Query(params): Params,
    payload: Result<Json<SimulateRequest>, JsonRejection>,
) -> Reply {
    debug!("'Handler layer': Simulating events...");
    let endpoint = Endpoint::new(&uri, params);
    let Json(request) = payload.map_err(|rejection| {
        endpoint.failure(
            StatusCode::BAD_REQUEST,
            "Invalid request payload",
            Some(rejection.body_text()),
        )
    })?;
    let kind = EventKind::from_str(&request.event_type)
        .map_err(|e| endpoint.error("Invalid request payload", &e))?;

    let simulated = state.service.simulate_event(
        &request.user_id,
        &request.article_id,
        kind,
        request.latitude,
        request.longitude,
    );
    match state.deadline(simulated).await {
        Ok(event) => Ok(endpoint.event("Successfully simulated events", event)),
        Err(e) => Err(endpoint.error("Failed to simulate events", &e)),
    }
}
