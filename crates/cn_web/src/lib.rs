use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod response;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/v1/news/latest", get(handlers::latest_news))
        .route("/api/v1/news/category", get(handlers::category_news))
        .route("/api/v1/news/score", get(handlers::score_news))
        .route("/api/v1/news/search", get(handlers::search_news))
        .route("/api/v1/news/source", get(handlers::source_news))
        .route("/api/v1/news/nearby", get(handlers::nearby_news))
        .route("/api/v1/news/trending", get(handlers::trending_news))
        .route("/api/v1/news/events/simulate", post(handlers::simulate_event))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use crate::{create_app, AppState};
    pub use cn_core::{Error, Result};
}
