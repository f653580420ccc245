use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use cn_core::{Article, Error, ErrorKind, UserEvent};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info};

pub const SUCCESS: &str = "success";
pub const FAILED: &str = "failed";

pub const TIMEOUT_MESSAGE: &str = "Request timeout - please try again later";
const TIMEOUT_DETAILS: &str = "The request could not be completed within the allowed time limit";

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub count: usize,
    pub query: BTreeMap<String, String>,
    pub path: String,
}

/// JSON body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub articles: Option<Vec<Article>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<UserEvent>,
    pub metadata: Metadata,
    #[serde(rename = "errorDetails", skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

/// Path and query of the request being answered, echoed into the metadata.
#[derive(Debug, Clone)]
pub struct Endpoint {
    path: String,
    query: BTreeMap<String, String>,
}

impl Endpoint {
    pub fn new(uri: &Uri, query: BTreeMap<String, String>) -> Self {
        Self {
            path: uri.path().to_string(),
            query,
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    fn metadata(&self, count: usize) -> Metadata {
        Metadata {
            count,
            query: self.query.clone(),
            path: self.path.clone(),
        }
    }

    pub fn articles(&self, message: &str, articles: Vec<Article>) -> Response {
        info!(path = %self.path, count = articles.len(), "API Success: {}", message);
        let body = ApiResponse {
            status: SUCCESS,
            message: message.to_string(),
            metadata: self.metadata(articles.len()),
            articles: Some(articles),
            event: None,
            error_details: None,
        };
        (StatusCode::OK, Json(body)).into_response()
    }

    pub fn event(&self, message: &str, event: UserEvent) -> Response {
        info!(path = %self.path, "API Success: {}", message);
        let body = ApiResponse {
            status: SUCCESS,
            message: message.to_string(),
            articles: None,
            event: Some(event),
            metadata: self.metadata(0),
            error_details: None,
        };
        (StatusCode::OK, Json(body)).into_response()
    }

    pub fn failure(&self, status: StatusCode, message: &str, details: Option<String>) -> Response {
        error!(
            path = %self.path,
            status = status.as_u16(),
            internal_error = details.as_deref().unwrap_or_default(),
            "API Error: {}",
            message
        );
        let body = ApiResponse {
            status: FAILED,
            message: message.to_string(),
            articles: None,
            event: None,
            metadata: self.metadata(0),
            error_details: details,
        };
        (status, Json(body)).into_response()
    }

    pub fn bad_request(&self, message: &str) -> Response {
        self.failure(StatusCode::BAD_REQUEST, message, None)
    }

    /// Maps a service failure onto its transport status.
    pub fn error(&self, message: &str, err: &Error) -> Response {
        match err.kind() {
            ErrorKind::Validation => {
                self.failure(StatusCode::BAD_REQUEST, message, Some(err.to_string()))
            }
            ErrorKind::Timeout => self.failure(
                StatusCode::GATEWAY_TIMEOUT,
                TIMEOUT_MESSAGE,
                Some(TIMEOUT_DETAILS.to_string()),
            ),
            ErrorKind::Upstream | ErrorKind::Parse => {
                self.failure(StatusCode::INTERNAL_SERVER_ERROR, message, Some(err.to_string()))
            }
        }
    }
}
