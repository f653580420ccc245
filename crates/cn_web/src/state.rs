use cn_core::{Error, Result};
use cn_news::NewsService;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NewsService>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<NewsService>) -> Self {
        Self {
            service,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Runs `work` under the request deadline. On expiry the future is
    /// dropped, cancelling every store, geocoder and completion call in it.
    pub async fn deadline<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.request_timeout, work)
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "request exceeded {}s deadline",
                    self.request_timeout.as_secs_f64()
                ))
            })?
    }
}
