use std::fmt;

pub mod intent;
pub mod models;
pub mod prompts;
pub mod summary;

pub use intent::IntentClassifier;
pub use models::create_model;
pub use summary::SummaryEnricher;

pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Clone)]
pub struct Config {
    /// `openrouter` (any OpenAI-compatible API) or `dummy`.
    pub provider: String,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model_name: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model_name: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("model_name", &self.model_name)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

pub mod prelude {
    pub use super::{create_model, Config, IntentClassifier, SummaryEnricher};
    pub use cn_core::{CompletionClient, Error, Result};
}
