use async_trait::async_trait;
use cn_core::{CompletionClient, Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::Config;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

/// Chat-completions client for OpenRouter and other OpenAI-compatible APIs.
pub struct OpenRouterModel {
    client: Client,
    api_key: String,
    base_url: String,
    model_name: String,
}

impl OpenRouterModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::validation("LLM token is required for the openrouter provider"))?;

        Url::parse(&config.endpoint)
            .map_err(|e| {
                Error::validation(format!("Invalid LLM endpoint '{}': {}", config.endpoint, e))
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
        })
    }
}

impl fmt::Debug for OpenRouterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

#[async_trait]
impl CompletionClient for OpenRouterModel {
    fn name(&self) -> &str {
        "OpenRouter"
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model_name,
            messages: vec![
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
        };

        debug!(model = %self.model_name, "OpenRouter chat request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!("OpenRouter API error ({}): {}", status, body)));
        }

        let response: ChatResponse = response.json().await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Completion("No choices in completion response".to_string()))?;

        debug!("Completion response: {}", content);
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IntentClassifier;
    use cn_core::ErrorKind;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    /// Accepts connections and never answers them.
    async fn silent_endpoint() -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_model_requires_api_key() {
        let result = OpenRouterModel::new(&Config::default());
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "Validation error: LLM token is required for the openrouter provider"
        );

        let config = Config {
            api_key: Some("test-key".to_string()),
            ..Config::default()
        };
        assert!(OpenRouterModel::new(&config).is_ok());
    }

    #[test]
    fn test_model_rejects_bad_endpoint() {
        let config = Config {
            api_key: Some("test-key".to_string()),
            endpoint: "not a url".to_string(),
            ..Config::default()
        };
        assert!(OpenRouterModel::new(&config).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = Config {
            api_key: Some("sk-secret".to_string()),
            ..Config::default()
        };
        let model = OpenRouterModel::new(&config).unwrap();
        let rendered = format!("{:?}", model);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_unresponsive_backend_times_out() {
        let (endpoint, server) = silent_endpoint().await;
        let config = Config {
            api_key: Some("test-key".to_string()),
            endpoint,
            request_timeout_secs: 1,
            ..Config::default()
        };
        let model: Arc<dyn CompletionClient> = Arc::new(OpenRouterModel::new(&config).unwrap());

        let err = model.complete("system", "user").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout, "{}", err);

        let err = IntentClassifier::new(model).classify("news near Palo Alto").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout, "{}", err);

        server.abort();
    }
}
