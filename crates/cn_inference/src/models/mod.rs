use cn_core::{CompletionClient, Error, Result};
use std::sync::Arc;
use tracing::info;

use crate::Config;

pub mod dummy;
pub mod openrouter;

pub use dummy::DummyModel;
pub use openrouter::OpenRouterModel;

/// Builds the completion backend named by `config.provider`.
pub fn create_model(config: &Config) -> Result<Arc<dyn CompletionClient>> {
    let model: Arc<dyn CompletionClient> = match config.provider.as_str() {
        "openrouter" | "openai" => Arc::new(OpenRouterModel::new(config)?),
        "dummy" => Arc::new(DummyModel::new()),
        other => {
            return Err(Error::validation(format!(
                "Unknown LLM provider '{}'. Available providers: openrouter, dummy",
                other
            )))
        }
    };
    info!(
        "🧠 Completion backend initialized (using {}, model {})",
        model.name(),
        config.model_name
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_model() {
        let config = Config {
            provider: "dummy".to_string(),
            ..Config::default()
        };
        assert_eq!(create_model(&config).unwrap().name(), "Dummy");

        let config = Config {
            provider: "llama".to_string(),
            ..Config::default()
        };
        assert!(create_model(&config).is_err());
    }
}
