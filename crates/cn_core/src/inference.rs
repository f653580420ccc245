use async_trait::async_trait;
use crate::Result;

/// A language-model backend answering one system + user prompt pair.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}
