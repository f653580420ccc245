use async_trait::async_trait;
use cn_core::{CompletionClient, Result};
use std::fmt;

use crate::prompts;

const SUMMARY_WORDS: usize = 60;

/// Offline stand-in: answers intent prompts with a keyword search and
/// summary prompts with the head of the description.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        if system_prompt == prompts::INTENT_SYSTEM_PROMPT {
            let query = prompts::embedded_query(user_prompt).unwrap_or(user_prompt);
            let mut keywords: Vec<String> = Vec::new();
            for word in query
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .map(str::to_lowercase)
            {
                if !keywords.contains(&word) {
                    keywords.push(word);
                }
            }
            let answer = serde_json::json!({
                "intent": "search",
                "entities": [],
                "keywords": keywords,
            });
            return Ok(answer.to_string());
        }

        let text = prompts::embedded_description(user_prompt).unwrap_or(user_prompt);
        let words: Vec<&str> = text.split_whitespace().take(SUMMARY_WORDS).collect();
        Ok(words.join(" "))
    }
}
