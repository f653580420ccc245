use cn_core::{CompletionClient, Error, IntentResult, Result};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::prompts;

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Turns a free-text query into an [`IntentResult`] with one completion call.
///
/// The intent value is not checked against the known set here; unknown
/// values are carried through and resolved by the dispatcher.
pub struct IntentClassifier {
    model: Arc<dyn CompletionClient>,
}

impl fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("model", &self.model.name())
            .finish()
    }
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn CompletionClient>) -> Self {
        Self { model }
    }

    pub async fn classify(&self, query: &str) -> Result<IntentResult> {
        let content = self
            .model
            .complete(prompts::INTENT_SYSTEM_PROMPT, &prompts::intent_user_prompt(query))
            .await
            .map_err(|e| match e {
                Error::Timeout(_) => e,
                other => Error::Completion(format!("Failed to classify query intent: {}", other)),
            })?;
        debug!("Extracted entities and intent from user query response: {}", content);

        parse_intent(&content)
    }
}

/// Returns the text between the first ```` ```json ```` marker and the last
/// closing fence, or the whole content when there is no usable fence.
pub fn extract_json_block(content: &str) -> &str {
    if let Some(open) = content.find(FENCE_OPEN) {
        let start = open + FENCE_OPEN.len();
        if let Some(end) = content.rfind(FENCE_CLOSE) {
            if start < end {
                return content[start..end].trim();
            }
        }
    }
    content
}

pub fn parse_intent(content: &str) -> Result<IntentResult> {
    let json = extract_json_block(content);
    let mut result: IntentResult = serde_json::from_str(json)
        .map_err(|e| Error::Parse(format!("Invalid intent output: {}", e)))?;
    for keyword in result.keywords.iter_mut() {
        *keyword = keyword.trim().to_lowercase();
    }
    Ok(result)
}
