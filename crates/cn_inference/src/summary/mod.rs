use cn_core::{Article, CompletionClient, Error, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

use crate::prompts;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Adds a generated summary to every article of a result batch.
///
/// Up to `concurrency` completion calls run at once and results keep the
/// input order. The batch fails as a whole: the first failure in input order
/// is returned and the calls still in flight are dropped.
pub struct SummaryEnricher {
    model: Arc<dyn CompletionClient>,
    concurrency: usize,
}

impl fmt::Debug for SummaryEnricher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryEnricher")
            .field("model", &self.model.name())
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl SummaryEnricher {
    pub fn new(model: Arc<dyn CompletionClient>) -> Self {
        Self {
            model,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn enrich(&self, articles: Vec<Article>) -> Result<Vec<Article>> {
        stream::iter(articles)
            .map(|article| self.summarize(article))
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn summarize(&self, mut article: Article) -> Result<Article> {
        let user_prompt = prompts::summary_user_prompt(&article.title, &article.description);
        let summary = self
            .model
            .complete(prompts::SUMMARY_SYSTEM_PROMPT, &user_prompt)
            .await
            .map_err(|e| {
                error!("Failed to get article summary for {}: {}", article.id, e);
                match e {
                    Error::Timeout(_) => e,
                    other => Error::Completion(format!(
                        "Failed to summarize article {}: {}",
                        article.id, other
                    )),
                }
            })?;
        debug!("Generated summary for article {}", article.id);
        article.llm_summary = Some(summary.trim().to_string());
        Ok(article)
    }
}
