//! Answer composition: retrieved context + question → one completion call.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::providers::CompletionProvider;
use crate::query::retrieve::RetrievedChunk;
use crate::types::RagError;

/// Fixed prompt used for final answer synthesis.
pub const ANSWER_PROMPT_TEMPLATE: &str = "Answer the question based only on the following context, which can include text and tables:\n{context}\nQuestion: {question}\n";

/// Fills the answer template. Context blocks are concatenated verbatim;
/// tables are never resummarized on the way into the prompt.
pub fn answer_prompt(context: &str, question: &str) -> String {
    ANSWER_PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Tuning for answer composition.
///
/// `max_attempts` defaults to 1: a backend failure here surfaces to the
/// caller instead of being hidden behind retries. Raise it for bounded
/// retry with the same backoff discipline as summarization.
#[derive(Clone, Debug)]
pub struct AnswerConfig {
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            retry_base_delay: Duration::from_millis(250),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Assembles retrieved raw content into a single prompt and invokes the
/// generative model once.
#[derive(Clone)]
pub struct AnswerComposer {
    provider: Arc<dyn CompletionProvider>,
    config: AnswerConfig,
}

impl AnswerComposer {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: AnswerConfig) -> Self {
        Self { provider, config }
    }

    /// Produces the final answer, or a typed error — never partial text.
    pub async fn answer(
        &self,
        question: &str,
        retrieved: &[RetrievedChunk],
    ) -> Result<String, RagError> {
        let context = retrieved
            .iter()
            .map(|chunk| chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = answer_prompt(&context, question);

        let attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<RagError> = None;
        for attempt in 1..=attempts {
            if attempt > 1 {
                let backoff = self.config.retry_base_delay * 2u32.saturating_pow(attempt - 2);
                sleep(backoff).await;
            }
            match timeout(self.config.request_timeout, self.provider.complete(&prompt)).await {
                Ok(Ok(response)) => {
                    let answer = response.trim();
                    if answer.is_empty() {
                        warn!(attempt, "backend returned an empty answer");
                        last_error =
                            Some(RagError::Generation("backend returned an empty answer".into()));
                        continue;
                    }
                    return Ok(answer.to_string());
                }
                Ok(Err(err)) => {
                    warn!(attempt, %err, "answer generation attempt failed");
                    last_error = Some(err);
                }
                Err(_) => {
                    warn!(attempt, "answer generation attempt timed out");
                    last_error = Some(RagError::Generation(format!(
                        "timed out after {:?}",
                        self.config.request_timeout
                    )));
                }
            }
        }

        Err(match last_error {
            Some(RagError::Generation(message)) => RagError::Generation(message),
            Some(err) => RagError::Generation(err.to_string()),
            None => RagError::Generation("no attempts were made".into()),
        })
    }
}
