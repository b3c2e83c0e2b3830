//! Element summarization with bounded concurrency.
//!
//! Each element gets a short generative summary used *only* for similarity
//! indexing; the raw element is what answer composition eventually sees.
//! Batches run under a semaphore cap (worker-pool discipline, not unbounded
//! fan-out) and per-element failures are isolated: an element that keeps
//! failing is excluded from indexing, logged, and never aborts the batch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tracing::{error, warn};

use crate::providers::CompletionProvider;
use crate::types::{Element, RagError};

/// Fixed prompt used for every element summary.
pub const SUMMARY_PROMPT_TEMPLATE: &str =
    "Give a concise summary of the table or text. Table or text chunk: {element}";

/// Fills the summary template with an element's raw content.
pub fn summary_prompt(element: &Element) -> String {
    SUMMARY_PROMPT_TEMPLATE.replace("{element}", element.content())
}

/// Tuning for summarization batches.
#[derive(Clone, Debug)]
pub struct SummarizerConfig {
    /// Hard cap on simultaneously outstanding backend calls.
    pub max_concurrency: usize,
    /// Attempts per element before it is excluded from indexing.
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    pub retry_base_delay: Duration,
    /// Deadline per backend call; expiry counts as a retryable failure.
    pub request_timeout: Duration,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(250),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Per-element result of a summarization batch.
#[derive(Debug)]
pub enum SummaryOutcome {
    /// The element produced a usable summary.
    Summarized { element: Element, summary: String },
    /// All attempts failed; the element is excluded from indexing.
    Failed { element: Element, error: RagError },
}

impl SummaryOutcome {
    pub fn is_summarized(&self) -> bool {
        matches!(self, SummaryOutcome::Summarized { .. })
    }
}

/// Produces natural-language summaries of elements via a completion backend.
#[derive(Clone)]
pub struct Summarizer {
    provider: Arc<dyn CompletionProvider>,
    config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: SummarizerConfig) -> Self {
        Self { provider, config }
    }

    /// Summarizes one element, retrying with exponential backoff.
    ///
    /// Empty or whitespace-only responses count as failures; a deadline
    /// expiry is retryable like any backend error.
    pub async fn summarize(&self, element: &Element) -> Result<String, RagError> {
        let prompt = summary_prompt(element);
        let attempts = self.config.max_attempts.max(1);
        let mut last_error: Option<RagError> = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let backoff = self.config.retry_base_delay * 2u32.saturating_pow(attempt - 2);
                sleep(backoff).await;
            }
            match timeout(self.config.request_timeout, self.provider.complete(&prompt)).await {
                Ok(Ok(response)) => {
                    let summary = response.trim();
                    if summary.is_empty() {
                        warn!(kind = element.kind(), attempt, "backend returned an empty summary");
                        last_error =
                            Some(RagError::Summarization("backend returned an empty summary".into()));
                        continue;
                    }
                    return Ok(summary.to_string());
                }
                Ok(Err(err)) => {
                    warn!(kind = element.kind(), attempt, %err, "summarization attempt failed");
                    last_error = Some(err);
                }
                Err(_) => {
                    warn!(
                        kind = element.kind(),
                        attempt,
                        timeout_ms = self.config.request_timeout.as_millis() as u64,
                        "summarization attempt timed out"
                    );
                    last_error = Some(RagError::Summarization(format!(
                        "timed out after {:?}",
                        self.config.request_timeout
                    )));
                }
            }
        }

        Err(match last_error {
            Some(RagError::Summarization(message)) => RagError::Summarization(message),
            Some(err) => RagError::Summarization(err.to_string()),
            None => RagError::Summarization("no attempts were made".into()),
        })
    }

    /// Summarizes a batch with at most `max_concurrency` calls in flight.
    ///
    /// Completion order is unordered; outcomes come back in input order with
    /// one entry per element.
    pub async fn summarize_batch(&self, elements: Vec<Element>) -> Vec<SummaryOutcome> {
        if elements.is_empty() {
            return Vec::new();
        }
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let elements = Arc::new(elements);
        let mut join_set = JoinSet::new();

        for idx in 0..elements.len() {
            let summarizer = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let elements = Arc::clone(&elements);
            join_set.spawn(async move {
                let element = elements[idx].clone();
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            idx,
                            SummaryOutcome::Failed {
                                element,
                                error: RagError::Summarization(
                                    "concurrency limiter closed".into(),
                                ),
                            },
                        );
                    }
                };
                match summarizer.summarize(&element).await {
                    Ok(summary) => (idx, SummaryOutcome::Summarized { element, summary }),
                    Err(error) => (idx, SummaryOutcome::Failed { element, error }),
                }
            });
        }

        let mut slots: Vec<Option<SummaryOutcome>> = Vec::new();
        slots.resize_with(elements.len(), || None);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, outcome)) => slots[idx] = Some(outcome),
                Err(err) => error!(%err, "summarization task aborted"),
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| SummaryOutcome::Failed {
                    element: elements[idx].clone(),
                    error: RagError::Summarization("summarization task aborted".into()),
                })
            })
            .collect()
    }
}
