//! Caller-facing pipeline: wire providers and stores once, then
//! `ingest` documents and `ask` questions.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::ingestion::{
    DocumentPartitioner, PartitionConfig, Summarizer, SummarizerConfig, SummaryOutcome,
    TextPartitioner, classify_fragments,
};
use crate::providers::{CompletionProvider, EmbeddingProvider};
use crate::query::{AnswerComposer, AnswerConfig, RetrievalResult, Retriever};
use crate::stores::DualStore;
use crate::types::RagError;

/// Pipeline-wide tuning knobs.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Number of nearest neighbors resolved per question.
    pub top_k: usize,
    /// Deadline for the query-embedding call.
    pub request_timeout: Duration,
    pub summarizer: SummarizerConfig,
    pub answer: AnswerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            request_timeout: Duration::from_secs(30),
            summarizer: SummarizerConfig::default(),
            answer: AnswerConfig::default(),
        }
    }
}

/// Summary of one ingestion run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Elements committed to both stores.
    pub accepted: usize,
    /// Elements excluded after summarization/embedding/indexing failures.
    pub rejected: usize,
    /// Partitioner fragments dropped by the classifier.
    pub dropped_fragments: usize,
    pub duration_ms: u64,
}

/// Multi-vector RAG pipeline over a [`DualStore`].
///
/// Built once via [`RagPipeline::builder`]; the store is an explicit member
/// shared by the ingestion and query paths, not ambient global state. The
/// query path is read-only and safe to run concurrently with ingestion.
pub struct RagPipeline {
    partitioner: Arc<dyn DocumentPartitioner>,
    store: Arc<DualStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
    summarizer: Summarizer,
    retriever: Retriever,
    composer: AnswerComposer,
    config: PipelineConfig,
}

impl RagPipeline {
    /// Create a new builder for constructing a `RagPipeline`.
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Shared handle to the dual store (e.g. for consistency checks).
    pub fn store(&self) -> Arc<DualStore> {
        Arc::clone(&self.store)
    }

    /// Ingests one document: partition → classify → summarize → embed →
    /// index.
    ///
    /// Per-element failures are logged and counted as rejected without
    /// aborting the run; a document-level failure (unreadable file) aborts
    /// with [`RagError::Ingestion`].
    pub async fn ingest(
        &self,
        path: impl AsRef<Path>,
        config: &PartitionConfig,
    ) -> Result<IngestReport, RagError> {
        let started = Instant::now();
        let path = path.as_ref();

        let fragments = self.partitioner.partition(path, config).await?;
        let classified = classify_fragments(fragments);
        let element_count = classified.elements.len();

        let outcomes = self.summarizer.summarize_batch(classified.elements).await;

        let mut rejected = 0usize;
        let mut pairs = Vec::new();
        for outcome in outcomes {
            match outcome {
                SummaryOutcome::Summarized { element, summary } => {
                    match timeout(self.config.request_timeout, self.embeddings.embed(&summary))
                        .await
                    {
                        Ok(Ok(embedding)) => pairs.push((element, summary, embedding)),
                        Ok(Err(err)) => {
                            warn!(kind = element.kind(), %err, "summary embedding failed; excluding element");
                            rejected += 1;
                        }
                        Err(_) => {
                            warn!(kind = element.kind(), "summary embedding timed out; excluding element");
                            rejected += 1;
                        }
                    }
                }
                SummaryOutcome::Failed { element, error } => {
                    warn!(kind = element.kind(), %error, "element excluded from indexing");
                    rejected += 1;
                }
            }
        }

        let batch = self.store.insert_batch(pairs);
        rejected += batch.failed;
        let report = IngestReport {
            accepted: batch.inserted.len(),
            rejected,
            dropped_fragments: classified.dropped,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            path = %path.display(),
            elements = element_count,
            accepted = report.accepted,
            rejected = report.rejected,
            dropped_fragments = report.dropped_fragments,
            "ingestion complete"
        );
        Ok(report)
    }

    /// Answers a question from indexed content, failing with a typed error
    /// rather than returning partial text.
    pub async fn ask(&self, question: &str) -> Result<String, RagError> {
        let (answer, _) = self.ask_with_context(question).await?;
        Ok(answer)
    }

    /// Like [`ask`](Self::ask), also returning the retrieval hits the answer
    /// was grounded on.
    pub async fn ask_with_context(
        &self,
        question: &str,
    ) -> Result<(String, RetrievalResult), RagError> {
        if self.store.is_empty() {
            return Err(RagError::Retrieval("the index is empty".into()));
        }
        let retrieved = self.retriever.retrieve(question, self.config.top_k).await?;
        if retrieved.is_empty() {
            return Err(RagError::Retrieval(
                "no retrievable content for this question".into(),
            ));
        }
        let answer = self.composer.answer(question, &retrieved).await?;
        Ok((answer, retrieved))
    }
}

/// Builder for constructing [`RagPipeline`] instances.
///
/// Embedding and completion providers are required; the partitioner defaults
/// to [`TextPartitioner`] and the store to [`DualStore::in_memory`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    partitioner: Option<Arc<dyn DocumentPartitioner>>,
    store: Option<Arc<DualStore>>,
    embeddings: Option<Arc<dyn EmbeddingProvider>>,
    completions: Option<Arc<dyn CompletionProvider>>,
    config: PipelineConfig,
}

impl RagPipelineBuilder {
    #[must_use]
    pub fn with_partitioner(mut self, partitioner: Arc<dyn DocumentPartitioner>) -> Self {
        self.partitioner = Some(partitioner);
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<DualStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embeddings = Some(provider);
        self
    }

    #[must_use]
    pub fn with_completion_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.completions = Some(provider);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Panics
    ///
    /// Panics if either provider is missing; use
    /// [`try_build`](Self::try_build) for a fallible variant.
    pub fn build(self) -> RagPipeline {
        self.try_build()
            .expect("RagPipelineBuilder requires embedding and completion providers")
    }

    /// Build the [`RagPipeline`], returning `None` if a provider is not set.
    pub fn try_build(self) -> Option<RagPipeline> {
        let embeddings = self.embeddings?;
        let completions = self.completions?;
        let partitioner = self
            .partitioner
            .unwrap_or_else(|| Arc::new(TextPartitioner::new()));
        let store = self.store.unwrap_or_else(|| Arc::new(DualStore::in_memory()));
        let config = self.config;

        let summarizer = Summarizer::new(Arc::clone(&completions), config.summarizer.clone());
        let retriever = Retriever::new(
            Arc::clone(&store),
            Arc::clone(&embeddings),
            config.request_timeout,
        );
        let composer = AnswerComposer::new(completions, config.answer.clone());

        Some(RagPipeline {
            partitioner,
            store,
            embeddings,
            summarizer,
            retriever,
            composer,
            config,
        })
    }
}
