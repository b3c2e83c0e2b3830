//! End-to-end pipeline tests with mock providers.
//!
//! These exercise the full ingest/ask flow deterministically, without a
//! model backend: a keyword-count embedding provider makes similarity
//! rankings predictable, and scripted completion providers stand in for the
//! generative model.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use tablesmith::ingestion::{PartitionConfig, Summarizer, SummarizerConfig};
use tablesmith::providers::{CompletionProvider, EmbeddingProvider};
use tablesmith::query::ANSWER_PROMPT_TEMPLATE;
use tablesmith::types::{Element, RagError};
use tablesmith::{RagPipeline, RagPipelineBuilder};

const SUMMARY_PREFIX: &str = "Give a concise summary of the table or text. Table or text chunk: ";

/// Embeds text as keyword counts so similarity is predictable in tests.
struct KeywordEmbeddingProvider {
    vocabulary: Vec<&'static str>,
}

impl KeywordEmbeddingProvider {
    fn new() -> Self {
        Self {
            vocabulary: vec![
                "gemini",
                "nano",
                "parameters",
                "ultra",
                "accuracy",
                "model",
            ],
        }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let lowered = text.to_lowercase();
        Ok(self
            .vocabulary
            .iter()
            .map(|keyword| lowered.matches(keyword).count() as f32)
            .collect())
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Summaries echo the element; answers echo the context block, so assertions
/// can check that raw content (tables included) reached the right prompt.
struct EchoCompletionProvider;

#[async_trait]
impl CompletionProvider for EchoCompletionProvider {
    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        if let Some(element) = prompt.strip_prefix(SUMMARY_PREFIX) {
            return Ok(element.to_string());
        }
        let (head, _) = ANSWER_PROMPT_TEMPLATE
            .split_once("{context}")
            .expect("template has a context slot");
        let context = prompt
            .strip_prefix(head)
            .and_then(|rest| rest.rsplit_once("\nQuestion: "))
            .map(|(context, _)| context)
            .unwrap_or(prompt);
        Ok(format!("Based on the context: {context}"))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Echo provider that permanently fails on prompts matching a marker.
struct SelectiveFailProvider {
    fail_on: &'static str,
    inner: EchoCompletionProvider,
}

#[async_trait]
impl CompletionProvider for SelectiveFailProvider {
    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        if prompt.starts_with(SUMMARY_PREFIX) && prompt.contains(self.fail_on) {
            return Err(RagError::Generation("backend rejects this chunk".into()));
        }
        self.inner.complete(prompt).await
    }

    fn name(&self) -> &str {
        "selective-fail"
    }
}

/// Tracks how many calls are in flight simultaneously.
struct CountingProvider {
    current: AtomicUsize,
    max_seen: AtomicUsize,
}

impl CountingProvider {
    fn new() -> Self {
        Self {
            current: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CompletionProvider for CountingProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, RagError> {
        let in_flight = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(in_flight, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok("a short summary".to_string())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn sample_document() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "Gemini Nano has 1.8B parameters.\n\n\
         | Model | Accuracy |\n\
         | Ultra | 90.04 |\n"
    )
    .unwrap();
    file.flush().unwrap();
    file
}

fn pipeline_with(completions: Arc<dyn CompletionProvider>) -> RagPipeline {
    RagPipelineBuilder::default()
        .with_embedding_provider(Arc::new(KeywordEmbeddingProvider::new()))
        .with_completion_provider(completions)
        .build()
}

#[tokio::test]
async fn end_to_end_prose_and_table_questions() {
    let pipeline = pipeline_with(Arc::new(EchoCompletionProvider));
    let file = sample_document();

    let report = pipeline
        .ingest(file.path(), &PartitionConfig::default())
        .await
        .unwrap();
    assert_eq!(report.accepted, 2);
    assert_eq!(report.rejected, 0);
    pipeline.store().check_consistency().unwrap();

    let (answer, retrieved) = pipeline
        .ask_with_context("How many parameters does Gemini Nano have?")
        .await
        .unwrap();
    assert!(retrieved[0].content.contains("1.8B parameters"));
    assert!(answer.contains("1.8B"));

    let (answer, retrieved) = pipeline
        .ask_with_context("What is Ultra's accuracy?")
        .await
        .unwrap();
    assert!(retrieved[0].content.contains("| Ultra | 90.04 |"));
    assert!(answer.contains("90.04"));
}

#[tokio::test]
async fn retrieval_scores_are_non_increasing() {
    let pipeline = pipeline_with(Arc::new(EchoCompletionProvider));
    let file = sample_document();
    pipeline
        .ingest(file.path(), &PartitionConfig::default())
        .await
        .unwrap();

    let (_, retrieved) = pipeline
        .ask_with_context("Which model has the best accuracy, Gemini Nano or Ultra?")
        .await
        .unwrap();
    assert!(retrieved.len() >= 2);
    assert!(retrieved.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn asking_an_empty_index_is_a_typed_retrieval_error() {
    let pipeline = pipeline_with(Arc::new(EchoCompletionProvider));
    let err = pipeline.ask("anything at all").await.unwrap_err();
    assert!(matches!(err, RagError::Retrieval(_)));
}

#[tokio::test]
async fn partial_failure_isolates_the_failing_element() {
    let pipeline = pipeline_with(Arc::new(SelectiveFailProvider {
        fail_on: "| Ultra | 90.04 |",
        inner: EchoCompletionProvider,
    }));
    let file = sample_document();

    let report = pipeline
        .ingest(file.path(), &PartitionConfig::default())
        .await
        .unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(report.rejected, 1);

    // Bijection holds after the partial failure; the failed table is in
    // neither store.
    let store = pipeline.store();
    store.check_consistency().unwrap();
    assert_eq!(store.len(), 1);
    let surviving = store.ids();
    let record = store.get(&surviving[0]).unwrap();
    assert!(record.element.content().contains("Gemini Nano"));

    // The surviving element is still retrievable.
    let (answer, _) = pipeline
        .ask_with_context("How many parameters does Gemini Nano have?")
        .await
        .unwrap();
    assert!(answer.contains("1.8B"));
}

#[tokio::test]
async fn summarization_respects_the_concurrency_bound() {
    let provider = Arc::new(CountingProvider::new());
    let summarizer = Summarizer::new(
        Arc::clone(&provider) as Arc<dyn CompletionProvider>,
        SummarizerConfig {
            max_concurrency: 2,
            ..SummarizerConfig::default()
        },
    );

    let elements: Vec<Element> = (0..5)
        .map(|i| Element::Text(format!("element number {i}")))
        .collect();
    let outcomes = summarizer.summarize_batch(elements).await;

    assert_eq!(outcomes.len(), 5);
    assert!(outcomes.iter().all(|outcome| outcome.is_summarized()));
    let max_seen = provider.max_seen.load(Ordering::SeqCst);
    assert!(
        max_seen <= 2,
        "at most 2 calls may be outstanding, saw {max_seen}"
    );
}

#[tokio::test]
async fn reingesting_the_same_document_duplicates_content() {
    // Fresh ids per run: re-ingestion is additive, not deduplicated.
    let pipeline = pipeline_with(Arc::new(EchoCompletionProvider));
    let file = sample_document();

    pipeline
        .ingest(file.path(), &PartitionConfig::default())
        .await
        .unwrap();
    pipeline
        .ingest(file.path(), &PartitionConfig::default())
        .await
        .unwrap();

    let store = pipeline.store();
    assert_eq!(store.len(), 4);
    store.check_consistency().unwrap();
}
