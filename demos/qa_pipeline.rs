//! End-to-end question answering over a document mixing prose and a table.
//!
//! Run with:
//!   cargo run --example qa_pipeline
//!
//! By default this uses deterministic in-process providers so it works
//! offline. Point it at a live Ollama instance to use real models:
//!   TABLESMITH_OLLAMA_URL=http://localhost:11434 \
//!   TABLESMITH_EMBED_MODEL=nomic-embed-text \
//!   TABLESMITH_CHAT_MODEL=gemma3 cargo run --example qa_pipeline

use std::env;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tracing_subscriber::FmtSubscriber;
use url::Url;

use tablesmith::ingestion::PartitionConfig;
use tablesmith::providers::{
    CompletionProvider, EmbeddingProvider, OllamaCompletionProvider, OllamaEmbeddingProvider,
};
use tablesmith::query::ANSWER_PROMPT_TEMPLATE;
use tablesmith::types::RagError;
use tablesmith::RagPipeline;

const DOCUMENT: &str = "\
Gemini Nano is the smallest model in the family, with 1.8B parameters for \
the Nano-1 variant. It is designed to run on-device.

| Model | MMLU Accuracy |
| Ultra | 90.04 |
| Pro   | 79.13 |
| Nano  | 51.00 |

The larger Ultra model targets data-center deployment and leads the family \
on benchmark accuracy.";

#[tokio::main]
async fn main() -> Result<(), RagError> {
    init_tracing();

    let pipeline = match env::var("TABLESMITH_OLLAMA_URL") {
        Ok(raw) => {
            let base = Url::parse(&raw)
                .map_err(|err| RagError::Ingestion(format!("invalid Ollama url: {err}")))?;
            let embed_model =
                env::var("TABLESMITH_EMBED_MODEL").unwrap_or_else(|_| "nomic-embed-text".into());
            let chat_model =
                env::var("TABLESMITH_CHAT_MODEL").unwrap_or_else(|_| "gemma3".into());
            println!("Using Ollama at {base} ({embed_model} / {chat_model})");
            RagPipeline::builder()
                .with_embedding_provider(Arc::new(OllamaEmbeddingProvider::new(
                    &base,
                    embed_model,
                )?))
                .with_completion_provider(Arc::new(OllamaCompletionProvider::new(
                    &base, chat_model,
                )?))
                .build()
        }
        Err(_) => {
            println!("Using offline demo providers (set TABLESMITH_OLLAMA_URL for real models)");
            RagPipeline::builder()
                .with_embedding_provider(Arc::new(KeywordEmbeddings))
                .with_completion_provider(Arc::new(ExtractiveCompletions))
                .build()
        }
    };

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(DOCUMENT.as_bytes())?;
    file.flush()?;

    let report = pipeline
        .ingest(file.path(), &PartitionConfig::default())
        .await?;
    println!(
        "Ingested: {} elements accepted, {} rejected ({} ms)",
        report.accepted, report.rejected, report.duration_ms
    );

    for question in [
        "How many parameters does Gemini Nano have?",
        "What is Ultra's MMLU accuracy?",
    ] {
        let (answer, retrieved) = pipeline.ask_with_context(question).await?;
        println!("\nQ: {question}");
        println!(
            "   top hit ({} chars, score {:.3}): {}",
            retrieved[0].content.len(),
            retrieved[0].score,
            retrieved[0].content.lines().next().unwrap_or_default()
        );
        println!("A: {answer}");
    }

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Keyword-count embeddings: crude, deterministic, good enough for a demo.
struct KeywordEmbeddings;

#[async_trait]
impl EmbeddingProvider for KeywordEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        const VOCABULARY: &[&str] = &[
            "gemini", "nano", "parameters", "ultra", "pro", "accuracy", "mmlu", "model",
        ];
        let lowered = text.to_lowercase();
        Ok(VOCABULARY
            .iter()
            .map(|keyword| lowered.matches(keyword).count() as f32)
            .collect())
    }

    fn name(&self) -> &str {
        "keyword-demo"
    }
}

/// Summaries echo the chunk; answers quote the retrieved context.
struct ExtractiveCompletions;

#[async_trait]
impl CompletionProvider for ExtractiveCompletions {
    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        const SUMMARY_PREFIX: &str =
            "Give a concise summary of the table or text. Table or text chunk: ";
        if let Some(element) = prompt.strip_prefix(SUMMARY_PREFIX) {
            return Ok(element.chars().take(120).collect());
        }
        let head = ANSWER_PROMPT_TEMPLATE
            .split_once("{context}")
            .map(|(head, _)| head)
            .unwrap_or_default();
        let context = prompt
            .strip_prefix(head)
            .and_then(|rest| rest.rsplit_once("\nQuestion: "))
            .map(|(context, _)| context)
            .unwrap_or(prompt);
        Ok(format!("According to the document: {context}"))
    }

    fn name(&self) -> &str {
        "extractive-demo"
    }
}
