//! Generative-model providers.
//!
//! One provider serves both generative call sites: element summarization
//! during ingestion and final answer synthesis at query time. The prompt
//! templates live next to their call sites
//! ([`crate::ingestion::summarize`], [`crate::query::answer`]).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::RagError;

/// Turns a prompt into completion text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, RagError>;

    /// Human-readable provider name for telemetry.
    fn name(&self) -> &str;
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Completion provider backed by an Ollama-compatible `/api/generate`
/// endpoint. Streaming is disabled; the pipeline consumes whole responses.
#[derive(Clone, Debug)]
pub struct OllamaCompletionProvider {
    client: Client,
    endpoint: Url,
    model: String,
}

impl OllamaCompletionProvider {
    pub fn new(base_url: &Url, model: impl Into<String>) -> Result<Self, RagError> {
        let endpoint = base_url
            .join("api/generate")
            .map_err(|err| RagError::Generation(format!("invalid base url: {err}")))?;
        let client = Client::builder().use_rustls_tls().build()?;
        Ok(Self {
            client,
            endpoint,
            model: model.into(),
        })
    }
}

#[async_trait]
impl CompletionProvider for OllamaCompletionProvider {
    async fn complete(&self, prompt: &str) -> Result<String, RagError> {
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let parsed: OllamaGenerateResponse = response.json().await?;
        Ok(parsed.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
