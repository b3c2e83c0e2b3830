//! Embedding providers.
//!
//! The pipeline embeds summaries at ingest time and questions at query time
//! with the *same* provider instance. Embedding-space consistency is
//! load-bearing: mixing models silently degrades recall with no error, so
//! [`crate::pipeline::RagPipeline`] accepts exactly one provider and routes
//! both paths through it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::RagError;

/// Produces fixed-length embedding vectors for arbitrary text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;

    /// Embed a batch of texts, preserving input order.
    ///
    /// The default implementation embeds sequentially; providers with a
    /// native batch endpoint should override it.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Human-readable provider name for telemetry.
    fn name(&self) -> &str;
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding provider backed by an Ollama-compatible `/api/embed` endpoint.
#[derive(Clone, Debug)]
pub struct OllamaEmbeddingProvider {
    client: Client,
    endpoint: Url,
    model: String,
}

impl OllamaEmbeddingProvider {
    /// Creates a provider against `base_url` (for example
    /// `http://localhost:11434`) using the given embedding model.
    pub fn new(base_url: &Url, model: impl Into<String>) -> Result<Self, RagError> {
        let endpoint = base_url
            .join("api/embed")
            .map_err(|err| RagError::Embedding(format!("invalid base url: {err}")))?;
        let client = Client::builder().use_rustls_tls().build()?;
        Ok(Self {
            client,
            endpoint,
            model: model.into(),
        })
    }

    async fn request(&self, inputs: Vec<&str>) -> Result<Vec<Vec<f32>>, RagError> {
        let expected = inputs.len();
        let body = OllamaEmbedRequest {
            model: &self.model,
            input: inputs,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let parsed: OllamaEmbedResponse = response.json().await?;
        if parsed.embeddings.len() != expected {
            return Err(RagError::Embedding(format!(
                "expected {expected} embeddings, got {}",
                parsed.embeddings.len()
            )));
        }
        if parsed.embeddings.iter().any(Vec::is_empty) {
            return Err(RagError::Embedding("backend returned an empty vector".into()));
        }
        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut embeddings = self.request(vec![text]).await?;
        Ok(embeddings.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts.iter().map(String::as_str).collect())
            .await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Deterministic hash-based embedding provider for tests and demos.
///
/// Identical inputs always produce identical vectors, so exact-match recall
/// and cache behavior can be asserted without a model.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimensions: 8 }
    }

    /// Override the vector width (defaults to 8).
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions.max(1);
        self
    }

    fn hash_to_vec(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        (0..self.dimensions)
            .map(|i| {
                let bits = seed.rotate_left((i as u32 % 64) * 8) ^ ((i as u64) << 24);
                (bits as f32) / u32::MAX as f32
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        Ok(self.hash_to_vec(text))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
