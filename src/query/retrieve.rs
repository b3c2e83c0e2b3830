//! Query-side retrieval: question → ranked raw content.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::providers::EmbeddingProvider;
use crate::stores::DualStore;
use crate::types::RagError;

/// One retrieval hit resolved to raw content.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: Uuid,
    pub score: f32,
    pub content: String,
}

/// Ranked retrieval hits, best first.
pub type RetrievalResult = Vec<RetrievedChunk>;

/// Embeds questions and resolves nearest-neighbor hits against the dual
/// store.
///
/// Uses the same embedding provider as ingestion; that consistency is what
/// makes summary-space search meaningful. A hit whose id is missing from the
/// content store (bijection violated by an external fault) is skipped and
/// logged rather than failing the whole retrieval.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<DualStore>,
    embeddings: Arc<dyn EmbeddingProvider>,
    request_timeout: Duration,
}

impl Retriever {
    pub fn new(
        store: Arc<DualStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            store,
            embeddings,
            request_timeout,
        }
    }

    /// Returns the top `k` raw-content hits for `question`, preserving rank
    /// order of the surviving hits. An empty index yields an empty result.
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult, RagError> {
        if question.trim().is_empty() {
            return Err(RagError::Retrieval("question is empty".into()));
        }

        let embedding = match timeout(self.request_timeout, self.embeddings.embed(question)).await
        {
            Ok(Ok(embedding)) => embedding,
            Ok(Err(err)) => {
                return Err(RagError::Retrieval(format!("query embedding failed: {err}")));
            }
            Err(_) => {
                return Err(RagError::Retrieval(format!(
                    "query embedding timed out after {:?}",
                    self.request_timeout
                )));
            }
        };

        let hits = self.store.search(&embedding, k);
        let mut results = Vec::with_capacity(hits.len());
        let mut skipped = 0usize;
        for (id, score) in hits {
            match self.store.get(&id) {
                Some(record) => results.push(RetrievedChunk {
                    id,
                    score,
                    content: record.element.content().to_string(),
                }),
                None => {
                    warn!(%id, "retrieved id missing from content store; skipping hit");
                    skipped += 1;
                }
            }
        }
        debug!(
            hits = results.len(),
            skipped,
            "retrieval complete"
        );
        Ok(results)
    }
}
