//! In-memory vector index with deterministic ranking.

use uuid::Uuid;

use super::VectorIndex;
use crate::types::RagError;

struct Entry {
    id: Uuid,
    embedding: Vec<f32>,
}

/// Process-lifetime vector index over summary embeddings.
///
/// Entries are write-once and kept in insertion order, which doubles as the
/// tie-break for equal similarity scores (earliest inserted wins). Cosine
/// similarity, descending.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    entries: Vec<Entry>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for InMemoryVectorIndex {
    fn insert(&mut self, id: Uuid, embedding: Vec<f32>) -> Result<(), RagError> {
        if embedding.is_empty() {
            return Err(RagError::Embedding("refusing to index an empty vector".into()));
        }
        if let Some(first) = self.entries.first() {
            if first.embedding.len() != embedding.len() {
                return Err(RagError::Embedding(format!(
                    "dimension mismatch: index holds {}-d vectors, got {}-d",
                    first.embedding.len(),
                    embedding.len()
                )));
            }
        }
        if self.entries.iter().any(|entry| entry.id == id) {
            return Err(RagError::IndexConsistency(format!(
                "id {id} already present in the vector index"
            )));
        }
        self.entries.push(Entry { id, embedding });
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(Uuid, f32)> {
        if k == 0 || self.entries.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(Uuid, f32)> = self
            .entries
            .iter()
            .map(|entry| (entry.id, cosine_similarity(&entry.embedding, query)))
            .collect();
        // Stable sort over insertion-ordered entries keeps the earliest entry
        // first among equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
