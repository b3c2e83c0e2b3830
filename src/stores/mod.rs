//! Dual-store indexing: the core data structure of the pipeline.
//!
//! Retrieval quality depends on searching *summaries* while answering from
//! *raw content*, so the two live side by side under a shared id:
//!
//! ```text
//!              ┌──────────────────────────────┐
//!   insert ───►│          DualStore           │
//!              │  ┌────────────┐ ┌──────────┐ │
//!              │  │VectorIndex │ │ Content  │ │
//!              │  │summary emb │ │ raw text │ │
//!              │  │  id → vec  │ │ id → doc │ │
//!              │  └────────────┘ └──────────┘ │
//!              └──────────────────────────────┘
//!                  search(k) ▲      get(id) ▲
//! ```
//!
//! Invariant: the id sets of both sides are identical at every observable
//! moment (the bijection invariant). Each insert commits to both sides under
//! a single write lock and rolls back the content side if the vector index
//! rejects the entry, so no reader ever sees a dangling half-record.

pub mod memory;

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::types::{Element, RagError};

pub use memory::InMemoryVectorIndex;

/// A summary embedding committed to the vector side of the dual store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: Uuid,
    pub summary: String,
    pub embedding: Vec<f32>,
}

/// Raw element content committed to the content side of the dual store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: Uuid,
    pub element: Element,
}

/// Pluggable nearest-neighbor index over summary embeddings.
///
/// Implementations must rank by descending similarity and break equal scores
/// by insertion order (earliest first) so retrieval stays deterministic.
/// Entries are write-once: no in-place mutation of an existing embedding.
pub trait VectorIndex: Send + Sync {
    fn insert(&mut self, id: Uuid, embedding: Vec<f32>) -> Result<(), RagError>;

    /// Ranked `(id, score)` pairs, best first, at most `k` of them.
    fn search(&self, query: &[f32], k: usize) -> Vec<(Uuid, f32)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of a batch insert: which pairs committed and how many failed.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub inserted: Vec<Uuid>,
    pub failed: usize,
}

struct DualStoreInner {
    index: Box<dyn VectorIndex>,
    summaries: HashMap<Uuid, SummaryRecord>,
    content: HashMap<Uuid, ContentRecord>,
}

/// The paired vector + content store keyed by shared ids.
///
/// Constructed once and passed by reference into both the ingestion and
/// query pipelines; there is no ambient global state. Writes serialize
/// through the write lock, reads (`search`, `get`) run concurrently against
/// committed state.
pub struct DualStore {
    inner: RwLock<DualStoreInner>,
}

impl DualStore {
    /// Creates a dual store over a custom vector index implementation.
    pub fn new(index: Box<dyn VectorIndex>) -> Self {
        Self {
            inner: RwLock::new(DualStoreInner {
                index,
                summaries: HashMap::new(),
                content: HashMap::new(),
            }),
        }
    }

    /// Creates a dual store backed by [`InMemoryVectorIndex`].
    pub fn in_memory() -> Self {
        Self::new(Box::new(InMemoryVectorIndex::new()))
    }

    /// Commits one summarized element to both sides as an atomic unit.
    ///
    /// Mints a fresh id; on any failure neither side retains the id.
    pub fn insert(
        &self,
        element: Element,
        summary: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Result<Uuid, RagError> {
        let id = Uuid::new_v4();
        let summary = summary.into();
        let mut inner = self.inner.write();

        if inner.content.contains_key(&id) {
            // Fresh v4 ids should never collide; treat it as corruption.
            return Err(RagError::IndexConsistency(format!(
                "freshly minted id {id} already present in the content store"
            )));
        }
        inner.summaries.insert(
            id,
            SummaryRecord {
                id,
                summary,
                embedding: embedding.clone(),
            },
        );
        inner.content.insert(id, ContentRecord { id, element });
        if let Err(err) = inner.index.insert(id, embedding) {
            // Roll back so no reader ever observes a half-record.
            inner.summaries.remove(&id);
            inner.content.remove(&id);
            return Err(err);
        }
        Ok(id)
    }

    /// Applies [`insert`](Self::insert) per pair with failure isolation: one
    /// failing pair never blocks or rolls back the others.
    pub fn insert_batch(&self, pairs: Vec<(Element, String, Vec<f32>)>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (element, summary, embedding) in pairs {
            let kind = element.kind();
            match self.insert(element, summary, embedding) {
                Ok(id) => outcome.inserted.push(id),
                Err(err) => {
                    warn!(kind, %err, "dropping element from index");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    /// Nearest-neighbor search over summary embeddings. An empty store
    /// yields an empty list, never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(Uuid, f32)> {
        self.inner.read().index.search(query, k)
    }

    /// O(1) raw-content lookup by id.
    pub fn get(&self, id: &Uuid) -> Option<ContentRecord> {
        self.inner.read().content.get(id).cloned()
    }

    /// The summary record that produced a vector entry, if committed.
    pub fn get_summary(&self, id: &Uuid) -> Option<SummaryRecord> {
        self.inner.read().summaries.get(id).cloned()
    }

    /// Ids currently committed to the content side, unordered.
    pub fn ids(&self) -> Vec<Uuid> {
        self.inner.read().content.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verifies the bijection invariant; used by tests and health checks.
    pub fn check_consistency(&self) -> Result<(), RagError> {
        let inner = self.inner.read();
        if inner.index.len() != inner.content.len() || inner.summaries.len() != inner.content.len()
        {
            return Err(RagError::IndexConsistency(format!(
                "vector index holds {} entries, {} summaries, content store holds {}",
                inner.index.len(),
                inner.summaries.len(),
                inner.content.len()
            )));
        }
        for id in inner.content.keys() {
            if !inner.summaries.contains_key(id) {
                return Err(RagError::IndexConsistency(format!(
                    "id {id} present in content store but missing a summary record"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(content: &str) -> Element {
        Element::Text(content.to_string())
    }

    #[test]
    fn insert_commits_both_sides() {
        let store = DualStore::in_memory();
        let id = store
            .insert(text("raw body"), "short summary", vec![1.0, 0.0])
            .unwrap();

        assert_eq!(store.len(), 1);
        store.check_consistency().unwrap();
        let record = store.get(&id).unwrap();
        assert_eq!(record.element.content(), "raw body");
        let summary = store.get_summary(&id).unwrap();
        assert_eq!(summary.summary, "short summary");
        assert_eq!(summary.embedding, vec![1.0, 0.0]);
    }

    #[test]
    fn failed_insert_leaves_no_half_record() {
        let store = DualStore::in_memory();
        store
            .insert(text("first"), "summary", vec![1.0, 0.0])
            .unwrap();

        // Dimension mismatch fails inside the vector index.
        let err = store
            .insert(text("second"), "summary", vec![1.0])
            .unwrap_err();
        assert!(matches!(err, RagError::Embedding(_)));
        assert_eq!(store.len(), 1);
        store.check_consistency().unwrap();
    }

    #[test]
    fn batch_isolates_failures() {
        let store = DualStore::in_memory();
        let outcome = store.insert_batch(vec![
            (text("good"), "summary a".into(), vec![1.0, 0.0]),
            (text("bad"), "summary b".into(), vec![]),
            (text("also good"), "summary c".into(), vec![0.0, 1.0]),
        ]);

        assert_eq!(outcome.inserted.len(), 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(store.len(), 2);
        store.check_consistency().unwrap();
    }

    #[test]
    fn search_on_empty_store_is_empty() {
        let store = DualStore::in_memory();
        assert!(store.search(&[1.0, 0.0], 4).is_empty());
    }

    #[test]
    fn ids_are_unique_per_insert() {
        let store = DualStore::in_memory();
        let a = store.insert(text("a"), "sa", vec![1.0, 0.0]).unwrap();
        let b = store.insert(text("b"), "sb", vec![0.0, 1.0]).unwrap();
        assert_ne!(a, b);
    }
}
