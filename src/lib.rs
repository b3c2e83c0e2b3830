//! Multi-vector indexing and retrieval for semi-structured documents.
//!
//! Tables embedded in prose survive retrieval intact: similarity search runs
//! over cheap generative summaries while answer composition always sees the
//! raw extracted content.
//!
//! ```text
//! Document ──► partition ──► classify ──► summarize ──┐
//!                 (external seam)        (bounded)    │
//!                                                     ▼
//!                                          stores::DualStore
//!                                   vector side   +   content side
//!                                  (summary emb)     (raw elements)
//!                                                     ▲
//! Question ──► embed ──► search ──► resolve ids ──────┘
//!                                       │
//!                                       └──► compose ──► answer
//! ```
//!
//! The [`pipeline::RagPipeline`] wires the stages together; each stage is
//! also usable standalone against the provider traits in [`providers`].

pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod query;
pub mod stores;
pub mod types;

pub use ingestion::{PartitionConfig, Summarizer, SummarizerConfig, TextPartitioner};
pub use pipeline::{IngestReport, PipelineConfig, RagPipeline, RagPipelineBuilder};
pub use providers::{CompletionProvider, EmbeddingProvider, MockEmbeddingProvider};
pub use query::{AnswerConfig, RetrievalResult, RetrievedChunk};
pub use stores::{DualStore, InMemoryVectorIndex, VectorIndex};
pub use types::{Element, RagError};
