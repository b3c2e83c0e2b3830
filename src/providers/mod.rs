//! External service seams: embeddings and generative completions.
//!
//! Both seams are object-safe async traits so pipelines can be wired against
//! a real backend, a mock, or anything in between without touching the core.

pub mod completion;
pub mod embeddings;

pub use completion::{CompletionProvider, OllamaCompletionProvider};
pub use embeddings::{EmbeddingProvider, MockEmbeddingProvider, OllamaEmbeddingProvider};
