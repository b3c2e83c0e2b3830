//! Shared types for the tablesmith pipeline.
//!
//! This module defines the [`Element`] variant that flows through ingestion
//! and the crate-wide [`RagError`] taxonomy. Error variants map one-to-one to
//! pipeline stages so callers can tell a partitioning failure apart from a
//! generation failure without string matching.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A classified unit of extracted document content.
///
/// Elements are produced by the classifier from raw partitioner fragments and
/// consumed by summarization and indexing. Tables keep their raw textual form
/// untouched; only the derived summary is ever rewritten by a model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Element {
    /// Prose content (narrative text, composite text blocks).
    Text(String),
    /// Tabular content, preserved verbatim from extraction.
    Table(String),
}

impl Element {
    /// The raw content carried by this element, regardless of variant.
    pub fn content(&self) -> &str {
        match self {
            Element::Text(content) | Element::Table(content) => content,
        }
    }

    /// Returns `true` for [`Element::Table`].
    #[must_use]
    pub fn is_table(&self) -> bool {
        matches!(self, Element::Table(_))
    }

    /// Short label for logs and telemetry.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Text(_) => "text",
            Element::Table(_) => "table",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.content())
    }
}

/// Error taxonomy for the ingestion and query pipelines.
///
/// Propagation policy: per-element summarization and embedding failures during
/// ingestion are recorded (logged plus counted in the ingest report) rather
/// than raised; every other variant propagates to the immediate caller.
#[derive(Debug, Error)]
pub enum RagError {
    /// Document-level ingestion failure (unreadable, missing, or corrupt
    /// input). Aborts that document.
    #[error("ingestion failed: {0}")]
    Ingestion(String),

    /// Generative backend failure or malformed response while summarizing a
    /// single element. Isolated per element, never aborts the batch.
    #[error("summarization failed: {0}")]
    Summarization(String),

    /// Embedding service failure or malformed vector.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The id bijection between the vector and content stores was violated.
    /// Read paths degrade defensively; write paths surface this.
    #[error("index consistency violated: {0}")]
    IndexConsistency(String),

    /// Query-time failure before answer composition (empty question, empty
    /// index, failed query embedding).
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// Final-answer backend failure. Surfaced to the caller; no partial
    /// answer is returned.
    #[error("answer generation failed: {0}")]
    Generation(String),

    /// Transport-level HTTP failure from a provider call.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
