//! Ingestion path: partition → classify → summarize.
//!
//! * [`partition`] — the external layout-partitioner seam plus a built-in
//!   plain-text partitioner.
//! * [`classify`] — tags fragments as text or table, drops everything else.
//! * [`summarize`] — generative summaries with bounded concurrency and
//!   per-element failure isolation.

pub mod classify;
pub mod partition;
pub mod summarize;

pub use classify::{Classified, classify_fragments};
pub use partition::{DocumentPartitioner, PartitionConfig, RawFragment, TextPartitioner};
pub use summarize::{
    SUMMARY_PROMPT_TEMPLATE, Summarizer, SummarizerConfig, SummaryOutcome, summary_prompt,
};
