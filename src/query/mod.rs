//! Query path: embed → search → resolve → compose.

pub mod answer;
pub mod retrieve;

pub use answer::{ANSWER_PROMPT_TEMPLATE, AnswerComposer, AnswerConfig, answer_prompt};
pub use retrieve::{RetrievalResult, RetrievedChunk, Retriever};
