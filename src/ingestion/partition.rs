//! Document partitioner seam.
//!
//! Layout parsing and OCR are external collaborators: the pipeline only
//! consumes their output, an ordered sequence of typed [`RawFragment`]s. The
//! [`TextPartitioner`] built-in covers plain-text and markdown-style files so
//! pipelines are runnable end to end without an external layout service.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::types::RagError;

/// Knobs forwarded to the partitioner, mirroring common layout-extraction
/// chunking options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Hard upper bound on fragment size.
    pub max_chars: usize,
    /// Soft boundary: start a new fragment once the current one passes this.
    pub new_after_n_chars: usize,
    /// Combine adjacent small text blocks until they reach this size.
    pub combine_under_n_chars: usize,
    /// Whether the partitioner should extract embedded images.
    pub extract_images: bool,
    /// Whether the partitioner should infer table structure.
    pub infer_table_structure: bool,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            max_chars: 4000,
            new_after_n_chars: 3800,
            combine_under_n_chars: 2000,
            extract_images: false,
            infer_table_structure: true,
        }
    }
}

/// An opaque fragment emitted by the partitioner: a structural type tag plus
/// extracted text. Tags are interpreted by the classifier, nowhere else.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFragment {
    pub tag: String,
    pub text: String,
}

impl RawFragment {
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
        }
    }
}

/// Splits a document into an ordered sequence of typed fragments.
#[async_trait]
pub trait DocumentPartitioner: Send + Sync {
    async fn partition(
        &self,
        path: &Path,
        config: &PartitionConfig,
    ) -> Result<Vec<RawFragment>, RagError>;
}

/// Built-in partitioner for plain-text and markdown-style documents.
///
/// Blank lines delimit blocks; consecutive pipe-prefixed lines form a
/// `Table` fragment, everything else becomes a `CompositeElement`. Adjacent
/// text blocks are combined up to `combine_under_n_chars` and split at
/// `max_chars`, matching the contract external layout partitioners follow.
#[derive(Clone, Debug, Default)]
pub struct TextPartitioner;

impl TextPartitioner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentPartitioner for TextPartitioner {
    async fn partition(
        &self,
        path: &Path,
        config: &PartitionConfig,
    ) -> Result<Vec<RawFragment>, RagError> {
        let raw = fs::read_to_string(path).await.map_err(|err| {
            RagError::Ingestion(format!("unable to read {}: {err}", path.display()))
        })?;
        Ok(partition_text(&raw, config))
    }
}

/// Pure splitting logic behind [`TextPartitioner`].
pub fn partition_text(raw: &str, config: &PartitionConfig) -> Vec<RawFragment> {
    let mut fragments = Vec::new();
    let mut pending_text = String::new();

    let flush_text = |pending: &mut String, fragments: &mut Vec<RawFragment>| {
        let trimmed = pending.trim();
        if !trimmed.is_empty() {
            for piece in split_at_max(trimmed, config.max_chars) {
                fragments.push(RawFragment::new("CompositeElement", piece));
            }
        }
        pending.clear();
    };

    for block in raw.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        if is_table_block(block) {
            flush_text(&mut pending_text, &mut fragments);
            fragments.push(RawFragment::new("Table", block));
            continue;
        }

        let soft_limit = config.new_after_n_chars.min(config.max_chars).max(1);
        let would_grow = pending_text.len() + block.len() + 2;
        if !pending_text.is_empty()
            && (pending_text.len() >= config.combine_under_n_chars || would_grow > soft_limit)
        {
            flush_text(&mut pending_text, &mut fragments);
        }
        if !pending_text.is_empty() {
            pending_text.push_str("\n\n");
        }
        pending_text.push_str(block);
    }
    flush_text(&mut pending_text, &mut fragments);

    fragments
}

fn is_table_block(block: &str) -> bool {
    let mut lines = block.lines().filter(|line| !line.trim().is_empty());
    let mut any = false;
    for line in &mut lines {
        if !line.trim_start().starts_with('|') {
            return false;
        }
        any = true;
    }
    any
}

fn split_at_max(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if text.len() <= max_chars {
        return vec![text.to_string()];
    }
    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > max_chars {
            pieces.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn tables_are_separated_from_prose() {
        let raw = "Intro paragraph about models.\n\n\
                   | Model | Accuracy |\n| Ultra | 90.04 |\n\n\
                   Closing remarks.";
        let fragments = partition_text(raw, &PartitionConfig::default());

        let tags: Vec<&str> = fragments.iter().map(|f| f.tag.as_str()).collect();
        assert_eq!(tags, vec!["CompositeElement", "Table", "CompositeElement"]);
        assert!(fragments[1].text.contains("90.04"));
    }

    #[test]
    fn small_text_blocks_combine() {
        let raw = "One.\n\nTwo.\n\nThree.";
        let fragments = partition_text(raw, &PartitionConfig::default());
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].text.contains("Two."));
    }

    #[test]
    fn oversized_blocks_split_at_max_chars() {
        let word = "lorem ";
        let raw = word.repeat(100);
        let config = PartitionConfig {
            max_chars: 60,
            new_after_n_chars: 50,
            combine_under_n_chars: 10,
            ..PartitionConfig::default()
        };
        let fragments = partition_text(&raw, &config);
        assert!(fragments.len() > 1);
        assert!(fragments.iter().all(|f| f.text.len() <= 60));
    }

    #[tokio::test]
    async fn missing_file_is_an_ingestion_error() {
        let partitioner = TextPartitioner::new();
        let err = partitioner
            .partition(Path::new("/nonexistent/doc.txt"), &PartitionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Ingestion(_)));
    }

    #[tokio::test]
    async fn partitions_a_real_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Some prose.\n\n| a | b |\n| 1 | 2 |").unwrap();
        let partitioner = TextPartitioner::new();
        let fragments = partitioner
            .partition(file.path(), &PartitionConfig::default())
            .await
            .unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].tag, "Table");
    }
}
