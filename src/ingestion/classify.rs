//! Element classification.
//!
//! Maps raw partitioner fragments onto the two categories the rest of the
//! pipeline cares about. Everything else (page breaks, headers, figures) is
//! silently dropped here and only surfaces as a telemetry count.

use tracing::debug;

use crate::ingestion::partition::RawFragment;
use crate::types::Element;

/// Structural tags treated as tabular content.
const TABLE_TAGS: &[&str] = &["table"];

/// Structural tags treated as prose content.
const TEXT_TAGS: &[&str] = &["compositeelement", "narrativetext", "text"];

/// Result of classifying a fragment sequence.
#[derive(Debug, Default)]
pub struct Classified {
    /// Elements in original fragment order.
    pub elements: Vec<Element>,
    /// Fragments whose tag matched neither category.
    pub dropped: usize,
}

/// Tags each fragment as text or table, dropping unrecognized tags.
///
/// Pure function: no side effects beyond a debug log per dropped fragment.
pub fn classify_fragments(fragments: Vec<RawFragment>) -> Classified {
    let mut classified = Classified::default();
    for fragment in fragments {
        let tag = fragment.tag.to_ascii_lowercase();
        if TABLE_TAGS.contains(&tag.as_str()) {
            classified.elements.push(Element::Table(fragment.text));
        } else if TEXT_TAGS.contains(&tag.as_str()) {
            classified.elements.push(Element::Text(fragment.text));
        } else {
            debug!(tag = %fragment.tag, "dropping fragment with unrecognized tag");
            classified.dropped += 1;
        }
    }
    classified
}
