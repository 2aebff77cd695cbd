use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A retrievable unit of corpus text plus its provenance metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// The chunk text, trimmed of surrounding whitespace.
    pub content: String,
    /// Globally unique identifier, `{source_label}_{counter}`.
    pub chunk_id: String,
    /// Label of the source document this chunk came from.
    pub source_file: String,
    /// Build-wide ordinal, monotonically assigned across every document
    /// chunked by one chunker instance.
    pub chunk_index: usize,
    /// Free-form metadata carried alongside the chunk into the stores.
    pub metadata: FxHashMap<String, serde_json::Value>,
}

impl DocumentChunk {
    /// Character length of the chunk content.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Classifies text as `"chinese"` when it contains any CJK unified
/// ideograph, `"english"` otherwise.
#[must_use]
pub fn language_of(text: &str) -> &'static str {
    if text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c)) {
        "chinese"
    } else {
        "english"
    }
}
