//! Retrieval indexes: sparse lexical scoring, hybrid dense/sparse merging,
//! and evidence compaction.
//!
//! Tokenization is shared between the sparse index and the compactor so
//! query-term overlap is judged with the same vocabulary the index scores
//! with. CJK ideographs tokenize per character; bigrams recover the
//! multi-character terms.

mod compact;
mod hybrid;
mod sparse;

pub use compact::ContextCompactor;
pub use hybrid::{HybridRetriever, RetrievalResult};
pub use sparse::TfIdfIndex;

use std::sync::OnceLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

// Unwrap is on a constant pattern.
#[allow(clippy::unwrap_used)]
fn punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s\x{4e00}-\x{9fff}]").unwrap())
}

/// Lowercases, strips punctuation, and splits on word boundaries.
///
/// Unicode word segmentation emits CJK ideographs one per token, which is
/// what the per-character indexing scheme wants.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    let cleaned = punctuation().replace_all(text, " ");
    cleaned
        .unicode_words()
        .map(|w| w.to_lowercase())
        .collect()
}
