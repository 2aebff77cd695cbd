use tracing::debug;

use super::chunk::{language_of, DocumentChunk};
use rustc_hash::FxHashMap;

/// Terminators recognized as sentence boundaries, CJK and ASCII.
const SENTENCE_TERMINATORS: [char; 6] = ['。', '！', '？', '.', '!', '?'];

/// What a [`SourceDocument`] contains.
#[derive(Debug, Clone)]
pub enum SourceKind {
    /// Running prose, to be sentence-chunked.
    Text(String),
    /// Question/answer pairs, ingested one chunk per exchange.
    QaPairs(Vec<(String, String)>),
}

/// A labeled input document for corpus ingestion.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Label used for chunk provenance and id prefixes.
    pub label: String,
    pub kind: SourceKind,
}

impl SourceDocument {
    /// A prose document.
    #[must_use]
    pub fn text(label: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: SourceKind::Text(body.into()),
        }
    }

    /// A question/answer transcript.
    #[must_use]
    pub fn qa_pairs(label: impl Into<String>, pairs: Vec<(String, String)>) -> Self {
        Self {
            label: label.into(),
            kind: SourceKind::QaPairs(pairs),
        }
    }
}

/// Splits documents into overlapping, sentence-aligned chunks.
///
/// Chunk sizes are measured in characters, not bytes, so CJK text packs the
/// same way Latin text does. A counter shared across documents keeps chunk
/// ids unique for the lifetime of the chunker.
#[derive(Debug)]
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    counter: usize,
}

impl SentenceChunker {
    #[must_use]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            counter: 0,
        }
    }

    /// Chunks a single document according to its kind.
    pub fn chunk_document(&mut self, doc: &SourceDocument) -> Vec<DocumentChunk> {
        let chunks = match &doc.kind {
            SourceKind::Text(body) => self.chunk_text(body, &doc.label),
            SourceKind::QaPairs(pairs) => self.chunk_qa(pairs, &doc.label),
        };
        debug!(
            source = %doc.label,
            chunks = chunks.len(),
            "chunked document"
        );
        chunks
    }

    /// Chunks running prose into sentence-aligned windows of roughly
    /// `chunk_size` characters, carrying the last `chunk_overlap` characters
    /// of each emitted chunk into the next. The carry is unconditional, so a
    /// chunk may exceed `chunk_size` by up to the overlap when a sentence
    /// nearly fills the window; a single sentence longer than `chunk_size`
    /// is kept whole.
    pub fn chunk_text(&mut self, text: &str, source_label: &str) -> Vec<DocumentChunk> {
        let sentences = split_sentences(text);
        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_sentences = 0usize;

        for sentence in sentences {
            let buffer_len = buffer.chars().count();
            let sentence_len = sentence.chars().count();
            if buffer_len > 0 && buffer_len + sentence_len > self.chunk_size {
                if let Some(chunk) = self.emit(&buffer, source_label, buffer_sentences) {
                    let carry = tail_chars(&chunk.content, self.chunk_overlap);
                    chunks.push(chunk);
                    buffer = carry;
                    buffer_sentences = 0;
                }
            }
            buffer.push_str(&sentence);
            buffer_sentences += 1;
        }

        if let Some(chunk) = self.emit(&buffer, source_label, buffer_sentences) {
            chunks.push(chunk);
        }
        chunks
    }

    /// Ingests question/answer pairs, one chunk per exchange, so retrieval
    /// always sees the question together with its answer.
    fn chunk_qa(&mut self, pairs: &[(String, String)], source_label: &str) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();
        for (question, answer) in pairs {
            let content = format!("[Q] {}\n[A] {}", question.trim(), answer.trim());
            self.counter += 1;
            let mut metadata = FxHashMap::default();
            metadata.insert("type".to_string(), serde_json::json!("qa_pair"));
            metadata.insert(
                "length".to_string(),
                serde_json::json!(content.chars().count()),
            );
            metadata.insert(
                "language".to_string(),
                serde_json::json!(language_of(&content)),
            );
            chunks.push(DocumentChunk {
                chunk_id: format!("{}_{}", source_label, self.counter),
                source_file: source_label.to_string(),
                chunk_index: self.counter - 1,
                content,
                metadata,
            });
        }
        chunks
    }

    fn emit(
        &mut self,
        buffer: &str,
        source_label: &str,
        sentence_count: usize,
    ) -> Option<DocumentChunk> {
        let content = buffer.trim();
        if content.is_empty() {
            return None;
        }
        self.counter += 1;
        let mut metadata = FxHashMap::default();
        metadata.insert("type".to_string(), serde_json::json!("text"));
        metadata.insert(
            "length".to_string(),
            serde_json::json!(content.chars().count()),
        );
        metadata.insert(
            "sentence_count".to_string(),
            serde_json::json!(sentence_count),
        );
        metadata.insert(
            "language".to_string(),
            serde_json::json!(language_of(content)),
        );
        Some(DocumentChunk {
            content: content.to_string(),
            chunk_id: format!("{}_{}", source_label, self.counter),
            source_file: source_label.to_string(),
            chunk_index: self.counter - 1,
            metadata,
        })
    }
}

/// Splits text into sentences, each keeping its terminator. Text after the
/// last terminator forms a trailing sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if SENTENCE_TERMINATORS.contains(&c) {
            if !current.trim().is_empty() {
                sentences.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current);
    }
    sentences
}

/// Last `n` characters of `s`, on character boundaries.
fn tail_chars(s: &str, n: usize) -> String {
    let total = s.chars().count();
    s.chars().skip(total.saturating_sub(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_cjk_and_ascii_terminators() {
        let sentences = split_sentences("第一句。第二句！Third sentence. Fourth?");
        assert_eq!(sentences.len(), 4);
        assert_eq!(sentences[0], "第一句。");
        assert!(sentences[2].trim_start().starts_with("Third"));
    }

    #[test]
    fn trailing_text_without_terminator_is_kept() {
        let sentences = split_sentences("Complete. An unfinished tail");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1].trim(), "An unfinished tail");
    }

    #[test]
    fn overlong_sentence_stays_whole() {
        let mut chunker = SentenceChunker::new(10, 3);
        let long = "a".repeat(40) + ".";
        let chunks = chunker.chunk_text(&long, "doc");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].char_len(), 41);
    }

    #[test]
    fn ids_are_unique_across_documents() {
        let mut chunker = SentenceChunker::new(20, 5);
        let a = chunker.chunk_text("One. Two. Three. Four. Five. Six.", "a");
        let b = chunker.chunk_text("Seven. Eight. Nine. Ten. Eleven.", "a");
        let mut ids: Vec<&str> = a
            .iter()
            .chain(b.iter())
            .map(|c| c.chunk_id.as_str())
            .collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn qa_pairs_become_single_chunks() {
        let mut chunker = SentenceChunker::new(300, 50);
        let doc = SourceDocument::qa_pairs(
            "faq",
            vec![("When was ITRI founded?".into(), "In 1973.".into())],
        );
        let chunks = chunker.chunk_document(&doc);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.starts_with("[Q] "));
        assert_eq!(chunks[0].metadata["type"], serde_json::json!("qa_pair"));
    }
}
