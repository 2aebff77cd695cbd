//! Corpus ingestion: source documents and sentence-aware chunking.
//!
//! A corpus is built from [`SourceDocument`]s. The [`SentenceChunker`]
//! splits each document into overlapping [`DocumentChunk`]s sized for
//! embedding and sparse indexing; question/answer transcripts are ingested
//! whole as `qa_pair` chunks so each exchange stays intact.

mod chunk;
mod chunker;

pub use chunk::{language_of, DocumentChunk};
pub use chunker::{SentenceChunker, SourceDocument, SourceKind};
