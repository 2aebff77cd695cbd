//! Error types shared across the engine.
//!
//! [`EngineError`] is the top-level error surfaced from public operations;
//! client-transport failures live on [`crate::clients::ClientError`] and are
//! wrapped into the matching `EngineError` variant at the seam where the
//! failing subsystem is known.

use thiserror::Error;

use crate::clients::ClientError;

/// Top-level error for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A request was rejected before any work was scheduled.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The embedding service failed.
    #[error("embedding service: {0}")]
    Embedding(#[source] ClientError),

    /// The vector store failed.
    #[error("vector store: {0}")]
    VectorStore(#[source] ClientError),

    /// The chat service failed.
    #[error("chat service: {0}")]
    Chat(#[source] ClientError),

    /// The visual-context service failed.
    #[error("vision service: {0}")]
    Vision(#[source] ClientError),

    /// Configuration could not be resolved.
    #[error("configuration: {0}")]
    Config(String),

    /// The corpus is empty or an index could not be built from it.
    #[error("corpus: {0}")]
    Corpus(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
