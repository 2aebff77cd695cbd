//! Clients for the external services the engine depends on.
//!
//! Each service is abstracted behind an async trait so tests and alternate
//! deployments can substitute implementations. The `Http*` types are the
//! production implementations, sharing one [`reqwest::Client`] apiece.

mod chat;
mod embeddings;
mod vector_store;
mod vision;

pub use chat::{ChatClient, ChatDelta, ChatStream, HttpChatClient};
pub use embeddings::{EmbeddingClient, HttpEmbeddingClient};
pub use vector_store::{HttpVectorStore, ScoredPoint, VectorStore};
pub use vision::{HttpVisualContextClient, VisualContextClient};

use thiserror::Error;

/// Transport and protocol errors from a service client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP request itself failed (connection, timeout, TLS).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service returned status {status}: {body}")]
    Service { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Builds the shared HTTP client used by the production implementations.
pub(crate) fn http_client() -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(180))
        .build()
        .map_err(ClientError::Http)
}

/// Maps a non-success response into [`ClientError::Service`].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Service {
        status: status.as_u16(),
        body,
    })
}
