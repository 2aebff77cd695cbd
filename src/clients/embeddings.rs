use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{check_status, http_client, ClientError};

/// Produces dense embeddings for text.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ClientError>;
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Embedding client for an Ollama-compatible `/api/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    http: reqwest::Client,
    endpoint: Url,
    model: String,
}

impl HttpEmbeddingClient {
    pub fn new(base_url: &Url, model: impl Into<String>) -> Result<Self, ClientError> {
        let endpoint = base_url
            .join("api/embeddings")
            .map_err(|e| ClientError::Protocol(format!("bad embedding url: {e}")))?;
        Ok(Self {
            http: http_client()?,
            endpoint,
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ClientError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({ "model": self.model, "prompt": text }))
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: EmbeddingResponse = response.json().await?;
        if parsed.embedding.is_empty() {
            return Err(ClientError::Protocol("empty embedding returned".into()));
        }
        Ok(parsed.embedding)
    }
}
