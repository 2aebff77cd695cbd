use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use super::{check_status, http_client, ClientError};

/// A stored point returned from a nearest-neighbor query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub content: String,
    #[serde(default)]
    pub metadata: FxHashMap<String, serde_json::Value>,
    /// Raw distance from the query embedding; lower is closer.
    pub distance: f32,
}

/// External dense vector store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(
        &self,
        id: &str,
        embedding: &[f32],
        content: &str,
        metadata: &FxHashMap<String, serde_json::Value>,
    ) -> Result<(), ClientError>;

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, ClientError>;
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<ScoredPoint>,
}

/// Vector store client speaking a plain JSON `upsert`/`query` protocol.
#[derive(Debug, Clone)]
pub struct HttpVectorStore {
    http: reqwest::Client,
    upsert_endpoint: Url,
    query_endpoint: Url,
}

impl HttpVectorStore {
    pub fn new(base_url: &Url) -> Result<Self, ClientError> {
        let join = |path: &str| {
            base_url
                .join(path)
                .map_err(|e| ClientError::Protocol(format!("bad vector store url: {e}")))
        };
        Ok(Self {
            http: http_client()?,
            upsert_endpoint: join("upsert")?,
            query_endpoint: join("query")?,
        })
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn upsert(
        &self,
        id: &str,
        embedding: &[f32],
        content: &str,
        metadata: &FxHashMap<String, serde_json::Value>,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.upsert_endpoint.clone())
            .json(&json!({
                "id": id,
                "embedding": embedding,
                "content": content,
                "metadata": metadata,
            }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, ClientError> {
        let response = self
            .http
            .post(self.query_endpoint.clone())
            .json(&json!({ "embedding": embedding, "top_k": top_k }))
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: QueryResponse = response.json().await?;
        Ok(parsed.results)
    }
}
