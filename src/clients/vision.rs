use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{check_status, http_client, ClientError};

/// Fetches the visual scene description associated with a session, if the
/// camera pipeline has one ready.
#[async_trait]
pub trait VisualContextClient: Send + Sync {
    /// `Ok(None)` means the service is reachable but has no context for
    /// this session right now.
    async fn fetch(&self, session_id: &str) -> Result<Option<String>, ClientError>;
}

#[derive(Debug, Deserialize)]
struct VisualContextResponse {
    #[serde(default)]
    available: bool,
    #[serde(default)]
    visual_context: Option<String>,
}

/// Client for the `GET /visual-context/{session_id}` endpoint.
#[derive(Debug, Clone)]
pub struct HttpVisualContextClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpVisualContextClient {
    pub fn new(base_url: &Url) -> Result<Self, ClientError> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.clone(),
        })
    }
}

#[async_trait]
impl VisualContextClient for HttpVisualContextClient {
    async fn fetch(&self, session_id: &str) -> Result<Option<String>, ClientError> {
        let endpoint = self
            .base_url
            .join(&format!("visual-context/{session_id}"))
            .map_err(|e| ClientError::Protocol(format!("bad vision url: {e}")))?;
        let response = self.http.get(endpoint).send().await?;
        let response = check_status(response).await?;
        let parsed: VisualContextResponse = response.json().await?;
        if parsed.available {
            Ok(parsed.visual_context.filter(|c| !c.trim().is_empty()))
        } else {
            Ok(None)
        }
    }
}
