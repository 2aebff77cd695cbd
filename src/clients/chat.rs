use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::warn;
use url::Url;

use crate::message::Message;

use super::{check_status, http_client, ClientError};

/// One increment of a streamed chat response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatDelta {
    pub content: String,
    /// True on the final frame of the stream.
    pub done: bool,
}

/// Receiving side of a streamed chat response.
///
/// Wraps a channel fed by a background reader task; dropping the stream
/// cancels the reader.
pub struct ChatStream {
    rx: mpsc::Receiver<Result<ChatDelta, ClientError>>,
}

impl ChatStream {
    #[must_use]
    pub fn new(rx: mpsc::Receiver<Result<ChatDelta, ClientError>>) -> Self {
        Self { rx }
    }

    /// Next delta, or `None` when the stream is exhausted.
    pub async fn next(&mut self) -> Option<Result<ChatDelta, ClientError>> {
        self.rx.recv().await
    }

    /// Drains the stream into a single string, failing on the first error.
    pub async fn collect_text(mut self) -> Result<String, ClientError> {
        let mut text = String::new();
        while let Some(delta) = self.next().await {
            let delta = delta?;
            text.push_str(&delta.content);
            if delta.done {
                break;
            }
        }
        Ok(text)
    }
}

/// Chat completion service.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Non-streaming completion; returns the full response text.
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<String, ClientError>;

    /// Streaming completion; deltas arrive in generation order, and the
    /// final delta has `done == true`.
    async fn stream(&self, system: &str, messages: &[Message]) -> Result<ChatStream, ClientError>;
}

#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(default)]
    message: Option<FrameMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct FrameMessage {
    #[serde(default)]
    content: String,
}

/// Chat client for an Ollama-compatible `/api/chat` endpoint.
///
/// Streaming responses are newline-delimited JSON frames; each frame carries
/// `message.content` and a `done` flag on the last frame.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    http: reqwest::Client,
    endpoint: Url,
    model: String,
}

impl HttpChatClient {
    pub fn new(base_url: &Url, model: impl Into<String>) -> Result<Self, ClientError> {
        let endpoint = base_url
            .join("api/chat")
            .map_err(|e| ClientError::Protocol(format!("bad chat url: {e}")))?;
        Ok(Self {
            http: http_client()?,
            endpoint,
            model: model.into(),
        })
    }

    fn payload(&self, system: &str, messages: &[Message], stream: bool) -> serde_json::Value {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            wire.push(Message::system(system));
        }
        wire.extend_from_slice(messages);
        json!({ "model": self.model, "messages": wire, "stream": stream })
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&self.payload(system, messages, false))
            .send()
            .await?;
        let response = check_status(response).await?;
        let frame: StreamFrame = response.json().await?;
        frame
            .message
            .map(|m| m.content)
            .ok_or_else(|| ClientError::Protocol("response missing message".into()))
    }

    async fn stream(&self, system: &str, messages: &[Message]) -> Result<ChatStream, ClientError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&self.payload(system, messages, true))
            .send()
            .await?;
        let response = check_status(response).await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut line_buffer = String::new();
            while let Some(piece) = bytes.next().await {
                let piece = match piece {
                    Ok(p) => p,
                    Err(e) => {
                        let _ = tx.send(Err(ClientError::Http(e))).await;
                        return;
                    }
                };
                line_buffer.push_str(&String::from_utf8_lossy(&piece));
                while let Some(newline) = line_buffer.find('\n') {
                    let line: String = line_buffer.drain(..=newline).collect();
                    if !forward_frame(line.trim(), &tx).await {
                        return;
                    }
                }
            }
            // Trailing frame without a newline.
            let _ = forward_frame(line_buffer.trim(), &tx).await;
        });
        Ok(ChatStream::new(rx))
    }
}

/// Parses one NDJSON line and forwards it. Returns false when the receiver
/// is gone or the stream is finished.
async fn forward_frame(
    line: &str,
    tx: &mpsc::Sender<Result<ChatDelta, ClientError>>,
) -> bool {
    if line.is_empty() {
        return true;
    }
    match serde_json::from_str::<StreamFrame>(line) {
        Ok(frame) => {
            let delta = ChatDelta {
                content: frame.message.map(|m| m.content).unwrap_or_default(),
                done: frame.done,
            };
            let done = delta.done;
            if tx.send(Ok(delta)).await.is_err() {
                return false;
            }
            !done
        }
        Err(e) => {
            warn!(error = %e, "unparseable stream frame");
            let _ = tx
                .send(Err(ClientError::Protocol(format!("bad stream frame: {e}"))))
                .await;
            false
        }
    }
}
