//! Shared fixtures for integration tests: scriptable service clients and
//! tracing setup.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use docent::clients::{
    ChatClient, ChatDelta, ChatStream, ClientError, EmbeddingClient, ScoredPoint, VectorStore,
    VisualContextClient,
};
use docent::message::Message;

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docent=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// One scripted reply for a `stream()` call.
pub enum StreamScript {
    /// Emit these deltas, then a done frame.
    Deltas(Vec<&'static str>),
    /// Emit these deltas, then fail.
    FailAfter(Vec<&'static str>, &'static str),
    /// Fail before any delta is produced.
    FailToStart(&'static str),
}

/// Chat client driven by scripted queues, recording every call it receives.
#[derive(Default)]
pub struct ScriptedChat {
    completions: Mutex<VecDeque<Result<String, String>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    pub completion_calls: Mutex<Vec<(String, Vec<Message>)>>,
    pub stream_calls: Mutex<Vec<(String, Vec<Message>)>>,
}

impl ScriptedChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_completion(&self, reply: Result<&str, &str>) {
        self.completions
            .lock()
            .push_back(reply.map(str::to_string).map_err(str::to_string));
    }

    pub fn push_stream(&self, script: StreamScript) {
        self.streams.lock().push_back(script);
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn complete(&self, system: &str, messages: &[Message]) -> Result<String, ClientError> {
        self.completion_calls
            .lock()
            .push((system.to_string(), messages.to_vec()));
        match self.completions.lock().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ClientError::Protocol(message)),
            None => Err(ClientError::Protocol("unscripted completion".into())),
        }
    }

    async fn stream(&self, system: &str, messages: &[Message]) -> Result<ChatStream, ClientError> {
        self.stream_calls
            .lock()
            .push((system.to_string(), messages.to_vec()));
        let script = self
            .streams
            .lock()
            .pop_front()
            .unwrap_or(StreamScript::FailToStart("unscripted stream"));
        let (deltas, failure) = match script {
            StreamScript::Deltas(deltas) => (deltas, None),
            StreamScript::FailAfter(deltas, message) => (deltas, Some(message)),
            StreamScript::FailToStart(message) => {
                return Err(ClientError::Protocol(message.to_string()))
            }
        };

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for delta in deltas {
                let frame = ChatDelta {
                    content: delta.to_string(),
                    done: false,
                };
                if tx.send(Ok(frame)).await.is_err() {
                    return;
                }
            }
            match failure {
                Some(message) => {
                    let _ = tx
                        .send(Err(ClientError::Protocol(message.to_string())))
                        .await;
                }
                None => {
                    let _ = tx
                        .send(Ok(ChatDelta {
                            content: String::new(),
                            done: true,
                        }))
                        .await;
                }
            }
        });
        Ok(ChatStream::new(rx))
    }
}

/// Deterministic embedding client; optionally fails every call.
#[derive(Default)]
pub struct FakeEmbeddings {
    pub fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeEmbeddings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

/// Cheap deterministic text embedding: a character histogram.
pub fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; 8];
    for c in text.chars() {
        let bucket = (c as u32 % 8) as usize;
        vector[bucket] += 1.0;
    }
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[async_trait]
impl EmbeddingClient for FakeEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ClientError> {
        self.calls.lock().push(text.to_string());
        if self.fail {
            return Err(ClientError::Protocol("embedding service down".into()));
        }
        Ok(embed_text(text))
    }
}

/// In-memory vector store with brute-force nearest-neighbor queries.
#[derive(Default)]
pub struct MemoryVectorStore {
    points: Mutex<Vec<(String, Vec<f32>, String, FxHashMap<String, serde_json::Value>)>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.lock().len()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(
        &self,
        id: &str,
        embedding: &[f32],
        content: &str,
        metadata: &FxHashMap<String, serde_json::Value>,
    ) -> Result<(), ClientError> {
        let mut points = self.points.lock();
        points.retain(|(existing, _, _, _)| existing != id);
        points.push((
            id.to_string(),
            embedding.to_vec(),
            content.to_string(),
            metadata.clone(),
        ));
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, ClientError> {
        let mut scored: Vec<ScoredPoint> = self
            .points
            .lock()
            .iter()
            .map(|(_, stored, content, metadata)| {
                let distance = stored
                    .iter()
                    .zip(embedding)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>()
                    .sqrt();
                ScoredPoint {
                    content: content.clone(),
                    metadata: metadata.clone(),
                    distance,
                }
            })
            .collect();
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Visual-context client with scriptable availability and latency.
pub enum FakeVision {
    Unavailable,
    Available {
        context: &'static str,
        delay: Duration,
    },
    Failing,
}

#[async_trait]
impl VisualContextClient for FakeVision {
    async fn fetch(&self, _session_id: &str) -> Result<Option<String>, ClientError> {
        match self {
            FakeVision::Unavailable => Ok(None),
            FakeVision::Available { context, delay } => {
                tokio::time::sleep(*delay).await;
                Ok(Some(context.to_string()))
            }
            FakeVision::Failing => Err(ClientError::Protocol("vision service down".into())),
        }
    }
}

/// The mock clients an orchestrator test usually needs, in one place.
pub struct TestClients {
    pub chat: Arc<ScriptedChat>,
    pub embeddings: Arc<FakeEmbeddings>,
    pub vector_store: Arc<MemoryVectorStore>,
}

impl TestClients {
    pub fn new() -> Self {
        Self {
            chat: Arc::new(ScriptedChat::new()),
            embeddings: Arc::new(FakeEmbeddings::new()),
            vector_store: Arc::new(MemoryVectorStore::new()),
        }
    }
}
