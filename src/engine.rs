//! Top-level assembly: wires clients, corpus building, and orchestration.

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::{
    ChatClient, EmbeddingClient, HttpChatClient, HttpEmbeddingClient, HttpVectorStore,
    HttpVisualContextClient, VectorStore, VisualContextClient,
};
use crate::config::EngineConfig;
use crate::corpus::{SentenceChunker, SourceDocument};
use crate::error::EngineError;
use crate::index::{ContextCompactor, HybridRetriever, TfIdfIndex};
use crate::message::Message;
use crate::orchestrator::ResponseOrchestrator;
use crate::sessions::{ConversationStore, InMemorySessionStore};

/// What [`Engine::warmup`] observed per upstream service.
#[derive(Debug, Clone, Default)]
pub struct WarmupReport {
    pub embedding_ok: bool,
    pub chat_ok: bool,
}

/// Holds the service clients and configuration behind the whole engine.
///
/// Build one with [`Engine::from_env`] (HTTP clients against configured
/// endpoints) or [`Engine::with_clients`] (injected implementations, as the
/// tests do), then ingest a corpus and hand the resulting retriever to an
/// orchestrator.
pub struct Engine {
    config: EngineConfig,
    embeddings: Arc<dyn EmbeddingClient>,
    chat: Arc<dyn ChatClient>,
    vector_store: Arc<dyn VectorStore>,
    vision: Arc<dyn VisualContextClient>,
    sessions: Arc<dyn ConversationStore>,
}

impl Engine {
    /// Engine with HTTP clients resolved from the environment.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::new(EngineConfig::from_env()?)
    }

    /// Engine with HTTP clients against the endpoints in `config`.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let endpoints = &config.endpoints;
        let embeddings =
            HttpEmbeddingClient::new(&endpoints.embedding_url, endpoints.embed_model.as_str())
                .map_err(EngineError::Embedding)?;
        let chat = HttpChatClient::new(&endpoints.chat_url, endpoints.chat_model.as_str())
            .map_err(EngineError::Chat)?;
        let vector_store =
            HttpVectorStore::new(&endpoints.vector_store_url).map_err(EngineError::VectorStore)?;
        let vision =
            HttpVisualContextClient::new(&endpoints.vision_url).map_err(EngineError::Vision)?;
        Ok(Self::with_clients(
            config,
            Arc::new(embeddings),
            Arc::new(chat),
            Arc::new(vector_store),
            Arc::new(vision),
            Arc::new(InMemorySessionStore::new()),
        ))
    }

    /// Engine with caller-supplied client implementations.
    #[must_use]
    pub fn with_clients(
        config: EngineConfig,
        embeddings: Arc<dyn EmbeddingClient>,
        chat: Arc<dyn ChatClient>,
        vector_store: Arc<dyn VectorStore>,
        vision: Arc<dyn VisualContextClient>,
        sessions: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            config,
            embeddings,
            chat,
            vector_store,
            vision,
            sessions,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<dyn ConversationStore> {
        &self.sessions
    }

    /// Chunks the documents, builds the sparse index, and upserts chunk
    /// embeddings into the vector store.
    ///
    /// A chunk whose embedding fails is skipped with a warning; it still
    /// participates in sparse retrieval. An empty corpus is an error.
    pub async fn build_corpus(
        &self,
        documents: &[SourceDocument],
    ) -> Result<HybridRetriever, EngineError> {
        let mut chunker = SentenceChunker::new(
            self.config.chunking.chunk_size,
            self.config.chunking.chunk_overlap,
        );
        let mut chunks = Vec::new();
        for document in documents {
            chunks.extend(chunker.chunk_document(document));
        }
        if chunks.is_empty() {
            return Err(EngineError::Corpus("no chunks produced".into()));
        }

        let sparse = TfIdfIndex::build(&chunks, &self.config.sparse);

        let mut upserted = 0usize;
        for chunk in &chunks {
            let embedding = match self.embeddings.embed(&chunk.content).await {
                Ok(e) => e,
                Err(e) => {
                    warn!(chunk = %chunk.chunk_id, error = %e, "embedding failed, skipping chunk");
                    continue;
                }
            };
            if let Err(e) = self
                .vector_store
                .upsert(&chunk.chunk_id, &embedding, &chunk.content, &chunk.metadata)
                .await
            {
                warn!(chunk = %chunk.chunk_id, error = %e, "upsert failed, skipping chunk");
                continue;
            }
            upserted += 1;
        }
        info!(chunks = chunks.len(), upserted, "corpus built");

        Ok(HybridRetriever::new(
            Arc::clone(&self.embeddings),
            Arc::clone(&self.vector_store),
            sparse,
            chunks,
            self.config.hybrid.clone(),
        ))
    }

    /// Issues a tiny request to each model-backed service so first real
    /// queries do not pay cold-start cost. Failures are reported, not fatal.
    pub async fn warmup(&self) -> WarmupReport {
        let mut report = WarmupReport::default();

        match self.embeddings.embed("warmup").await {
            Ok(_) => report.embedding_ok = true,
            Err(e) => warn!(error = %e, "embedding warmup failed"),
        }

        let messages = [Message::user("Reply with the single word: ready")];
        match self.chat.complete("", &messages).await {
            Ok(_) => report.chat_ok = true,
            Err(e) => warn!(error = %e, "chat warmup failed"),
        }

        info!(
            embedding_ok = report.embedding_ok,
            chat_ok = report.chat_ok,
            "warmup finished"
        );
        report
    }

    /// Orchestrator over an already-built retriever.
    #[must_use]
    pub fn orchestrator(&self, retriever: Arc<HybridRetriever>) -> ResponseOrchestrator {
        ResponseOrchestrator::new(
            Arc::clone(&self.chat),
            Arc::clone(&self.vision),
            retriever,
            Arc::clone(&self.sessions),
            ContextCompactor::new(self.config.compaction.clone()),
            self.config.orchestrator.clone(),
        )
    }
}
