//! # Docent: Retrieval-Grounded Conversational Answer Engine
//!
//! Docent answers natural-language questions about a document corpus by
//! combining hybrid dense+sparse retrieval with a concurrent, streaming
//! response orchestrator.
//!
//! ## Core Concepts
//!
//! - **Chunks**: Bounded, sentence-respecting fragments of source text, the
//!   unit of retrieval ([`corpus`])
//! - **Hybrid search**: Dense nearest-neighbor results fused with lexical
//!   TF-IDF matches via weighted score blending ([`index`])
//! - **Orchestration**: Per-turn fan-out of visual-context lookup and answer
//!   generation, joined under timeouts and streamed incrementally to the
//!   caller ([`orchestrator`])
//! - **Sessions**: Per-session conversation history, appended exactly once
//!   per completed exchange ([`sessions`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use docent::corpus::SourceDocument;
//! use docent::engine::Engine;
//! use docent::orchestrator::TurnRequest;
//!
//! # async fn example() -> Result<(), docent::error::EngineError> {
//! let engine = Engine::from_env()?;
//!
//! let docs = vec![SourceDocument::text(
//!     "overview.txt",
//!     "ITRI is a research institute. It was founded in 1973.",
//! )];
//! let retriever = Arc::new(engine.build_corpus(&docs).await?);
//! let orchestrator = engine.orchestrator(retriever);
//!
//! let mut reply = orchestrator.handle_turn(TurnRequest {
//!     user_text: "What is ITRI?".into(),
//!     session_id: "demo".into(),
//!     include_history: true,
//!     visual_hint: None,
//!     tone_enabled: false,
//! })?;
//!
//! while let Some(item) = reply.next_item().await {
//!     println!("{item:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`corpus`] - Document chunking and corpus ingestion
//! - [`index`] - Sparse TF-IDF index, hybrid retriever, context compaction
//! - [`clients`] - Narrow contracts for the embedding, chat, vector-store,
//!   and visual-context services
//! - [`sessions`] - Conversation state store keyed by session id
//! - [`orchestrator`] - Streaming response orchestration and tone rewriting
//! - [`engine`] - Wiring facade: corpus builds, warmup, orchestrator setup

pub mod clients;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod index;
pub mod message;
pub mod orchestrator;
pub mod sessions;
