//! Turn orchestration: context resolution, answer generation, the optional
//! tone-rewrite stage, and history commits.
//!
//! One exchange runs as a spawned producer task feeding a [`ReplyStream`].
//! The producer serializes against other exchanges for the same session,
//! fans out a best-effort visual-context fetch alongside answer assembly,
//! and commits history exactly once, just before `Done`.

mod outcome;
mod prompts;
mod stream;
mod tone;

pub use outcome::TaskOutcome;
pub use prompts::Tone;
pub use stream::{ReplyErrorKind, ReplyItem, ReplyStream};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clients::{ChatClient, VisualContextClient};
use crate::config::OrchestratorConfig;
use crate::error::EngineError;
use crate::index::{ContextCompactor, HybridRetriever};
use crate::message::Message;
use crate::sessions::ConversationStore;

/// One turn's worth of caller input.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_text: String,
    pub session_id: String,
    /// When false, the turn is answered as if the session were fresh.
    pub include_history: bool,
    /// Caller-supplied visual context; skips the external fetch entirely.
    pub visual_hint: Option<String>,
    pub tone_enabled: bool,
}

/// Drives one exchange end to end.
#[derive(Clone)]
pub struct ResponseOrchestrator {
    chat: Arc<dyn ChatClient>,
    vision: Arc<dyn VisualContextClient>,
    retriever: Arc<HybridRetriever>,
    store: Arc<dyn ConversationStore>,
    compactor: ContextCompactor,
    config: OrchestratorConfig,
}

impl ResponseOrchestrator {
    #[must_use]
    pub fn new(
        chat: Arc<dyn ChatClient>,
        vision: Arc<dyn VisualContextClient>,
        retriever: Arc<HybridRetriever>,
        store: Arc<dyn ConversationStore>,
        compactor: ContextCompactor,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            chat,
            vision,
            retriever,
            store,
            compactor,
            config,
        }
    }

    /// Starts one exchange, returning its reply stream.
    ///
    /// Validation happens synchronously; everything else runs on a spawned
    /// task, so a slow upstream never delays the caller's first poll.
    pub fn handle_turn(&self, request: TurnRequest) -> Result<ReplyStream, EngineError> {
        if request.user_text.trim().is_empty() {
            return Err(EngineError::InvalidRequest("user_text is empty".into()));
        }
        if request.session_id.trim().is_empty() {
            return Err(EngineError::InvalidRequest("session_id is empty".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.run_exchange(request, tx).await;
        });
        Ok(ReplyStream::new(rx))
    }

    async fn run_exchange(&self, request: TurnRequest, tx: mpsc::UnboundedSender<ReplyItem>) {
        let exchange_id = Uuid::new_v4();
        info!(
            session = %request.session_id,
            exchange = %exchange_id,
            tone_enabled = request.tone_enabled,
            "exchange started"
        );

        // Exchanges for one session run strictly one at a time.
        let guard = self.store.exchange_guard(&request.session_id);
        let _serialized = guard.lock().await;

        let history = if request.include_history {
            self.store.history(&request.session_id)
        } else {
            Vec::new()
        };

        let visual_outcome = self.resolve_visual_context(&request).await;
        if matches!(visual_outcome, TaskOutcome::TimedOut) {
            debug!(exchange = %exchange_id, "visual context timed out, proceeding without it");
        }
        let visual_context = visual_outcome.ok_value().flatten();

        // With prior turns, a follow-up like "and its budget?" needs its
        // referents resolved before it is useful as a search query.
        let rewritten_query = if history.is_empty() {
            None
        } else {
            self.rewrite_query(&request.user_text, &history).await
        };
        let retrieval_query = rewritten_query.as_deref().unwrap_or(&request.user_text);

        let results = self.retriever.search(retrieval_query).await;
        let passages: Vec<String> = results
            .into_iter()
            .map(|r| r.content)
            .filter(|c| !c.starts_with("[Q") && !c.starts_with("[A"))
            .collect();
        let rag_reference = self
            .compactor
            .compact(&passages, &request.user_text)
            .unwrap_or_default();

        let payload = prompts::build_user_payload(
            &request.user_text,
            &history,
            &rag_reference,
            visual_context.as_deref(),
            rewritten_query.as_deref(),
        );

        let answer = match self.stream_answer(&payload, &tx).await {
            Ok(answer) => answer,
            Err(message) => {
                warn!(exchange = %exchange_id, error = %message, "answer generation failed");
                let _ = tx.send(ReplyItem::Error {
                    kind: ReplyErrorKind::Generation,
                    message,
                });
                let _ = tx.send(ReplyItem::Done);
                return;
            }
        };

        if request.tone_enabled {
            self.run_tone_stage(
                &answer,
                visual_context.as_deref(),
                history.is_empty(),
                &tx,
            )
            .await;
        }

        // No commit for a reply nobody is consuming.
        if tx.is_closed() {
            info!(exchange = %exchange_id, "caller disconnected, skipping history commit");
            return;
        }
        self.store.append_exchange(
            &request.session_id,
            Message::user(&request.user_text),
            Message::assistant(&answer),
        );
        let _ = tx.send(ReplyItem::Done);
        info!(exchange = %exchange_id, answer_chars = answer.chars().count(), "exchange done");
    }

    /// Resolves visual context: caller hint wins, otherwise a delayed fetch
    /// bounded by its own timeout and a join timeout.
    async fn resolve_visual_context(&self, request: &TurnRequest) -> TaskOutcome<Option<String>> {
        if let Some(hint) = &request.visual_hint {
            return TaskOutcome::Ok(Some(hint.clone()));
        }

        let vision = Arc::clone(&self.vision);
        let session_id = request.session_id.clone();
        let fetch_delay = self.config.visual_fetch_delay;
        let fetch_timeout = self.config.visual_timeout;
        let handle = tokio::spawn(async move {
            sleep(fetch_delay).await;
            match timeout(fetch_timeout, vision.fetch(&session_id)).await {
                Ok(Ok(context)) => TaskOutcome::Ok(context),
                Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
                Err(_) => TaskOutcome::TimedOut,
            }
        });

        match timeout(self.config.visual_join_timeout, handle).await {
            Ok(Ok(outcome)) => {
                if let TaskOutcome::Failed(reason) = &outcome {
                    warn!(error = %reason, "visual context fetch failed");
                }
                outcome
            }
            Ok(Err(join_error)) => TaskOutcome::Failed(join_error.to_string()),
            Err(_) => TaskOutcome::TimedOut,
        }
    }

    /// Query rewrite is best effort; on failure the raw text is searched.
    async fn rewrite_query(&self, user_text: &str, history: &[Message]) -> Option<String> {
        let mut messages = history.to_vec();
        messages.push(Message::user(user_text));
        match self
            .chat
            .complete(&prompts::rewrite_query_system_prompt(), &messages)
            .await
        {
            Ok(rewritten) => {
                let rewritten = rewritten.trim().to_string();
                if rewritten.is_empty() {
                    None
                } else {
                    debug!(query = %rewritten, "rewrote search query");
                    Some(rewritten)
                }
            }
            Err(e) => {
                warn!(error = %e, "query rewrite failed, searching raw text");
                None
            }
        }
    }

    /// Streams the primary generation, re-emitting each delta as it lands
    /// and accumulating the full answer. The whole call is bounded by
    /// `answer_timeout`.
    async fn stream_answer(
        &self,
        payload: &str,
        tx: &mpsc::UnboundedSender<ReplyItem>,
    ) -> Result<String, String> {
        let messages = [Message::user(payload)];
        let mut chat_stream = self
            .chat
            .stream(&prompts::answer_system_prompt(), &messages)
            .await
            .map_err(|e| e.to_string())?;

        let deadline = Instant::now() + self.config.answer_timeout;
        let mut answer = String::new();
        loop {
            let next = tokio::time::timeout_at(deadline, chat_stream.next()).await;
            match next {
                Err(_) => return Err("answer generation timed out".into()),
                Ok(None) => break,
                Ok(Some(Err(e))) => return Err(e.to_string()),
                Ok(Some(Ok(delta))) => {
                    if !delta.content.is_empty() {
                        answer.push_str(&delta.content);
                        let _ = tx.send(ReplyItem::Delta(delta.content));
                    }
                    if delta.done {
                        break;
                    }
                }
            }
        }
        Ok(answer)
    }

    /// Tone stage: select a tone, then stream the rewrite. Failures here
    /// never discard the already-complete answer; the exchange still
    /// commits it.
    async fn run_tone_stage(
        &self,
        answer: &str,
        visual_context: Option<&str>,
        first_turn: bool,
        tx: &mpsc::UnboundedSender<ReplyItem>,
    ) {
        let selected = tone::select_tone(&self.chat, visual_context).await;
        debug!(tone = selected.as_str(), "tone selected");

        let mut rewrite =
            match tone::rewrite_stream(&self.chat, answer, selected, visual_context, first_turn)
                .await
            {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "tone rewrite failed to start");
                    let _ = tx.send(ReplyItem::Error {
                        kind: ReplyErrorKind::ToneRewrite,
                        message: e.to_string(),
                    });
                    return;
                }
            };

        loop {
            match rewrite.next().await {
                None => break,
                Some(Ok(delta)) => {
                    if !delta.content.is_empty() {
                        let _ = tx.send(ReplyItem::Delta(delta.content));
                    }
                    if delta.done {
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "tone rewrite stream failed");
                    let _ = tx.send(ReplyItem::Error {
                        kind: ReplyErrorKind::ToneRewrite,
                        message: e.to_string(),
                    });
                    return;
                }
            }
        }
    }
}
