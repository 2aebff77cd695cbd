//! Conversation state keyed by session id.
//!
//! The orchestrator only sees the [`ConversationStore`] trait; the default
//! [`InMemorySessionStore`] holds history in a process-local map. A durable
//! backend can be swapped in without touching the orchestrator.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::message::Message;

/// Storage for per-session conversation history.
///
/// `exchange_guard` returns a per-session async mutex; the orchestrator
/// holds it for the duration of an exchange so concurrent turns on the same
/// session serialize instead of interleaving their history writes.
pub trait ConversationStore: Send + Sync {
    /// Current history for the session, oldest first. Unknown sessions
    /// return an empty history.
    fn history(&self, session_id: &str) -> Vec<Message>;

    /// Appends one completed exchange: the user turn then the assistant turn.
    fn append_exchange(&self, session_id: &str, user: Message, assistant: Message);

    /// Clears the session's history, returning how many messages were removed.
    fn clear(&self, session_id: &str) -> usize;

    /// Per-session lock serializing whole exchanges.
    fn exchange_guard(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>>;
}

#[derive(Default)]
struct SessionEntry {
    history: Vec<Message>,
    guard: Arc<tokio::sync::Mutex<()>>,
}

/// Process-local session store backed by a hash map.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<FxHashMap<String, SessionEntry>>,
}

impl InMemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one session's history as JSON, for diagnostics.
    pub fn snapshot_json(&self, session_id: &str) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.history(session_id))
    }
}

impl ConversationStore for InMemorySessionStore {
    fn history(&self, session_id: &str) -> Vec<Message> {
        self.sessions
            .read()
            .get(session_id)
            .map(|entry| entry.history.clone())
            .unwrap_or_default()
    }

    fn append_exchange(&self, session_id: &str, user: Message, assistant: Message) {
        let mut sessions = self.sessions.write();
        let entry = sessions.entry(session_id.to_string()).or_default();
        entry.history.push(user);
        entry.history.push(assistant);
        debug!(
            session = %session_id,
            history_len = entry.history.len(),
            "appended exchange"
        );
    }

    fn clear(&self, session_id: &str) -> usize {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(session_id) {
            Some(entry) => {
                let cleared = entry.history.len();
                entry.history.clear();
                debug!(session = %session_id, cleared, "cleared session");
                cleared
            }
            None => 0,
        }
    }

    fn exchange_guard(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut sessions = self.sessions.write();
        let entry = sessions.entry(session_id.to_string()).or_default();
        Arc::clone(&entry.guard)
    }
}
