mod common;

use std::sync::Arc;

use common::{FakeVision, StreamScript, TestClients};

use docent::config::EngineConfig;
use docent::corpus::SourceDocument;
use docent::engine::Engine;
use docent::message::Message;
use docent::orchestrator::{ResponseOrchestrator, TurnRequest};
use docent::sessions::{ConversationStore, InMemorySessionStore};

async fn orchestrator_with(
    clients: &TestClients,
    sessions: Arc<InMemorySessionStore>,
) -> ResponseOrchestrator {
    common::init_tracing();
    let engine = Engine::with_clients(
        EngineConfig::default(),
        clients.embeddings.clone(),
        clients.chat.clone(),
        clients.vector_store.clone(),
        Arc::new(FakeVision::Unavailable),
        sessions,
    );
    let retriever = Arc::new(
        engine
            .build_corpus(&[SourceDocument::text(
                "museum.txt",
                "ITRI is a research institute. It was founded in 1973.",
            )])
            .await
            .expect("corpus builds"),
    );
    engine.orchestrator(retriever)
}

fn request(session_id: &str, user_text: &str) -> TurnRequest {
    TurnRequest {
        user_text: user_text.to_string(),
        session_id: session_id.to_string(),
        include_history: true,
        visual_hint: None,
        tone_enabled: false,
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_turns_on_one_session_never_interleave_history() {
    let clients = TestClients::new();
    let sessions = Arc::new(InMemorySessionStore::new());
    let orchestrator = orchestrator_with(&clients, sessions.clone()).await;

    clients
        .chat
        .push_stream(StreamScript::Deltas(vec!["Answer."]));
    clients
        .chat
        .push_stream(StreamScript::Deltas(vec!["Answer."]));

    let first = orchestrator
        .handle_turn(request("s1", "What is ITRI?"))
        .expect("valid request");
    let second = orchestrator
        .handle_turn(request("s1", "Where is it?"))
        .expect("valid request");
    let (one, two) = tokio::join!(first.collect(), second.collect());
    assert!(one.1.is_none());
    assert!(two.1.is_none());

    let history = sessions.history("s1");
    assert_eq!(history.len(), 4);
    // Each exchange's user/assistant pair is adjacent, never interleaved.
    for pair in history.chunks(2) {
        assert!(pair[0].has_role(Message::USER));
        assert_eq!(pair[1], Message::assistant("Answer."));
    }
    let questions: Vec<&str> = history
        .iter()
        .filter(|m| m.has_role(Message::USER))
        .map(|m| m.content.as_str())
        .collect();
    assert!(questions.contains(&"What is ITRI?"));
    assert!(questions.contains(&"Where is it?"));
}

#[tokio::test(start_paused = true)]
async fn different_sessions_are_independent() {
    let clients = TestClients::new();
    let sessions = Arc::new(InMemorySessionStore::new());
    let orchestrator = orchestrator_with(&clients, sessions.clone()).await;

    clients
        .chat
        .push_stream(StreamScript::Deltas(vec!["Answer one."]));
    clients
        .chat
        .push_stream(StreamScript::Deltas(vec!["Answer two."]));

    let a = orchestrator
        .handle_turn(request("alpha", "What is ITRI?"))
        .expect("valid request");
    let b = orchestrator
        .handle_turn(request("beta", "What is ITRI?"))
        .expect("valid request");
    let _ = tokio::join!(a.collect(), b.collect());

    assert_eq!(sessions.history("alpha").len(), 2);
    assert_eq!(sessions.history("beta").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn include_history_false_answers_as_a_fresh_session() {
    let clients = TestClients::new();
    let sessions = Arc::new(InMemorySessionStore::new());
    let orchestrator = orchestrator_with(&clients, sessions.clone()).await;

    sessions.append_exchange(
        "s1",
        Message::user("What is ITRI?"),
        Message::assistant("A research institute."),
    );
    clients
        .chat
        .push_stream(StreamScript::Deltas(vec!["Fresh answer."]));

    let mut req = request("s1", "and its budget?");
    req.include_history = false;
    let reply = orchestrator.handle_turn(req).expect("valid request");
    let (text, error) = reply.collect().await;

    assert_eq!(text, "Fresh answer.");
    assert!(error.is_none());
    // No history means no query-rewrite call was attempted.
    assert!(clients.chat.completion_calls.lock().is_empty());
    // The exchange still appends to the stored history.
    assert_eq!(sessions.history("s1").len(), 4);
}

#[tokio::test(start_paused = true)]
async fn clearing_a_session_resets_its_context() {
    let clients = TestClients::new();
    let sessions = Arc::new(InMemorySessionStore::new());
    let orchestrator = orchestrator_with(&clients, sessions.clone()).await;

    clients
        .chat
        .push_stream(StreamScript::Deltas(vec!["First answer."]));
    let reply = orchestrator
        .handle_turn(request("s1", "What is ITRI?"))
        .expect("valid request");
    let _ = reply.collect().await;

    assert_eq!(sessions.clear("s1"), 2);
    assert!(sessions.history("s1").is_empty());

    // The next turn is treated as a first turn: no rewrite call.
    clients
        .chat
        .push_stream(StreamScript::Deltas(vec!["Second answer."]));
    let reply = orchestrator
        .handle_turn(request("s1", "Where is it?"))
        .expect("valid request");
    let (text, _) = reply.collect().await;
    assert_eq!(text, "Second answer.");
    assert!(clients.chat.completion_calls.lock().is_empty());
}
