mod common;

use std::sync::Arc;

use common::{FakeEmbeddings, FakeVision, MemoryVectorStore, TestClients};

use docent::clients::VectorStore;
use docent::config::{EngineConfig, HybridConfig, SparseConfig};
use docent::corpus::{SentenceChunker, SourceDocument};
use docent::engine::Engine;
use docent::error::EngineError;
use docent::index::{HybridRetriever, TfIdfIndex};
use docent::sessions::InMemorySessionStore;

fn engine_with(embeddings: Arc<FakeEmbeddings>, clients: &TestClients) -> Engine {
    common::init_tracing();
    Engine::with_clients(
        EngineConfig::default(),
        embeddings,
        clients.chat.clone(),
        clients.vector_store.clone(),
        Arc::new(FakeVision::Unavailable),
        Arc::new(InMemorySessionStore::new()),
    )
}

#[tokio::test]
async fn build_corpus_upserts_every_chunk() {
    let clients = TestClients::new();
    let engine = engine_with(clients.embeddings.clone(), &clients);
    let docs = vec![
        SourceDocument::text("a.txt", "ITRI is a research institute. Founded in 1973."),
        SourceDocument::text("b.txt", "The museum exhibits semiconductor history."),
    ];
    let retriever = engine.build_corpus(&docs).await.expect("corpus builds");
    assert_eq!(clients.vector_store.len(), retriever.corpus_len());
    assert!(retriever.corpus_len() >= 2);
}

#[tokio::test]
async fn empty_corpus_is_rejected() {
    let clients = TestClients::new();
    let engine = engine_with(clients.embeddings.clone(), &clients);
    let result = engine.build_corpus(&[]).await;
    assert!(matches!(result, Err(EngineError::Corpus(_))));
}

#[tokio::test]
async fn embedding_outage_degrades_retrieval_to_sparse_only() {
    let clients = TestClients::new();
    let engine = engine_with(Arc::new(FakeEmbeddings::failing()), &clients);
    let docs = vec![SourceDocument::text(
        "a.txt",
        "ITRI is a research institute. The museum covers chip history.",
    )];
    // Ingestion survives the outage; every chunk is skipped for upsert.
    let retriever = engine.build_corpus(&docs).await.expect("corpus builds");
    assert_eq!(clients.vector_store.len(), 0);

    let results = retriever.search("research institute").await;
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.dense_score.is_none()));
    assert!(results[0].content.contains("research institute"));
}

#[tokio::test]
async fn warmup_reports_failures_without_propagating_them() {
    let clients = TestClients::new();
    let engine = engine_with(clients.embeddings.clone(), &clients);
    // The chat mock has nothing scripted, so its warmup call fails.
    let report = engine.warmup().await;
    assert!(report.embedding_ok);
    assert!(!report.chat_ok);
}

#[tokio::test]
async fn combined_score_is_monotone_when_both_legs_agree() {
    common::init_tracing();
    let mut chunker = SentenceChunker::new(300, 50);
    let chunks = [
        chunker.chunk_text("ITRI semiconductor research budget and funding.", "a"),
        chunker.chunk_text("The museum cafeteria serves lunch daily.", "b"),
    ]
    .concat();

    let store = Arc::new(MemoryVectorStore::new());
    for chunk in &chunks {
        store
            .upsert(
                &chunk.chunk_id,
                &common::embed_text(&chunk.content),
                &chunk.content,
                &chunk.metadata,
            )
            .await
            .expect("upsert");
    }

    let sparse = TfIdfIndex::build(&chunks, &SparseConfig::default());
    let retriever = HybridRetriever::new(
        Arc::new(FakeEmbeddings::new()),
        store,
        sparse,
        chunks,
        HybridConfig::default(),
    );

    // The query is most of document A, so A beats B on both legs.
    let results = retriever
        .search("ITRI semiconductor research budget and funding")
        .await;
    let a = results
        .iter()
        .find(|r| r.content.contains("semiconductor"))
        .expect("doc a retrieved");
    if let Some(b) = results.iter().find(|r| r.content.contains("cafeteria")) {
        assert!(a.dense_score >= b.dense_score);
        assert!(a.sparse_score >= b.sparse_score);
        assert!(a.combined_score >= b.combined_score);
    }
    assert_eq!(results[0].content, a.content);
}
