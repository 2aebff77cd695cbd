use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::clients::{EmbeddingClient, VectorStore};
use crate::config::HybridConfig;
use crate::corpus::DocumentChunk;

use super::TfIdfIndex;

/// A retrieved passage with its per-source and blended scores.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub content: String,
    pub metadata: FxHashMap<String, serde_json::Value>,
    pub dense_score: Option<f32>,
    pub sparse_score: Option<f32>,
    pub combined_score: f32,
}

/// Blends dense vector search with sparse TF-IDF search.
///
/// Dense results come from the external vector store; a failure there
/// degrades the query to sparse-only rather than failing it. Merging is
/// keyed on exact content: a passage found by both sources gets a weighted
/// blend, a passage found by one keeps that source's score.
pub struct HybridRetriever {
    embeddings: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    sparse: TfIdfIndex,
    chunks: Vec<DocumentChunk>,
    config: HybridConfig,
}

impl HybridRetriever {
    #[must_use]
    pub fn new(
        embeddings: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        sparse: TfIdfIndex,
        chunks: Vec<DocumentChunk>,
        config: HybridConfig,
    ) -> Self {
        Self {
            embeddings,
            store,
            sparse,
            chunks,
            config,
        }
    }

    /// Number of chunks in the corpus behind this retriever.
    #[must_use]
    pub fn corpus_len(&self) -> usize {
        self.chunks.len()
    }

    /// Runs both searches and returns the merged top results, highest
    /// `combined_score` first.
    pub async fn search(&self, query: &str) -> Vec<RetrievalResult> {
        let top_k = self.config.top_k;
        let dense = self.dense_search(query, top_k).await;
        let sparse = self.sparse.query(query, top_k);

        // Merge keyed on content, dense results first so their metadata wins.
        let mut merged: Vec<RetrievalResult> = Vec::new();
        let mut by_content: FxHashMap<String, usize> = FxHashMap::default();

        for (content, metadata, similarity) in dense {
            let position = merged.len();
            merged.push(RetrievalResult {
                content: content.clone(),
                metadata,
                dense_score: Some(similarity),
                sparse_score: None,
                combined_score: similarity,
            });
            by_content.entry(content).or_insert(position);
        }

        for (chunk_pos, score) in sparse {
            let chunk = &self.chunks[chunk_pos];
            match by_content.get(&chunk.content) {
                Some(&position) => {
                    let entry = &mut merged[position];
                    entry.sparse_score = Some(score);
                }
                None => {
                    let position = merged.len();
                    merged.push(RetrievalResult {
                        content: chunk.content.clone(),
                        metadata: chunk.metadata.clone(),
                        dense_score: None,
                        sparse_score: Some(score),
                        combined_score: score,
                    });
                    by_content.insert(chunk.content.clone(), position);
                }
            }
        }

        for entry in &mut merged {
            if let (Some(d), Some(s)) = (entry.dense_score, entry.sparse_score) {
                entry.combined_score =
                    self.config.dense_weight * d + self.config.sparse_weight * s;
            }
        }

        merged.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
        merged.truncate(top_k);
        debug!(query_len = query.chars().count(), results = merged.len(), "hybrid search");
        merged
    }

    /// Dense leg of the search. Any failure is logged and degraded to an
    /// empty result set so sparse search can still answer.
    async fn dense_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Vec<(String, FxHashMap<String, serde_json::Value>, f32)> {
        let embedding = match self.embeddings.embed(query).await {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "embedding failed, degrading to sparse-only");
                return Vec::new();
            }
        };
        let points = match self.store.query(&embedding, top_k).await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "vector store query failed, degrading to sparse-only");
                return Vec::new();
            }
        };
        points
            .into_iter()
            .map(|p| {
                let similarity = 1.0 / (1.0 + p.distance.max(0.0));
                (p.content, p.metadata, similarity)
            })
            .collect()
    }
}
