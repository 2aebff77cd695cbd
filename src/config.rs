//! Engine configuration.
//!
//! All tunables live on [`EngineConfig`], grouped by subsystem. Defaults
//! mirror the values the engine was tuned with in production; environment
//! resolution ([`EngineConfig::from_env`]) only overrides the service
//! endpoints and model names, keeping numeric tunables in code.

use std::time::Duration;

use url::Url;

use crate::error::EngineError;

/// Sentence-aware chunking parameters.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 50,
        }
    }
}

/// TF-IDF index parameters.
#[derive(Debug, Clone)]
pub struct SparseConfig {
    /// Vocabulary cap after document-frequency filtering.
    pub max_features: usize,
    /// Terms appearing in more than this fraction of documents are dropped.
    pub max_df: f32,
}

impl Default for SparseConfig {
    fn default() -> Self {
        Self {
            max_features: 1000,
            max_df: 0.95,
        }
    }
}

/// Hybrid retrieval weights and result cap.
#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// Weight applied to the dense (vector) similarity.
    pub dense_weight: f32,
    /// Weight applied to the sparse (TF-IDF) similarity.
    pub sparse_weight: f32,
    /// Maximum results returned per query.
    pub top_k: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            dense_weight: 0.7,
            sparse_weight: 0.3,
            top_k: 10,
        }
    }
}

/// Evidence compaction thresholds.
#[derive(Debug, Clone)]
pub struct CompactionConfig {
    /// Minimum query-token overlap ratio for a passage to survive.
    pub min_overlap_ratio: f32,
    /// Combined character budget before length-based trimming kicks in.
    pub max_context_chars: usize,
    /// Survivor count when the character budget is exceeded.
    pub max_survivors: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            min_overlap_ratio: 0.1,
            max_context_chars: 2000,
            max_survivors: 5,
        }
    }
}

/// Timing knobs for a single orchestrated turn.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Delay before the visual-context fetch fires.
    pub visual_fetch_delay: Duration,
    /// Per-request timeout on the visual-context fetch itself.
    pub visual_timeout: Duration,
    /// How long the turn waits for the visual task before proceeding without it.
    pub visual_join_timeout: Duration,
    /// Ceiling on the primary answer generation.
    pub answer_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            visual_fetch_delay: Duration::from_millis(500),
            visual_timeout: Duration::from_secs(3),
            visual_join_timeout: Duration::from_secs(3),
            answer_timeout: Duration::from_secs(120),
        }
    }
}

/// Locations and model names for the external services the engine talks to.
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    /// Embedding service base URL.
    pub embedding_url: Url,
    /// Chat service base URL.
    pub chat_url: Url,
    /// Vector store base URL.
    pub vector_store_url: Url,
    /// Visual-context service base URL.
    pub vision_url: Url,
    /// Model name passed on embedding requests.
    pub embed_model: String,
    /// Model name passed on chat requests.
    pub chat_model: String,
}

impl Default for ServiceEndpoints {
    // Unwraps here are on compile-time constant literals.
    #[allow(clippy::unwrap_used)]
    fn default() -> Self {
        Self {
            embedding_url: Url::parse("http://localhost:11434").unwrap(),
            chat_url: Url::parse("http://localhost:11434").unwrap(),
            vector_store_url: Url::parse("http://localhost:8000").unwrap(),
            vision_url: Url::parse("http://localhost:8100").unwrap(),
            embed_model: "nomic-embed-text".to_string(),
            chat_model: "llama3.1:8b".to_string(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub chunking: ChunkingConfig,
    pub sparse: SparseConfig,
    pub hybrid: HybridConfig,
    pub compaction: CompactionConfig,
    pub orchestrator: OrchestratorConfig,
    pub endpoints: ServiceEndpoints,
}

impl EngineConfig {
    /// Resolves endpoint configuration from the environment.
    ///
    /// Loads `.env` if present (ignoring errors when it is absent), then
    /// reads `DOCENT_EMBEDDING_URL`, `DOCENT_CHAT_URL`,
    /// `DOCENT_VECTOR_STORE_URL`, `DOCENT_VISION_URL`,
    /// `DOCENT_EMBED_MODEL`, and `DOCENT_CHAT_MODEL`, falling back to
    /// defaults for any that are unset. Numeric tunables keep their
    /// defaults; callers adjust them on the returned value.
    pub fn from_env() -> Result<Self, EngineError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();

        if let Some(url) = env_url("DOCENT_EMBEDDING_URL")? {
            config.endpoints.embedding_url = url;
        }
        if let Some(url) = env_url("DOCENT_CHAT_URL")? {
            config.endpoints.chat_url = url;
        }
        if let Some(url) = env_url("DOCENT_VECTOR_STORE_URL")? {
            config.endpoints.vector_store_url = url;
        }
        if let Some(url) = env_url("DOCENT_VISION_URL")? {
            config.endpoints.vision_url = url;
        }
        if let Ok(model) = std::env::var("DOCENT_EMBED_MODEL") {
            if !model.trim().is_empty() {
                config.endpoints.embed_model = model;
            }
        }
        if let Ok(model) = std::env::var("DOCENT_CHAT_MODEL") {
            if !model.trim().is_empty() {
                config.endpoints.chat_model = model;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks internal consistency of the numeric tunables.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.chunking.chunk_size == 0 {
            return Err(EngineError::Config("chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(EngineError::Config(
                "chunk_overlap must be smaller than chunk_size".into(),
            ));
        }
        if self.hybrid.top_k == 0 {
            return Err(EngineError::Config("top_k must be positive".into()));
        }
        let weight_sum = self.hybrid.dense_weight + self.hybrid.sparse_weight;
        if !(weight_sum.is_finite() && weight_sum > 0.0) {
            return Err(EngineError::Config(
                "hybrid weights must sum to a positive value".into(),
            ));
        }
        Ok(())
    }
}

fn env_url(key: &str) -> Result<Option<Url>, EngineError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => Url::parse(raw.trim())
            .map(Some)
            .map_err(|e| EngineError::Config(format!("{key}: {e}"))),
        _ => Ok(None),
    }
}
