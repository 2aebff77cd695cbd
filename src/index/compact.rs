use tracing::debug;

use crate::config::CompactionConfig;

use super::tokenize;

/// Filters and truncates retrieved evidence before it reaches the prompt.
///
/// Passages that share too few tokens with the query are dropped; when the
/// survivors still exceed the character budget, the shortest few are kept.
#[derive(Debug, Clone)]
pub struct ContextCompactor {
    config: CompactionConfig,
}

impl ContextCompactor {
    #[must_use]
    pub fn new(config: CompactionConfig) -> Self {
        Self { config }
    }

    /// Compacts `passages` against `query`, returning the joined context.
    ///
    /// A passage survives when `|query ∩ passage| / |query| >` the configured
    /// overlap ratio. If the query has no tokens at all, every passage
    /// survives the filter. When the survivors exceed the character budget,
    /// only the shortest `max_survivors` are kept. Returns `None` when
    /// nothing survives.
    #[must_use]
    pub fn compact(&self, passages: &[String], query: &str) -> Option<String> {
        let query_tokens: Vec<String> = {
            let mut t = tokenize(query);
            t.sort_unstable();
            t.dedup();
            t
        };

        let mut survivors: Vec<&String> = passages
            .iter()
            .filter(|p| self.overlaps(p, &query_tokens))
            .collect();
        if survivors.is_empty() {
            return None;
        }

        let total_chars: usize = survivors.iter().map(|p| p.chars().count()).sum();
        if total_chars > self.config.max_context_chars {
            survivors.sort_by_key(|p| p.chars().count());
            survivors.truncate(self.config.max_survivors);
            debug!(
                total_chars,
                kept = survivors.len(),
                "context over budget, keeping shortest passages"
            );
        }

        Some(
            survivors
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    fn overlaps(&self, passage: &str, query_tokens: &[String]) -> bool {
        if query_tokens.is_empty() {
            return true;
        }
        let passage_tokens = tokenize(passage);
        let shared = query_tokens
            .iter()
            .filter(|t| passage_tokens.iter().any(|p| p == *t))
            .count();
        (shared as f32 / query_tokens.len() as f32) > self.config.min_overlap_ratio
    }
}
