use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::SparseConfig;
use crate::corpus::DocumentChunk;

use super::tokenize;

/// TF-IDF index over unigrams and bigrams.
///
/// Rebuilding is a full replace; there is no incremental vocabulary update.
/// Document vectors are L2-normalized at build time so query scoring reduces
/// to a dot product.
#[derive(Debug, Default)]
pub struct TfIdfIndex {
    vocabulary: FxHashMap<String, usize>,
    idf: Vec<f32>,
    /// One sparse vector per chunk, `(term_index, weight)` pairs.
    vectors: Vec<Vec<(usize, f32)>>,
}

impl TfIdfIndex {
    /// Builds an index from the chunk contents.
    ///
    /// Terms occurring in more than `max_df` of all documents are excluded
    /// (only applied when there is more than one document); the surviving
    /// vocabulary is capped to the `max_features` terms with the highest
    /// collection frequency. `idf = ln((1 + n) / (1 + df)) + 1`.
    #[must_use]
    pub fn build(chunks: &[DocumentChunk], config: &SparseConfig) -> Self {
        let term_lists: Vec<Vec<String>> = chunks
            .iter()
            .map(|c| terms_of(&c.content))
            .collect();
        let n = term_lists.len();

        let mut doc_freq: FxHashMap<&str, usize> = FxHashMap::default();
        let mut coll_freq: FxHashMap<&str, usize> = FxHashMap::default();
        for terms in &term_lists {
            let mut seen: FxHashMap<&str, ()> = FxHashMap::default();
            for term in terms {
                *coll_freq.entry(term).or_insert(0) += 1;
                if seen.insert(term, ()).is_none() {
                    *doc_freq.entry(term).or_insert(0) += 1;
                }
            }
        }

        let mut candidates: Vec<(&str, usize, usize)> = doc_freq
            .iter()
            .filter(|(_, &df)| n <= 1 || (df as f32 / n as f32) <= config.max_df)
            .map(|(&term, &df)| (term, df, coll_freq.get(term).copied().unwrap_or(0)))
            .collect();
        // Highest collection frequency first; term text breaks ties so
        // builds are deterministic.
        candidates.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));
        candidates.truncate(config.max_features);

        let mut vocabulary = FxHashMap::default();
        let mut idf = Vec::with_capacity(candidates.len());
        for (i, (term, df, _)) in candidates.iter().enumerate() {
            vocabulary.insert((*term).to_string(), i);
            idf.push((((1 + n) as f32 / (1 + df) as f32).ln()) + 1.0);
        }

        let vectors = term_lists
            .iter()
            .map(|terms| vectorize(terms, &vocabulary, &idf))
            .collect();

        debug!(
            documents = n,
            vocabulary = vocabulary.len(),
            "built tf-idf index"
        );
        Self {
            vocabulary,
            idf,
            vectors,
        }
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Returns up to `top_k` `(chunk_position, cosine_similarity)` pairs with
    /// similarity strictly above zero, highest first.
    #[must_use]
    pub fn query(&self, text: &str, top_k: usize) -> Vec<(usize, f32)> {
        let query_vec = vectorize(&terms_of(text), &self.vocabulary, &self.idf);
        if query_vec.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .filter_map(|(i, doc_vec)| {
                let sim = dot(&query_vec, doc_vec);
                (sim > 0.0).then_some((i, sim))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(top_k);
        scored
    }
}

/// Unigrams plus adjacent-token bigrams.
fn terms_of(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    let mut terms = tokens.clone();
    for pair in tokens.windows(2) {
        terms.push(format!("{} {}", pair[0], pair[1]));
    }
    terms
}

/// L2-normalized sparse tf-idf vector, sorted by term index.
fn vectorize(
    terms: &[String],
    vocabulary: &FxHashMap<String, usize>,
    idf: &[f32],
) -> Vec<(usize, f32)> {
    let mut counts: FxHashMap<usize, usize> = FxHashMap::default();
    for term in terms {
        if let Some(&idx) = vocabulary.get(term) {
            *counts.entry(idx).or_insert(0) += 1;
        }
    }
    let mut vec: Vec<(usize, f32)> = counts
        .into_iter()
        .map(|(idx, tf)| (idx, tf as f32 * idf[idx]))
        .collect();
    let norm: f32 = vec.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for (_, w) in &mut vec {
            *w /= norm;
        }
    }
    vec.sort_by_key(|&(idx, _)| idx);
    vec
}

/// Dot product of two index-sorted sparse vectors.
fn dot(a: &[(usize, f32)], b: &[(usize, f32)]) -> f32 {
    let mut sum = 0.0;
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}
