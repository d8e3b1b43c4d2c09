//! Reranker configuration types.
//!
//! ```ascii
//! ┌─────────────────────────────────────────────────────────┐
//! │                    RerankerConfig                        │
//! ├─────────────────────────────────────────────────────────┤
//! │ enabled: bool           ─────► Run the reranker at all  │
//! │ min_score_threshold     ─────► Drop weaker results      │
//! │ vector_weight           ─────► Hybrid cosine share      │
//! │ bm25_weight             ─────► Hybrid lexical share     │
//! │ timeout: Duration       ─────► Deadline per call        │
//! │ cache_capacity: usize   ─────► LRU entries (0 = off)    │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

/// Configuration for rerankers and the rerank stage.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use edgequake_retrieval::reranker::RerankerConfig;
///
/// let config = RerankerConfig::default()
///     .with_timeout(Duration::from_secs(2))
///     .with_cache_capacity(64);
/// assert_eq!(config.vector_weight, 0.7);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RerankerConfig {
    /// Whether the stage calls the reranker.
    pub enabled: bool,
    /// Results scoring below this are dropped.
    pub min_score_threshold: f64,
    /// Weight of cosine similarity in the hybrid reranker.
    pub vector_weight: f64,
    /// Weight of BM25 in the hybrid reranker.
    pub bm25_weight: f64,
    /// Deadline for one rerank call.
    pub timeout: Duration,
    /// Maximum cached rerank results.
    pub cache_capacity: usize,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_score_threshold: 0.0,
            vector_weight: 0.7,
            bm25_weight: 0.3,
            timeout: Duration::from_millis(10_000),
            cache_capacity: 256,
        }
    }
}

impl RerankerConfig {
    /// Enable or disable the reranker.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the minimum score threshold.
    pub fn with_min_score_threshold(mut self, threshold: f64) -> Self {
        self.min_score_threshold = threshold;
        self
    }

    /// Set the hybrid weights.
    pub fn with_weights(mut self, vector_weight: f64, bm25_weight: f64) -> Self {
        self.vector_weight = vector_weight;
        self.bm25_weight = bm25_weight;
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the cache capacity.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}
