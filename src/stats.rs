//! Retrieval statistics.
//!
//! Counters are lock-free atomics. Running averages need a consistent
//! read-modify-write of `(count, mean)` and sit behind a `parking_lot`
//! mutex that is never held across an await.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::fusion::FusionMethod;

/// Incremental mean: `avg' = (avg × (n - 1) + x) / n`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct RunningAverage {
    count: u64,
    mean: f64,
}

impl RunningAverage {
    pub(crate) fn record(&mut self, value: f64) {
        self.count += 1;
        self.mean = (self.mean * (self.count - 1) as f64 + value) / self.count as f64;
    }

    pub(crate) fn mean(&self) -> f64 {
        self.mean
    }
}

/// Live counters owned by a [`crate::HybridRetriever`].
#[derive(Debug, Default)]
pub struct RetrievalStats {
    retrievals: AtomicU64,
    vector_hits: AtomicU64,
    bm25_hits: AtomicU64,
    rerank_calls: AtomicU64,
    rerank_fallbacks: AtomicU64,
    fusion_score: Mutex<RunningAverage>,
}

impl RetrievalStats {
    /// Create zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_retrieval(&self) {
        self.retrievals.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_hits(&self, vector_hits: usize, bm25_hits: usize) {
        self.vector_hits
            .fetch_add(vector_hits as u64, Ordering::Relaxed);
        self.bm25_hits.fetch_add(bm25_hits as u64, Ordering::Relaxed);
    }

    /// Fold the mean combined score of one fused list into the running average.
    pub(crate) fn record_fusion_score(&self, mean_score: f64) {
        self.fusion_score.lock().record(mean_score);
    }

    pub(crate) fn record_rerank(&self, fell_back: bool) {
        self.rerank_calls.fetch_add(1, Ordering::Relaxed);
        if fell_back {
            self.rerank_fallbacks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self, config: StatsConfigSummary) -> RetrievalStatsSnapshot {
        let retrievals = self.retrievals.load(Ordering::Relaxed);
        let vector_hits = self.vector_hits.load(Ordering::Relaxed);
        let bm25_hits = self.bm25_hits.load(Ordering::Relaxed);
        let rerank_calls = self.rerank_calls.load(Ordering::Relaxed);

        let per_retrieval = |n: u64| {
            if retrievals > 0 {
                n as f64 / retrievals as f64
            } else {
                0.0
            }
        };

        RetrievalStatsSnapshot {
            retrievals,
            vector_hits,
            bm25_hits,
            rerank_calls,
            rerank_fallbacks: self.rerank_fallbacks.load(Ordering::Relaxed),
            avg_fusion_score: self.fusion_score.lock().mean(),
            avg_vector_hits_per_retrieval: per_retrieval(vector_hits),
            avg_bm25_hits_per_retrieval: per_retrieval(bm25_hits),
            rerank_rate: per_retrieval(rerank_calls),
            config,
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        self.retrievals.store(0, Ordering::Relaxed);
        self.vector_hits.store(0, Ordering::Relaxed);
        self.bm25_hits.store(0, Ordering::Relaxed);
        self.rerank_calls.store(0, Ordering::Relaxed);
        self.rerank_fallbacks.store(0, Ordering::Relaxed);
        *self.fusion_score.lock() = RunningAverage::default();
    }
}

/// Configuration echoed in a stats snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsConfigSummary {
    pub fusion_method: FusionMethod,
    pub initial_k: usize,
    pub final_k: usize,
    pub reranker_enabled: bool,
}

/// Serializable statistics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalStatsSnapshot {
    pub retrievals: u64,
    pub vector_hits: u64,
    pub bm25_hits: u64,
    pub rerank_calls: u64,
    pub rerank_fallbacks: u64,
    pub avg_fusion_score: f64,
    pub avg_vector_hits_per_retrieval: f64,
    pub avg_bm25_hits_per_retrieval: f64,
    /// Fraction of retrievals that invoked the reranker, in `[0, 1]`.
    pub rerank_rate: f64,
    pub config: StatsConfigSummary,
}
