//! Failure-tolerant rerank stage.
//!
//! Wraps any [`Reranker`] with caching, a mandatory deadline and a
//! fallback to the pre-rerank order, so reranking can only ever improve a
//! response and never fail it.
//!
//! ```ascii
//!  candidates ─► enabled? ──no──► truncate(top_k)             [Disabled]
//!                  │yes
//!                  ▼
//!              empty? ──yes──► []                             [Skipped]
//!                  │no
//!                  ▼
//!            cache hit? ──yes──► cached results               [Cached]
//!                  │no
//!                  ▼
//!   timeout(reranker.rerank) ──ok──► drop < threshold, cache  [Reranked]
//!                  │err / deadline
//!                  ▼
//!     log + truncate(top_k)                                   [Fallback]
//! ```
//!
//! The score threshold applies to reranker scores only. A fallback keeps
//! pre-rerank scores, which live on another scale, so it is not filtered.
//! Transient failures (deadlines, rate limits, 5xx) log at `info!`;
//! anything else logs at `warn!`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::cache::{CacheKey, RerankCache};
use super::config::RerankerConfig;
use super::result::{mean_score, RerankedDocument};
use super::traits::Reranker;
use crate::error::RerankError;
use crate::stats::RunningAverage;

/// How the stage produced its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RerankStatus {
    /// The reranker ran and succeeded.
    Reranked,
    /// Results came from the cache.
    Cached,
    /// The reranker failed or timed out; input order was kept.
    Fallback,
    /// The stage is disabled; input order was kept.
    Disabled,
    /// There was nothing to rerank.
    Skipped,
}

impl RerankStatus {
    /// Whether the output reflects reranker scores.
    pub fn is_reranked(self) -> bool {
        matches!(self, Self::Reranked | Self::Cached)
    }
}

/// Output of [`RerankStage::rerank`].
#[derive(Debug, Clone, PartialEq)]
pub struct RerankOutcome {
    pub results: Vec<RerankedDocument>,
    pub status: RerankStatus,
}

/// Stage statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RerankStats {
    /// Calls that reached the inner reranker.
    pub rerank_calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub fallbacks: u64,
    pub timeouts: u64,
    pub documents_reranked: u64,
    /// Mean of (reranked top-k mean score − input mean score) over successful calls.
    pub average_score_improvement: f64,
    /// `cache_hits / (cache_hits + rerank_calls)`.
    pub cache_hit_rate: f64,
}

#[derive(Debug, Default)]
struct StageCounters {
    rerank_calls: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    fallbacks: AtomicU64,
    timeouts: AtomicU64,
    documents_reranked: AtomicU64,
}

/// Reranker wrapper adding cache, deadline, fallback and statistics.
///
/// # Example
///
/// ```ignore
/// let stage = RerankStage::new(Arc::new(reranker), &RerankerConfig::default());
/// let outcome = stage.rerank("slack alerts", &candidates, 5).await;
/// if outcome.status == RerankStatus::Fallback {
///     // results are the first five candidates, unchanged
/// }
/// ```
pub struct RerankStage {
    reranker: Arc<dyn Reranker>,
    enabled: AtomicBool,
    timeout: Duration,
    min_score_threshold: f64,
    cache: RerankCache,
    counters: StageCounters,
    improvement: Mutex<RunningAverage>,
}

impl RerankStage {
    /// Wrap a reranker.
    pub fn new(reranker: Arc<dyn Reranker>, config: &RerankerConfig) -> Self {
        Self {
            reranker,
            enabled: AtomicBool::new(config.enabled),
            timeout: config.timeout,
            min_score_threshold: config.min_score_threshold,
            cache: RerankCache::new(config.cache_capacity),
            counters: StageCounters::default(),
            improvement: Mutex::new(RunningAverage::default()),
        }
    }

    /// The wrapped reranker.
    pub fn reranker(&self) -> &Arc<dyn Reranker> {
        &self.reranker
    }

    /// Whether the reranker is called.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Turn reranking on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Rerank candidates, never failing.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: &[RerankedDocument],
        top_k: usize,
    ) -> RerankOutcome {
        if !self.is_enabled() {
            return Self::passthrough(candidates, top_k, RerankStatus::Disabled);
        }
        if candidates.is_empty() {
            return RerankOutcome {
                results: Vec::new(),
                status: RerankStatus::Skipped,
            };
        }

        let key = CacheKey::new(query, candidates, top_k);
        if self.cache.is_enabled() {
            if let Some(results) = self.cache.get(&key) {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!("Rerank cache hit for {} candidates", candidates.len());
                return RerankOutcome {
                    results,
                    status: RerankStatus::Cached,
                };
            }
            self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
        }

        self.counters.rerank_calls.fetch_add(1, Ordering::Relaxed);
        self.counters
            .documents_reranked
            .fetch_add(candidates.len() as u64, Ordering::Relaxed);

        let result = match tokio::time::timeout(
            self.timeout,
            self.reranker.rerank(query, candidates, top_k),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                Err(RerankError::Timeout(self.timeout))
            }
        };

        match result {
            Ok(mut results) => {
                results.retain(|r| r.final_score >= self.min_score_threshold);
                let improvement = mean_score(&results) - mean_score(candidates);
                self.improvement.lock().record(improvement);
                self.cache.put(key, results.clone());
                RerankOutcome {
                    results,
                    status: RerankStatus::Reranked,
                }
            }
            Err(e) => {
                self.counters.fallbacks.fetch_add(1, Ordering::Relaxed);
                if e.is_transient() {
                    info!(
                        reranker = self.reranker.name(),
                        error = %e,
                        "Reranking unavailable, using fusion order"
                    );
                } else {
                    warn!(
                        reranker = self.reranker.name(),
                        error = %e,
                        "Reranking failed, using fusion order"
                    );
                }
                Self::passthrough(candidates, top_k, RerankStatus::Fallback)
            }
        }
    }

    fn passthrough(
        candidates: &[RerankedDocument],
        top_k: usize,
        status: RerankStatus,
    ) -> RerankOutcome {
        RerankOutcome {
            results: candidates.iter().take(top_k).cloned().collect(),
            status,
        }
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> RerankStats {
        let rerank_calls = self.counters.rerank_calls.load(Ordering::Relaxed);
        let cache_hits = self.counters.cache_hits.load(Ordering::Relaxed);
        let lookups = cache_hits + rerank_calls;
        RerankStats {
            rerank_calls,
            cache_hits,
            cache_misses: self.counters.cache_misses.load(Ordering::Relaxed),
            fallbacks: self.counters.fallbacks.load(Ordering::Relaxed),
            timeouts: self.counters.timeouts.load(Ordering::Relaxed),
            documents_reranked: self.counters.documents_reranked.load(Ordering::Relaxed),
            average_score_improvement: self.improvement.lock().mean(),
            cache_hit_rate: if lookups > 0 {
                cache_hits as f64 / lookups as f64
            } else {
                0.0
            },
        }
    }

    /// Zero the statistics.
    pub fn reset_stats(&self) {
        self.counters.rerank_calls.store(0, Ordering::Relaxed);
        self.counters.cache_hits.store(0, Ordering::Relaxed);
        self.counters.cache_misses.store(0, Ordering::Relaxed);
        self.counters.fallbacks.store(0, Ordering::Relaxed);
        self.counters.timeouts.store(0, Ordering::Relaxed);
        self.counters.documents_reranked.store(0, Ordering::Relaxed);
        *self.improvement.lock() = RunningAverage::default();
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
