//! Hybrid retrieval orchestrator.
//!
//! # Pipeline
//!
//! ```ascii
//!                 ┌──────────────┐
//!                 │    query     │
//!                 └──────┬───────┘
//!            ┌───────────┴────────────┐        (concurrent)
//!            ▼                        ▼
//!  ┌──────────────────┐    ┌────────────────────┐
//!  │ VectorRetriever  │    │ BM25 (blocking     │
//!  │ limit=initial_k  │    │ task, initial_k)   │
//!  └────────┬─────────┘    └─────────┬──────────┘
//!           └───────────┬────────────┘
//!                       ▼
//!            fuse (RRF | weighted)
//!                       ▼
//!            take reranker_top_k
//!                       ▼
//!        RerankStage (→ final_k) or take final_k
//!                       ▼
//!            MMR (optional, len > 1)
//!                       ▼
//!              RetrievalResponse
//! ```
//!
//! The vector source is mandatory: its failure fails the call. The reranker
//! is optional: its failure degrades to fusion order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, Instrument};

use crate::bm25::Bm25Engine;
use crate::config::RetrievalConfig;
use crate::diversity::MmrSelector;
use crate::document::Document;
use crate::error::{ConfigError, RetrievalError, Result};
use crate::fusion::{fuse, FusionMethod};
use crate::ranking::{RankedList, RetrievalSource};
use crate::reranker::{RerankStage, RerankStats, RerankStatus, RerankedDocument, Reranker};
use crate::stats::{RetrievalStats, RetrievalStatsSnapshot};
use crate::traits::{SearchOptions, VectorRetriever};

/// Per-call inputs to [`HybridRetriever::retrieve`].
#[derive(Debug, Clone, Default)]
pub struct RetrieveOptions {
    /// BM25 corpus; defaults to the vector retriever's corpus.
    pub corpus: Option<Arc<[Document]>>,
    /// Metadata filters forwarded to the vector search.
    pub filters: Option<Map<String, Value>>,
}

impl RetrieveOptions {
    /// Options with no corpus override and no filters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run BM25 over this corpus.
    pub fn with_corpus(mut self, corpus: impl Into<Arc<[Document]>>) -> Self {
        self.corpus = Some(corpus.into());
        self
    }

    /// Forward metadata filters to the vector search.
    pub fn with_filters(mut self, filters: Map<String, Value>) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// Diagnostics for one retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMetadata {
    pub vector_count: usize,
    pub bm25_count: usize,
    pub fused_count: usize,
    pub final_count: usize,
    pub fusion_method: FusionMethod,
    /// True only when reranker scores determined the order.
    pub reranked: bool,
    /// Rerank stage outcome, when the stage ran.
    pub rerank_status: Option<RerankStatus>,
    pub duration: Duration,
}

/// Ranked results plus diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResponse {
    pub results: Vec<RerankedDocument>,
    pub metadata: RetrievalMetadata,
}

/// Vector + BM25 retrieval with fusion, optional reranking and diversity.
///
/// Safe to share across tasks through an `Arc`; every call takes `&self`.
///
/// # Example
///
/// ```ignore
/// let retriever = HybridRetriever::new(vector, Some(reranker), RetrievalConfig::default())?;
/// let response = retriever
///     .retrieve("webhook slack notification", RetrieveOptions::new())
///     .await?;
/// for doc in &response.results {
///     println!("{} {:.3}", doc.document.id, doc.final_score);
/// }
/// ```
pub struct HybridRetriever {
    vector_retriever: Arc<dyn VectorRetriever>,
    rerank_stage: Option<RerankStage>,
    bm25: Bm25Engine,
    diversity: MmrSelector,
    config: RetrievalConfig,
    stats: RetrievalStats,
}

impl HybridRetriever {
    /// Build an orchestrator; fails if `config` is invalid.
    pub fn new(
        vector_retriever: Arc<dyn VectorRetriever>,
        reranker: Option<Arc<dyn Reranker>>,
        config: RetrievalConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let rerank_config = config.reranker_config();
        let rerank_stage = reranker.map(|r| RerankStage::new(r, &rerank_config));

        info!(
            fusion_method = %config.fusion_method,
            initial_k = config.initial_k,
            final_k = config.final_k,
            reranker = rerank_stage.as_ref().map(|s| s.reranker().name()).unwrap_or("none"),
            "Hybrid retriever initialized"
        );

        Ok(Self {
            vector_retriever,
            rerank_stage,
            bm25: config.bm25_engine(),
            diversity: MmrSelector::new(config.diversity_lambda),
            config,
            stats: RetrievalStats::new(),
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Run the full pipeline for one query.
    pub async fn retrieve(&self, query: &str, options: RetrieveOptions) -> Result<RetrievalResponse> {
        let span = info_span!(
            "hybrid_retrieve",
            fusion_method = %self.config.fusion_method,
            query_chars = query.chars().count()
        );
        self.run(query, options).instrument(span).await
    }

    async fn run(&self, query: &str, options: RetrieveOptions) -> Result<RetrievalResponse> {
        let start = Instant::now();
        self.stats.record_retrieval();

        let initial_k = self.config.initial_k;
        let final_k = self.config.final_k;

        // Step 1: both sources concurrently
        let search_options = SearchOptions {
            limit: initial_k,
            filters: options.filters,
        };
        let corpus = options
            .corpus
            .or_else(|| self.vector_retriever.document_corpus());

        let lexical = async {
            let list = match corpus {
                Some(corpus) if !corpus.is_empty() => {
                    let engine = self.bm25.clone();
                    let query = query.to_string();
                    tokio::task::spawn_blocking(move || engine.search(&query, &corpus, initial_k))
                        .await?
                }
                _ => RankedList::empty(RetrievalSource::Bm25),
            };
            Ok::<_, RetrievalError>(list)
        };

        let (vector, bm25) = tokio::try_join!(
            self.vector_retriever.search(query, &search_options),
            lexical
        )?;

        self.stats.record_hits(vector.len(), bm25.len());
        debug!(
            vector_count = vector.len(),
            bm25_count = bm25.len(),
            "First-stage retrieval complete"
        );

        // Step 2: fusion
        let fused = fuse(
            self.config.fusion_method,
            &vector,
            &bm25,
            self.config.fusion_params(),
        );
        if !fused.is_empty() {
            let mean = fused.iter().map(|f| f.combined_score).sum::<f64>() / fused.len() as f64;
            self.stats.record_fusion_score(mean);
        }
        let fused_count = fused.len();

        // Step 3: rerank candidates
        let mut candidates: Vec<RerankedDocument> = fused
            .iter()
            .take(self.config.reranker_top_k)
            .map(RerankedDocument::from_fusion)
            .collect();

        let mut rerank_status = None;
        let mut results = match &self.rerank_stage {
            Some(stage) if self.config.use_reranker && !candidates.is_empty() => {
                let outcome = stage.rerank(query, &candidates, final_k).await;
                if matches!(
                    outcome.status,
                    RerankStatus::Reranked | RerankStatus::Cached | RerankStatus::Fallback
                ) {
                    self.stats
                        .record_rerank(outcome.status == RerankStatus::Fallback);
                }
                rerank_status = Some(outcome.status);
                outcome.results
            }
            _ => {
                candidates.truncate(final_k);
                candidates
            }
        };
        results.truncate(final_k);

        // Step 4: diversity
        if self.config.enable_diversity && results.len() > 1 {
            results = self.diversity.diversify(&results, final_k);
        }

        let duration = start.elapsed();
        let metadata = RetrievalMetadata {
            vector_count: vector.len(),
            bm25_count: bm25.len(),
            fused_count,
            final_count: results.len(),
            fusion_method: self.config.fusion_method,
            reranked: rerank_status.is_some_and(RerankStatus::is_reranked),
            rerank_status,
            duration,
        };

        info!(
            vector_count = metadata.vector_count,
            bm25_count = metadata.bm25_count,
            fused_count = metadata.fused_count,
            final_count = metadata.final_count,
            reranked = metadata.reranked,
            duration_ms = duration.as_millis() as u64,
            "Hybrid retrieval complete"
        );

        Ok(RetrievalResponse { results, metadata })
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> RetrievalStatsSnapshot {
        self.stats.snapshot(self.config.stats_summary())
    }

    /// Rerank stage statistics, when a reranker is attached.
    pub fn rerank_stats(&self) -> Option<RerankStats> {
        self.rerank_stage.as_ref().map(RerankStage::stats)
    }

    /// Zero retrieval and rerank statistics.
    pub fn reset_stats(&self) {
        self.stats.reset();
        if let Some(stage) = &self.rerank_stage {
            stage.reset_stats();
        }
    }

    /// Drop cached rerank results.
    pub fn clear_rerank_cache(&self) {
        if let Some(stage) = &self.rerank_stage {
            stage.clear_cache();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StaticRetriever {
        hits: Vec<(Document, f64)>,
    }

    #[async_trait]
    impl VectorRetriever for StaticRetriever {
        async fn search(&self, _query: &str, options: &SearchOptions) -> Result<RankedList> {
            Ok(RankedList::from_scored(
                RetrievalSource::Vector,
                self.hits.iter().take(options.limit).cloned(),
            ))
        }
    }

    fn retriever(config: RetrievalConfig) -> HybridRetriever {
        let hits = vec![
            (Document::new("1", "webhook trigger node"), 0.9),
            (Document::new("2", "slack message node"), 0.8),
            (Document::new("3", "gmail email node"), 0.7),
        ];
        HybridRetriever::new(Arc::new(StaticRetriever { hits }), None, config).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = HybridRetriever::new(
            Arc::new(StaticRetriever { hits: vec![] }),
            None,
            RetrievalConfig::default().with_k(3, 5),
        );
        assert!(matches!(
            result,
            Err(ConfigError::FinalKExceedsInitialK { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_corpus_means_empty_bm25() {
        let retriever = retriever(RetrievalConfig::default());
        let response = retriever.retrieve("slack", RetrieveOptions::new()).await.unwrap();
        assert_eq!(response.metadata.bm25_count, 0);
        assert_eq!(response.metadata.vector_count, 3);
        assert_eq!(response.metadata.final_count, 3);
        assert!(!response.metadata.reranked);
        assert_eq!(response.metadata.rerank_status, None);
    }

    #[tokio::test]
    async fn test_corpus_option_feeds_bm25() {
        let retriever = retriever(RetrievalConfig::default());
        let corpus = vec![
            Document::new("2", "slack message node"),
            Document::new("9", "slack alerts"),
        ];
        let response = retriever
            .retrieve("slack", RetrieveOptions::new().with_corpus(corpus))
            .await
            .unwrap();
        assert_eq!(response.metadata.bm25_count, 2);
        assert_eq!(response.metadata.fused_count, 4);
        // "2" is in both lists
        assert_eq!(response.results[0].document.id, "2");
    }

    #[tokio::test]
    async fn test_stats_and_reset() {
        let retriever = retriever(RetrievalConfig::default());
        retriever.retrieve("slack", RetrieveOptions::new()).await.unwrap();
        retriever.retrieve("webhook", RetrieveOptions::new()).await.unwrap();

        let stats = retriever.stats();
        assert_eq!(stats.retrievals, 2);
        assert_eq!(stats.vector_hits, 6);
        assert_eq!(stats.avg_vector_hits_per_retrieval, 3.0);
        assert!(stats.avg_fusion_score > 0.0);
        assert_eq!(stats.config.final_k, 5);
        assert!(retriever.rerank_stats().is_none());

        retriever.reset_stats();
        assert_eq!(retriever.stats().retrievals, 0);
    }
}
