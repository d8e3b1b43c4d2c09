//! Reranker tests.
//!
//! Covers both rerankers and the failure policy of the rerank stage.

use super::*;
use crate::document::Document;
use crate::error::{EmbeddingError, RerankError};
use crate::providers::MockEmbeddingProvider;
use crate::traits::EmbeddingProvider;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Test Providers
// ============================================================================

/// One axis per vocabulary word: 1.0 if the text contains it.
struct KeywordProvider {
    vocabulary: Vec<&'static str>,
    calls: AtomicUsize,
}

impl KeywordProvider {
    fn new() -> Self {
        Self {
            vocabulary: vec!["slack", "channel", "gmail", "workflow", "webhook"],
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn name(&self) -> &str {
        "keyword"
    }

    fn model(&self) -> &str {
        "keyword-5"
    }

    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    fn max_tokens(&self) -> usize {
        512
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let lowered = t.to_lowercase();
                self.vocabulary
                    .iter()
                    .map(|w| if lowered.contains(w) { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect())
    }
}

/// Returns one vector too few.
struct ShortProvider;

#[async_trait]
impl EmbeddingProvider for ShortProvider {
    fn name(&self) -> &str {
        "short"
    }

    fn model(&self) -> &str {
        "short"
    }

    fn dimension(&self) -> usize {
        2
    }

    fn max_tokens(&self) -> usize {
        512
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Returns vectors of growing length.
struct RaggedProvider;

#[async_trait]
impl EmbeddingProvider for RaggedProvider {
    fn name(&self) -> &str {
        "ragged"
    }

    fn model(&self) -> &str {
        "ragged"
    }

    fn dimension(&self) -> usize {
        1
    }

    fn max_tokens(&self) -> usize {
        512
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok((0..texts.len()).map(|i| vec![1.0; i + 1]).collect())
    }
}

fn candidates() -> Vec<RerankedDocument> {
    vec![
        RerankedDocument::new(Document::new("a", "Gmail email inbox"), 0.9),
        RerankedDocument::new(Document::new("b", "Slack channel messages"), 0.5),
        RerankedDocument::new(Document::new("c", "Slack workflow automation"), 0.4),
    ]
}

fn ids(results: &[RerankedDocument]) -> Vec<&str> {
    results.iter().map(|r| r.document.id.as_str()).collect()
}

// ============================================================================
// EmbeddingReranker
// ============================================================================

#[tokio::test]
async fn test_embedding_reranker_orders_by_cosine() {
    let reranker = EmbeddingReranker::new(Arc::new(KeywordProvider::new()));
    let results = reranker
        .rerank("slack channel", &candidates(), 10)
        .await
        .unwrap();

    assert_eq!(ids(&results), vec!["b", "c", "a"]);
    assert!((results[0].final_score - 1.0).abs() < 1e-9);
    assert!((results[1].final_score - 0.5).abs() < 1e-9);
    assert_eq!(results[2].final_score, 0.0);
    assert_eq!(results[0].vector_score, results[0].final_score);
}

#[tokio::test]
async fn test_embedding_reranker_single_batch_call() {
    let provider = Arc::new(KeywordProvider::new());
    let reranker = EmbeddingReranker::new(provider.clone());
    reranker.rerank("slack", &candidates(), 3).await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_embedding_reranker_top_k_and_threshold() {
    let reranker = EmbeddingReranker::new(Arc::new(KeywordProvider::new()));
    let results = reranker.rerank("slack channel", &candidates(), 2).await.unwrap();
    assert_eq!(ids(&results), vec!["b", "c"]);

    let strict = EmbeddingReranker::new(Arc::new(KeywordProvider::new()))
        .with_min_score_threshold(0.6);
    let results = strict.rerank("slack channel", &candidates(), 10).await.unwrap();
    assert_eq!(ids(&results), vec!["b"]);
}

#[tokio::test]
async fn test_embedding_reranker_ties_keep_input_order() {
    let reranker = EmbeddingReranker::new(Arc::new(KeywordProvider::new()));
    let tied = vec![
        RerankedDocument::new(Document::new("x", "slack one"), 0.2),
        RerankedDocument::new(Document::new("y", "slack two"), 0.9),
    ];
    let results = reranker.rerank("slack", &tied, 2).await.unwrap();
    assert_eq!(ids(&results), vec!["x", "y"]);
}

#[tokio::test]
async fn test_embedding_reranker_empty() {
    let reranker = EmbeddingReranker::new(Arc::new(KeywordProvider::new()));
    assert!(reranker.rerank("slack", &[], 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_embedding_count_mismatch() {
    let reranker = EmbeddingReranker::new(Arc::new(ShortProvider));
    let err = reranker.rerank("q", &candidates(), 3).await.unwrap_err();
    assert!(matches!(
        err,
        RerankError::EmbeddingCountMismatch {
            expected: 4,
            got: 3
        }
    ));
}

#[tokio::test]
async fn test_dimension_mismatch() {
    let reranker = EmbeddingReranker::new(Arc::new(RaggedProvider));
    let err = reranker.rerank("q", &candidates(), 3).await.unwrap_err();
    assert!(matches!(
        err,
        RerankError::DimensionMismatch {
            expected: 1,
            got: 2
        }
    ));
}

// ============================================================================
// HybridReranker
// ============================================================================

#[tokio::test]
async fn test_hybrid_reranker_combines_signals() {
    let reranker = HybridReranker::new(Arc::new(KeywordProvider::new()));
    let results = reranker
        .rerank("slack channel", &candidates(), 3)
        .await
        .unwrap();

    assert_eq!(ids(&results), vec!["b", "c", "a"]);
    // b is the maximum of both normalized signals
    assert!((results[0].final_score - 1.0).abs() < 1e-9);
    assert_eq!(results[0].vector_score, 1.0);
    assert_eq!(results[0].bm25_score, 1.0);
    for r in &results {
        assert!((0.0..=1.0 + 1e-9).contains(&r.final_score));
    }
    assert_eq!(results[2].final_score, 0.0);
}

#[tokio::test]
async fn test_hybrid_reranker_pure_lexical_weights() {
    let reranker = HybridReranker::new(Arc::new(KeywordProvider::new())).with_weights(0.0, 1.0);
    let results = reranker.rerank("channel", &candidates(), 3).await.unwrap();
    assert_eq!(results[0].document.id, "b");
    assert_eq!(results[0].final_score, 1.0);
    assert_eq!(results[1].final_score, 0.0);
}

#[tokio::test]
async fn test_hybrid_reranker_propagates_provider_error() {
    let reranker = HybridReranker::new(Arc::new(MockEmbeddingProvider::new().failing()));
    let err = reranker.rerank("slack", &candidates(), 3).await.unwrap_err();
    assert!(matches!(err, RerankError::Embedding(_)));
}

#[test]
fn test_reranker_names() {
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(KeywordProvider::new());
    assert_eq!(EmbeddingReranker::new(provider.clone()).name(), "embedding");
    assert_eq!(EmbeddingReranker::new(provider.clone()).model(), "keyword-5");
    assert_eq!(HybridReranker::new(provider.clone()).name(), "hybrid");
    assert_eq!(HybridReranker::new(provider).model(), "hybrid:keyword-5");
}

// ============================================================================
// RerankStage
// ============================================================================

fn stage_over(provider: Arc<dyn EmbeddingProvider>, config: &RerankerConfig) -> RerankStage {
    RerankStage::new(Arc::new(EmbeddingReranker::new(provider)), config)
}

#[tokio::test]
async fn test_stage_reranks_and_caches() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let stage = stage_over(provider.clone(), &RerankerConfig::default());

    let first = stage.rerank("slack channel", &candidates(), 2).await;
    assert_eq!(first.status, RerankStatus::Reranked);
    assert_eq!(first.results.len(), 2);

    let second = stage.rerank("slack channel", &candidates(), 2).await;
    assert_eq!(second.status, RerankStatus::Cached);
    assert_eq!(second.results, first.results);
    assert_eq!(provider.call_count(), 1);

    let stats = stage.stats();
    assert_eq!(stats.rerank_calls, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.documents_reranked, 3);
    assert!((stats.cache_hit_rate - 0.5).abs() < 1e-12);
}

#[tokio::test]
async fn test_stage_cache_key_includes_top_k() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let stage = stage_over(provider.clone(), &RerankerConfig::default());

    stage.rerank("slack", &candidates(), 3).await;
    let narrower = stage.rerank("slack", &candidates(), 1).await;
    assert_eq!(narrower.status, RerankStatus::Reranked);
    assert_eq!(narrower.results.len(), 1);
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_stage_applies_score_threshold() {
    // inner reranker keeps everything; the stage threshold must still apply
    let config = RerankerConfig::default().with_min_score_threshold(0.6);
    let stage = stage_over(Arc::new(KeywordProvider::new()), &config);

    let outcome = stage.rerank("slack channel", &candidates(), 3).await;
    assert_eq!(outcome.status, RerankStatus::Reranked);
    assert_eq!(ids(&outcome.results), vec!["b"]);

    let cached = stage.rerank("slack channel", &candidates(), 3).await;
    assert_eq!(cached.status, RerankStatus::Cached);
    assert_eq!(ids(&cached.results), vec!["b"]);
}

#[tokio::test]
async fn test_stage_threshold_skips_fallback() {
    let config = RerankerConfig::default().with_min_score_threshold(0.99);
    let stage = stage_over(Arc::new(MockEmbeddingProvider::new().failing()), &config);
    let input = candidates();

    let outcome = stage.rerank("slack", &input, 3).await;
    assert_eq!(outcome.status, RerankStatus::Fallback);
    assert_eq!(outcome.results, input);
}

#[tokio::test]
async fn test_stage_fallback_on_error() {
    let stage = stage_over(
        Arc::new(MockEmbeddingProvider::new().failing()),
        &RerankerConfig::default(),
    );
    let input = candidates();

    let outcome = stage.rerank("slack", &input, 2).await;
    assert_eq!(outcome.status, RerankStatus::Fallback);
    assert!(!outcome.status.is_reranked());
    assert_eq!(outcome.results, input[..2].to_vec());

    let stats = stage.stats();
    assert_eq!(stats.fallbacks, 1);
    assert_eq!(stats.timeouts, 0);
}

#[tokio::test]
async fn test_stage_failures_are_not_cached() {
    let provider = Arc::new(MockEmbeddingProvider::new().failing());
    let stage = stage_over(provider.clone(), &RerankerConfig::default());

    stage.rerank("slack", &candidates(), 2).await;
    provider.set_failing(false);
    let outcome = stage.rerank("slack", &candidates(), 2).await;
    assert_eq!(outcome.status, RerankStatus::Reranked);
}

#[tokio::test(start_paused = true)]
async fn test_stage_timeout_falls_back() {
    let provider = Arc::new(MockEmbeddingProvider::new().with_delay(Duration::from_secs(30)));
    let config = RerankerConfig::default().with_timeout(Duration::from_millis(100));
    let stage = stage_over(provider, &config);
    let input = candidates();

    let outcome = stage.rerank("slack", &input, 3).await;
    assert_eq!(outcome.status, RerankStatus::Fallback);
    assert_eq!(outcome.results, input);

    let stats = stage.stats();
    assert_eq!(stats.timeouts, 1);
    assert_eq!(stats.fallbacks, 1);
}

#[tokio::test]
async fn test_stage_disabled_passthrough() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let stage = stage_over(
        provider.clone(),
        &RerankerConfig::default().with_enabled(false),
    );

    let outcome = stage.rerank("slack", &candidates(), 2).await;
    assert_eq!(outcome.status, RerankStatus::Disabled);
    assert_eq!(ids(&outcome.results), vec!["a", "b"]);
    assert_eq!(provider.call_count(), 0);

    stage.set_enabled(true);
    assert_eq!(
        stage.rerank("slack", &candidates(), 2).await.status,
        RerankStatus::Reranked
    );
}

#[tokio::test]
async fn test_stage_skips_empty() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let stage = stage_over(provider.clone(), &RerankerConfig::default());
    let outcome = stage.rerank("slack", &[], 5).await;
    assert_eq!(outcome.status, RerankStatus::Skipped);
    assert!(outcome.results.is_empty());
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_stage_score_improvement_and_reset() {
    let stage = stage_over(Arc::new(KeywordProvider::new()), &RerankerConfig::default());
    let input = vec![
        RerankedDocument::new(Document::new("b", "Slack channel messages"), 0.25),
        RerankedDocument::new(Document::new("c", "Slack workflow"), 0.25),
    ];

    stage.rerank("slack channel", &input, 1).await;
    // reranked top-1 scores 1.0, input mean 0.25
    assert!((stage.stats().average_score_improvement - 0.75).abs() < 1e-9);

    stage.reset_stats();
    assert_eq!(stage.stats(), RerankStats::default());
}

#[tokio::test]
async fn test_stage_clear_cache() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let stage = stage_over(provider.clone(), &RerankerConfig::default());

    stage.rerank("slack", &candidates(), 2).await;
    stage.clear_cache();
    let outcome = stage.rerank("slack", &candidates(), 2).await;
    assert_eq!(outcome.status, RerankStatus::Reranked);
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_stage_without_cache() {
    let provider = Arc::new(MockEmbeddingProvider::new());
    let stage = stage_over(
        provider.clone(),
        &RerankerConfig::default().with_cache_capacity(0),
    );

    stage.rerank("slack", &candidates(), 2).await;
    stage.rerank("slack", &candidates(), 2).await;
    assert_eq!(provider.call_count(), 2);
    assert_eq!(stage.stats().cache_misses, 0);
}

#[test]
fn test_from_fusion_carries_scores() {
    use crate::fusion::FusionScore;

    let fused = FusionScore {
        document: Document::new("d", "text"),
        combined_score: 0.03,
        vector_rank: Some(1),
        bm25_rank: None,
        vector_score: Some(0.8),
        bm25_score: None,
    };
    let candidate = RerankedDocument::from_fusion(&fused);
    assert_eq!(candidate.final_score, 0.03);
    assert_eq!(candidate.vector_score, 0.8);
    assert_eq!(candidate.bm25_score, 0.0);
    assert_eq!(RerankedDocument::from(fused), candidate);
}
