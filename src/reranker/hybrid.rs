//! Hybrid reranker combining BM25 with vector similarity.
//!
//! # Architecture
//!
//! ```ascii
//! ┌─────────────┐                 ┌─────────────┐
//! │    Query    │                 │ Candidates  │
//! └──────┬──────┘                 └──────┬──────┘
//!        ├───────────────┬───────────────┤
//!        ▼               │               ▼
//! ┌──────────────┐       │        ┌──────────────┐
//! │ embed batch  │       └──────► │ BM25 over    │
//! │ cos(q, c_i)  │                │ candidates   │
//! └──────┬───────┘                └──────┬───────┘
//!        ▼                               ▼
//!   v_i / max(v)                    l_i / max(l)     (negatives → 0)
//!        └───────────────┬───────────────┘
//!                        ▼
//!          final = vw × v_i + bw × l_i
//! ```
//!
//! BM25 statistics (N, df, avgdl) come from the candidate set alone, so
//! lexical scores are relative to what the first stage retrieved.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::config::RerankerConfig;
use super::embedding::{cosine_scores, rank_and_truncate};
use super::result::RerankedDocument;
use super::traits::Reranker;
use crate::bm25::Bm25Engine;
use crate::error::RerankError;
use crate::traits::EmbeddingProvider;

/// Scale scores into `[0, 1]`: negatives become 0, the rest are divided
/// by the maximum when it is positive.
fn normalize(scores: &mut [f64]) {
    for score in scores.iter_mut() {
        *score = score.max(0.0);
    }
    let max = scores.iter().copied().fold(0.0f64, f64::max);
    if max > 0.0 {
        for score in scores.iter_mut() {
            *score /= max;
        }
    }
}

/// Hybrid reranker: weighted cosine similarity plus local BM25.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use edgequake_retrieval::{MockEmbeddingProvider, reranker::HybridReranker};
///
/// let reranker = HybridReranker::new(Arc::new(MockEmbeddingProvider::new()))
///     .with_weights(0.5, 0.5);
/// ```
pub struct HybridReranker {
    provider: Arc<dyn EmbeddingProvider>,
    bm25: Bm25Engine,
    vector_weight: f64,
    bm25_weight: f64,
    min_score_threshold: f64,
    model: String,
}

impl HybridReranker {
    /// Create a hybrid reranker with default weights (0.7 vector, 0.3 BM25).
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::from_config(provider, &RerankerConfig::default())
    }

    /// Create from a reranker configuration.
    pub fn from_config(provider: Arc<dyn EmbeddingProvider>, config: &RerankerConfig) -> Self {
        let model = format!("hybrid:{}", provider.model());
        Self {
            provider,
            bm25: Bm25Engine::new(),
            vector_weight: config.vector_weight,
            bm25_weight: config.bm25_weight,
            min_score_threshold: config.min_score_threshold,
            model,
        }
    }

    /// Set the vector and BM25 weights.
    pub fn with_weights(mut self, vector_weight: f64, bm25_weight: f64) -> Self {
        self.vector_weight = vector_weight;
        self.bm25_weight = bm25_weight;
        self
    }

    /// Use a BM25 engine with custom parameters.
    pub fn with_bm25(mut self, bm25: Bm25Engine) -> Self {
        self.bm25 = bm25;
        self
    }

    /// Drop results scoring below `threshold`.
    pub fn with_min_score_threshold(mut self, threshold: f64) -> Self {
        self.min_score_threshold = threshold;
        self
    }

    /// `(vector_weight, bm25_weight)`.
    pub fn weights(&self) -> (f64, f64) {
        (self.vector_weight, self.bm25_weight)
    }

    /// Engine used for candidate-local BM25.
    pub fn bm25(&self) -> &Bm25Engine {
        &self.bm25
    }

    /// Minimum final score kept.
    pub fn min_score_threshold(&self) -> f64 {
        self.min_score_threshold
    }
}

#[async_trait]
impl Reranker for HybridReranker {
    fn name(&self) -> &str {
        "hybrid"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn rerank(
        &self,
        query: &str,
        candidates: &[RerankedDocument],
        top_k: usize,
    ) -> Result<Vec<RerankedDocument>, RerankError> {
        if candidates.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let mut vector_scores = cosine_scores(self.provider.as_ref(), query, candidates).await?;
        let texts: Vec<&str> = candidates.iter().map(|c| c.document.text.as_str()).collect();
        let mut lexical_scores = self.bm25.score_texts(query, &texts);

        normalize(&mut vector_scores);
        normalize(&mut lexical_scores);

        let results: Vec<RerankedDocument> = candidates
            .iter()
            .zip(vector_scores.into_iter().zip(lexical_scores))
            .map(|(candidate, (v, l))| RerankedDocument {
                document: candidate.document.clone(),
                final_score: self.vector_weight * v + self.bm25_weight * l,
                vector_score: v,
                bm25_score: l,
            })
            .collect();

        debug!(
            "Hybrid rerank of {} candidates (vw={}, bw={})",
            candidates.len(),
            self.vector_weight,
            self.bm25_weight
        );

        Ok(rank_and_truncate(results, self.min_score_threshold, top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        let mut scores = vec![-0.5, 0.25, 0.5];
        normalize(&mut scores);
        assert_eq!(scores, vec![0.0, 0.5, 1.0]);

        let mut zeros = vec![0.0, -1.0];
        normalize(&mut zeros);
        assert_eq!(zeros, vec![0.0, 0.0]);
    }
}
