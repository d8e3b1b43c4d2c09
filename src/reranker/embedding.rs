//! Embedding (bi-encoder) reranker.
//!
//! ```ascii
//! [query, c1, c2, …, cn] ──embed (one batch)──► [q, e1, e2, …, en]
//!                                                   │
//!                            score_i = cos(q, e_i) ◄┘
//!                                   │
//!                  filter ≥ threshold, sort desc, take top_k
//! ```

use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use super::result::RerankedDocument;
use super::traits::Reranker;
use crate::error::RerankError;
use crate::similarity::cosine_similarity;
use crate::traits::EmbeddingProvider;

/// Embed the query with every candidate in one call and return each
/// candidate's cosine similarity to the query, in input order.
pub(crate) async fn cosine_scores(
    provider: &dyn EmbeddingProvider,
    query: &str,
    candidates: &[RerankedDocument],
) -> Result<Vec<f64>, RerankError> {
    let mut texts = Vec::with_capacity(candidates.len() + 1);
    texts.push(query.to_string());
    texts.extend(candidates.iter().map(|c| c.document.text.clone()));

    let embeddings = provider.embed(&texts).await?;
    if embeddings.len() != texts.len() {
        return Err(RerankError::EmbeddingCountMismatch {
            expected: texts.len(),
            got: embeddings.len(),
        });
    }

    let (query_vector, doc_vectors) = embeddings.split_at(1);
    let query_vector = &query_vector[0];
    doc_vectors
        .iter()
        .map(|v| {
            if v.len() != query_vector.len() {
                Err(RerankError::DimensionMismatch {
                    expected: query_vector.len(),
                    got: v.len(),
                })
            } else {
                Ok(cosine_similarity(query_vector, v))
            }
        })
        .collect()
}

/// Drop results below `threshold`, sort by descending `final_score` and
/// keep `top_k`. The sort is stable, so ties keep input order.
pub(crate) fn rank_and_truncate(
    mut results: Vec<RerankedDocument>,
    threshold: f64,
    top_k: usize,
) -> Vec<RerankedDocument> {
    results.retain(|r| r.final_score >= threshold);
    results.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(Ordering::Equal)
    });
    results.truncate(top_k);
    results
}

/// Reranker scoring candidates by cosine similarity to the query.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use edgequake_retrieval::{MockEmbeddingProvider, reranker::{EmbeddingReranker, Reranker}};
///
/// let reranker = EmbeddingReranker::new(Arc::new(MockEmbeddingProvider::new()));
/// let results = reranker.rerank("slack alerts", &candidates, 5).await?;
/// ```
pub struct EmbeddingReranker {
    provider: Arc<dyn EmbeddingProvider>,
    min_score_threshold: f64,
}

impl EmbeddingReranker {
    /// Create a reranker over an embedding provider.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            min_score_threshold: 0.0,
        }
    }

    /// Drop results scoring below `threshold`.
    pub fn with_min_score_threshold(mut self, threshold: f64) -> Self {
        self.min_score_threshold = threshold;
        self
    }
}

#[async_trait]
impl Reranker for EmbeddingReranker {
    fn name(&self) -> &str {
        "embedding"
    }

    fn model(&self) -> &str {
        self.provider.model()
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

        let scores = cosine_scores(self.provider.as_ref(), query, candidates).await?;

        let results: Vec<RerankedDocument> = candidates
            .iter()
            .zip(scores)
            .map(|(candidate, score)| RerankedDocument {
                document: candidate.document.clone(),
                final_score: score,
                vector_score: score,
                bm25_score: candidate.bm25_score,
            })
            .collect();

        debug!(
            "Embedding rerank of {} candidates with {}",
            candidates.len(),
            self.provider.model()
        );

        Ok(rank_and_truncate(results, self.min_score_threshold, top_k))
    }
}
