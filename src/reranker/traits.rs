//! Reranker trait definition.
//!
//! # Architecture
//!
//! ```ascii
//!                      ┌─────────────────┐
//!                      │  Reranker Trait │
//!                      └────────┬────────┘
//!                               │
//!               ┌───────────────┴───────────────┐
//!               ▼                               ▼
//!     ┌───────────────────┐           ┌──────────────────┐
//!     │ EmbeddingReranker │           │  HybridReranker  │
//!     │ (cosine only)     │           │ (cosine + BM25)  │
//!     └───────────────────┘           └──────────────────┘
//! ```
//!
//! Rerankers are allowed to fail. Callers that need a result regardless
//! wrap them in [`super::RerankStage`].

use async_trait::async_trait;

use super::result::RerankedDocument;
use crate::error::RerankError;

/// Trait for reranking providers.
///
/// # Required Methods
///
/// - [`name`](Reranker::name) - Identifier for the reranker
/// - [`model`](Reranker::model) - Model/algorithm being used
/// - [`rerank`](Reranker::rerank) - Main reranking operation
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Get the name of this reranker.
    fn name(&self) -> &str;

    /// Get the model being used.
    fn model(&self) -> &str;

    /// Rescore candidates against a query.
    ///
    /// Candidates arrive in pre-rerank order. The result is sorted by
    /// `final_score` (highest first, ties in input order) and holds at
    /// most `top_k` entries.
    async fn rerank(
        &self,
        query: &str,
        candidates: &[RerankedDocument],
        top_k: usize,
    ) -> Result<Vec<RerankedDocument>, RerankError>;
}
