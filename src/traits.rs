//! Collaborator traits for hybrid retrieval.
//!
//! # Key Traits
//!
//! - [`EmbeddingProvider`]: Vector embedding generation, used by rerankers
//!   and by [`crate::providers::InMemoryVectorRetriever`]
//! - [`VectorRetriever`]: Dense similarity search against a knowledge base
//!
//! Both traits are object safe and are held as `Arc<dyn ...>` so one
//! provider can back several retrievers and rerankers at once.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::document::Document;
use crate::error::{EmbeddingError, Result};
use crate::ranking::RankedList;

// ============================================================================
// Embeddings
// ============================================================================

/// Trait for providers that can generate text embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the embedding model.
    fn model(&self) -> &str;

    /// Get the dimension of the embeddings.
    fn dimension(&self) -> usize;

    /// Get the maximum number of tokens per input.
    fn max_tokens(&self) -> usize;

    /// Generate embeddings for a batch of texts, one vector per input in order.
    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Generate embedding for a single text.
    async fn embed_one(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        let results = self.embed(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("Empty embedding result".to_string()))
    }
}

// ============================================================================
// Vector Search
// ============================================================================

/// Options forwarded to a vector search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of hits to return.
    pub limit: usize,
    /// Store-specific metadata filters, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Map<String, Value>>,
}

impl SearchOptions {
    /// Options with a limit and no filters.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            filters: None,
        }
    }

    /// Attach metadata filters.
    pub fn with_filters(mut self, filters: Map<String, Value>) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// Dense retrieval over a knowledge base.
///
/// Implementations return hits best first; ranks are assigned by
/// [`RankedList::from_scored`].
#[async_trait]
pub trait VectorRetriever: Send + Sync {
    /// Search for the documents most similar to `query`.
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<RankedList>;

    /// The full document collection, when the retriever can expose it.
    ///
    /// Used as the BM25 corpus when the caller does not pass one.
    fn document_corpus(&self) -> Option<Arc<[Document]>> {
        None
    }
}
