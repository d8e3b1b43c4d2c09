//! In-memory dense retriever.
//!
//! Embeds its corpus through an [`EmbeddingProvider`] on first use and
//! answers queries with brute-force cosine similarity. Suitable for small
//! knowledge bases, demos and tests; it also exposes the corpus so the
//! orchestrator can run BM25 over the same documents.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::document::Document;
use crate::error::{RetrievalError, Result};
use crate::ranking::{RankedList, RetrievalSource};
use crate::similarity::cosine_similarity;
use crate::traits::{EmbeddingProvider, SearchOptions, VectorRetriever};

/// Brute-force cosine retriever over an in-memory corpus.
pub struct InMemoryVectorRetriever {
    provider: Arc<dyn EmbeddingProvider>,
    corpus: Arc<[Document]>,
    embeddings: OnceCell<Vec<Vec<f32>>>,
}

impl InMemoryVectorRetriever {
    /// Create a retriever; embeddings are computed on the first search.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, documents: Vec<Document>) -> Self {
        Self {
            provider,
            corpus: documents.into(),
            embeddings: OnceCell::new(),
        }
    }

    /// Number of documents in the corpus.
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    async fn corpus_embeddings(&self) -> Result<&Vec<Vec<f32>>> {
        self.embeddings
            .get_or_try_init(|| async {
                let texts: Vec<String> = self.corpus.iter().map(|d| d.text.clone()).collect();
                let vectors = self.provider.embed(&texts).await?;
                if vectors.len() != texts.len() {
                    return Err(RetrievalError::VectorSearch(format!(
                        "provider returned {} embeddings for {} documents",
                        vectors.len(),
                        texts.len()
                    )));
                }
                debug!(
                    "Embedded {} corpus documents with {}",
                    vectors.len(),
                    self.provider.model()
                );
                Ok(vectors)
            })
            .await
    }
}

/// Every filter entry must equal the document's metadata value.
fn matches_filters(document: &Document, filters: Option<&Map<String, Value>>) -> bool {
    filters.map_or(true, |filters| {
        filters
            .iter()
            .all(|(key, expected)| document.metadata.get(key) == Some(expected))
    })
}

#[async_trait]
impl VectorRetriever for InMemoryVectorRetriever {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<RankedList> {
        if self.corpus.is_empty() || options.limit == 0 {
            return Ok(RankedList::empty(RetrievalSource::Vector));
        }

        let embeddings = self.corpus_embeddings().await?;
        let query_vector = self.provider.embed_one(query).await?;

        let mut scored = Vec::with_capacity(self.corpus.len());
        for (idx, (document, vector)) in self.corpus.iter().zip(embeddings).enumerate() {
            if !matches_filters(document, options.filters.as_ref()) {
                continue;
            }
            if vector.len() != query_vector.len() {
                return Err(RetrievalError::VectorSearch(format!(
                    "dimension mismatch: query {} vs document {}",
                    query_vector.len(),
                    vector.len()
                )));
            }
            scored.push((idx, cosine_similarity(&query_vector, vector)));
        }

        scored.sort_by(|(ia, a), (ib, b)| {
            b.partial_cmp(a).unwrap_or(Ordering::Equal).then(ia.cmp(ib))
        });
        scored.truncate(options.limit);

        Ok(RankedList::from_scored(
            RetrievalSource::Vector,
            scored
                .into_iter()
                .map(|(idx, score)| (self.corpus[idx].clone(), score)),
        ))
    }

    fn document_corpus(&self) -> Option<Arc<[Document]>> {
        Some(Arc::clone(&self.corpus))
    }
}
