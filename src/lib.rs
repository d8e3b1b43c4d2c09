//! EdgeQuake Retrieval - Hybrid Dense/Lexical Retrieval and Reranking
//!
//! This crate provides:
//! - BM25 lexical scoring over in-memory corpora
//! - Rank fusion of vector and BM25 results (RRF or weighted)
//! - Embedding and hybrid rerankers behind a cached, time-bounded stage
//! - MMR diversity selection
//! - A [`HybridRetriever`] orchestrating the whole pipeline
//!
//! # Pipeline
//!
//! ```ascii
//! query ──► VectorRetriever ─┐
//!       └─► BM25 ────────────┴─► fuse ─► rerank (optional) ─► MMR (optional) ─► results
//! ```
//!
//! # Failure Model
//!
//! | Stage | On failure |
//! |-------|------------|
//! | Vector search | Call fails with [`RetrievalError`] |
//! | BM25 | Cannot fail (pure, in-memory) |
//! | Reranker | Logged, fusion order kept, `reranked = false` |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edgequake_retrieval::{
//!     HybridRetriever, InMemoryVectorRetriever, MockEmbeddingProvider, RetrievalConfig,
//!     RetrieveOptions,
//! };
//!
//! let provider = Arc::new(MockEmbeddingProvider::new());
//! let vector = Arc::new(InMemoryVectorRetriever::new(provider, documents));
//! let retriever = HybridRetriever::new(vector, None, RetrievalConfig::default())?;
//! let response = retriever.retrieve("webhook slack", RetrieveOptions::new()).await?;
//! ```
//!
//! # See Also
//!
//! - [`crate::traits`] for collaborator trait definitions
//! - [`crate::providers`] for concrete implementations
//! - [`crate::reranker`] for reranking and its failure policy

pub mod bm25;
pub mod config;
pub mod diversity;
pub mod document;
pub mod error;
pub mod fusion;
pub mod hybrid;
pub mod providers;
pub mod ranking;
pub mod reranker;
pub mod similarity;
pub mod stats;
pub mod tokenizer;
pub mod traits;

pub use bm25::Bm25Engine;
pub use config::RetrievalConfig;
pub use diversity::MmrSelector;
pub use document::{Document, TextExtractable};
pub use error::{ConfigError, EmbeddingError, RerankError, Result, RetrievalError};
pub use fusion::{
    fuse, reciprocal_rank_fusion, weighted_fusion, FusionMethod, FusionParams, FusionScore,
};
pub use hybrid::{HybridRetriever, RetrievalMetadata, RetrievalResponse, RetrieveOptions};
pub use providers::{InMemoryVectorRetriever, MockEmbeddingProvider, OpenAIEmbeddingProvider};
pub use ranking::{RankedList, RetrievalSource, ScoredDocument};
pub use reranker::{
    EmbeddingReranker, HybridReranker, RerankOutcome, RerankStage, RerankStats, RerankStatus,
    RerankedDocument, Reranker, RerankerConfig,
};
pub use similarity::{cosine_similarity, jaccard_similarity};
pub use stats::{RetrievalStats, RetrievalStatsSnapshot, StatsConfigSummary};
pub use tokenizer::{tokenize, Tokenizer, TokenizerConfig};
pub use traits::{EmbeddingProvider, SearchOptions, VectorRetriever};
