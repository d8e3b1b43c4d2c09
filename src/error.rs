//! Error types for hybrid retrieval.
//!
//! # Error Taxonomy
//!
//! | Error | Raised by | Visible to caller? |
//! |-------|-----------|--------------------|
//! | [`RetrievalError`] | Mandatory vector source, BM25 worker | Yes, propagated unchanged |
//! | [`EmbeddingError`] | [`crate::EmbeddingProvider`] implementations | Only through retrievers that embed queries |
//! | [`RerankError`] | [`crate::reranker::Reranker`] implementations | No, converted to a fallback by [`crate::reranker::RerankStage`] |
//! | [`ConfigError`] | [`crate::RetrievalConfig::validate`] | Yes, at construction only |
//!
//! Nothing in this crate retries. Retry policy belongs to the collaborator
//! that owns the network call (vector store client, embedding provider).

use std::time::Duration;
use thiserror::Error;

/// Result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

// ============================================================================
// Retrieval Errors
// ============================================================================

/// Errors that fail a retrieval call.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The mandatory vector source failed.
    #[error("Vector search failed: {0}")]
    VectorSearch(String),

    /// The query could not be embedded for dense search.
    #[error("Query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// A background retrieval task panicked or was aborted.
    #[error("Retrieval task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for RetrievalError {
    fn from(err: tokio::task::JoinError) -> Self {
        RetrievalError::Task(err.to_string())
    }
}

// ============================================================================
// Embedding Provider Errors
// ============================================================================

/// Errors returned by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// API error from the provider.
    #[error("API error: {0}")]
    ApiError(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Network error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Provider answered with something unusable.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Provider is misconfigured (missing key, bad URL).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EmbeddingError::Timeout
        } else if err.is_connect() {
            EmbeddingError::NetworkError(format!("Connection failed: {}", err))
        } else {
            EmbeddingError::NetworkError(err.to_string())
        }
    }
}

impl EmbeddingError {
    /// Whether the failure is likely to go away on its own.
    ///
    /// The rerank stage uses this to pick a log level; it falls back either way.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::NetworkError(_) | Self::Timeout
        ) || matches!(self, Self::ApiError(msg) if msg.contains("500") || msg.contains("502") || msg.contains("503"))
    }
}

// ============================================================================
// Rerank Errors
// ============================================================================

/// Errors raised while reranking a candidate set.
///
/// These never reach the caller of [`crate::HybridRetriever::retrieve`].
#[derive(Debug, Error)]
pub enum RerankError {
    /// The embedding provider failed.
    #[error("Embedding provider failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The reranker did not finish within its deadline.
    #[error("Reranking timed out after {0:?}")]
    Timeout(Duration),

    /// The provider returned a different number of vectors than requested.
    #[error("Expected {expected} embeddings, got {got}")]
    EmbeddingCountMismatch { expected: usize, got: usize },

    /// Two embeddings had different lengths.
    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl RerankError {
    /// Whether a retry later could succeed: deadlines and transient
    /// provider failures are, malformed provider output is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Embedding(e) => e.is_transient(),
            Self::Timeout(_) => true,
            Self::EmbeddingCountMismatch { .. } | Self::DimensionMismatch { .. } => false,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Errors raised while loading or validating a [`crate::RetrievalConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A fusion or reranker weight is negative or not finite.
    #[error("Invalid weight for {name}: {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    /// A parameter is outside its allowed range.
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    /// `final_k` must not exceed `initial_k`.
    #[error("final_k ({final_k}) must not exceed initial_k ({initial_k})")]
    FinalKExceedsInitialK { final_k: usize, initial_k: usize },

    /// Failed to parse TOML configuration.
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// Failed to read configuration file.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}
