//! Retrieval pipeline configuration.
//!
//! # Loading Order
//!
//! [`RetrievalConfig::load`] searches, in order:
//!
//! 1. The path in `EDGEQUAKE_RETRIEVAL_CONFIG`
//! 2. `./retrieval.toml`
//! 3. Built-in defaults
//!
//! # Example (`retrieval.toml`)
//!
//! ```toml
//! fusion_method = "weighted"
//! vector_weight = 0.7
//! bm25_weight = 0.3
//! initial_k = 30
//! final_k = 8
//! enable_diversity = true
//! diversity_lambda = 0.6
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::bm25::Bm25Engine;
use crate::error::ConfigError;
use crate::fusion::{FusionMethod, FusionParams};
use crate::reranker::{HybridReranker, RerankerConfig};
use crate::stats::StatsConfigSummary;
use crate::traits::EmbeddingProvider;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "EDGEQUAKE_RETRIEVAL_CONFIG";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "retrieval.toml";

/// Hybrid retrieval configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// How vector and BM25 lists are merged.
    pub fusion_method: FusionMethod,
    /// RRF smoothing constant.
    pub rrf_k: f64,
    /// Vector share in weighted fusion.
    pub vector_weight: f64,
    /// BM25 share in weighted fusion.
    pub bm25_weight: f64,
    /// Hits requested from each source.
    pub initial_k: usize,
    /// Maximum results returned.
    pub final_k: usize,
    pub bm25_k1: f64,
    pub bm25_b: f64,
    /// Run the reranker when one is attached.
    pub use_reranker: bool,
    /// Fused candidates passed to the reranker.
    pub reranker_top_k: usize,
    /// Apply MMR after reranking.
    pub enable_diversity: bool,
    /// MMR relevance/diversity trade-off.
    pub diversity_lambda: f64,
    /// Reranked results below this are dropped.
    pub min_score_threshold: f64,
    /// Deadline for one rerank call, in milliseconds.
    pub reranker_timeout_ms: u64,
    /// Cached rerank results (0 disables the cache).
    pub rerank_cache_capacity: usize,
    /// Cosine share in the hybrid reranker.
    pub reranker_vector_weight: f64,
    /// BM25 share in the hybrid reranker.
    pub reranker_bm25_weight: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            fusion_method: FusionMethod::Rrf,
            rrf_k: 60.0,
            vector_weight: 0.6,
            bm25_weight: 0.4,
            initial_k: 20,
            final_k: 5,
            bm25_k1: 1.5,
            bm25_b: 0.75,
            use_reranker: true,
            reranker_top_k: 10,
            enable_diversity: false,
            diversity_lambda: 0.5,
            min_score_threshold: 0.0,
            reranker_timeout_ms: 10_000,
            rerank_cache_capacity: 256,
            reranker_vector_weight: 0.7,
            reranker_bm25_weight: 0.3,
        }
    }
}

impl RetrievalConfig {
    /// Load configuration from the standard locations, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if Path::new(&path).exists() {
                return Self::from_file(&path);
            }
        }

        let local_path = Path::new(LOCAL_CONFIG_FILE);
        if local_path.exists() {
            return Self::from_file(local_path);
        }

        Ok(Self::default())
    }

    /// Load and validate configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check every parameter is within range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("vector_weight", self.vector_weight),
            ("bm25_weight", self.bm25_weight),
            ("reranker_vector_weight", self.reranker_vector_weight),
            ("reranker_bm25_weight", self.reranker_bm25_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }

        for (name, value) in [
            ("initial_k", self.initial_k),
            ("final_k", self.final_k),
            ("reranker_top_k", self.reranker_top_k),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }

        if self.final_k > self.initial_k {
            return Err(ConfigError::FinalKExceedsInitialK {
                final_k: self.final_k,
                initial_k: self.initial_k,
            });
        }

        if !self.rrf_k.is_finite() || self.rrf_k <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "rrf_k",
                reason: format!("must be a positive number, got {}", self.rrf_k),
            });
        }

        if !self.bm25_k1.is_finite() || self.bm25_k1 < 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "bm25_k1",
                reason: format!("must be non-negative, got {}", self.bm25_k1),
            });
        }

        for (name, value) in [
            ("bm25_b", self.bm25_b),
            ("diversity_lambda", self.diversity_lambda),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("must be within [0, 1], got {}", value),
                });
            }
        }

        if !self.min_score_threshold.is_finite() {
            return Err(ConfigError::InvalidValue {
                name: "min_score_threshold",
                reason: "must be finite".to_string(),
            });
        }

        if self.reranker_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "reranker_timeout_ms",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------------

    /// Set the fusion method.
    pub fn with_fusion_method(mut self, method: FusionMethod) -> Self {
        self.fusion_method = method;
        self
    }

    /// Set the RRF constant.
    pub fn with_rrf_k(mut self, k: f64) -> Self {
        self.rrf_k = k;
        self
    }

    /// Set weighted-fusion weights.
    pub fn with_fusion_weights(mut self, vector_weight: f64, bm25_weight: f64) -> Self {
        self.vector_weight = vector_weight;
        self.bm25_weight = bm25_weight;
        self
    }

    /// Set the first-stage and final result counts.
    pub fn with_k(mut self, initial_k: usize, final_k: usize) -> Self {
        self.initial_k = initial_k;
        self.final_k = final_k;
        self
    }

    /// Set BM25 parameters.
    pub fn with_bm25_params(mut self, k1: f64, b: f64) -> Self {
        self.bm25_k1 = k1;
        self.bm25_b = b;
        self
    }

    /// Enable or disable reranking.
    pub fn with_reranker(mut self, enabled: bool) -> Self {
        self.use_reranker = enabled;
        self
    }

    /// Set how many fused candidates reach the reranker.
    pub fn with_reranker_top_k(mut self, top_k: usize) -> Self {
        self.reranker_top_k = top_k;
        self
    }

    /// Enable MMR diversity with the given lambda.
    pub fn with_diversity(mut self, lambda: f64) -> Self {
        self.enable_diversity = true;
        self.diversity_lambda = lambda;
        self
    }

    /// Set the reranker score threshold.
    pub fn with_min_score_threshold(mut self, threshold: f64) -> Self {
        self.min_score_threshold = threshold;
        self
    }

    /// Set the reranker deadline.
    pub fn with_reranker_timeout(mut self, timeout: Duration) -> Self {
        self.reranker_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the rerank cache capacity.
    pub fn with_rerank_cache_capacity(mut self, capacity: usize) -> Self {
        self.rerank_cache_capacity = capacity;
        self
    }

    // ------------------------------------------------------------------------
    // Derived settings
    // ------------------------------------------------------------------------

    /// Reranker deadline as a duration.
    pub fn reranker_timeout(&self) -> Duration {
        Duration::from_millis(self.reranker_timeout_ms)
    }

    /// Settings for the rerank stage and rerankers.
    pub fn reranker_config(&self) -> RerankerConfig {
        RerankerConfig {
            enabled: self.use_reranker,
            min_score_threshold: self.min_score_threshold,
            vector_weight: self.reranker_vector_weight,
            bm25_weight: self.reranker_bm25_weight,
            timeout: self.reranker_timeout(),
            cache_capacity: self.rerank_cache_capacity,
        }
    }

    /// Parameters for [`crate::fusion::fuse`].
    pub fn fusion_params(&self) -> FusionParams {
        FusionParams {
            rrf_k: self.rrf_k,
            vector_weight: self.vector_weight,
            bm25_weight: self.bm25_weight,
        }
    }

    /// A BM25 engine with the configured parameters.
    pub fn bm25_engine(&self) -> Bm25Engine {
        Bm25Engine::with_params(self.bm25_k1, self.bm25_b)
    }

    /// A hybrid reranker using the configured reranker weights, threshold
    /// and BM25 parameters.
    pub fn hybrid_reranker(&self, provider: Arc<dyn EmbeddingProvider>) -> HybridReranker {
        HybridReranker::from_config(provider, &self.reranker_config()).with_bm25(self.bm25_engine())
    }

    pub(crate) fn stats_summary(&self) -> StatsConfigSummary {
        StatsConfigSummary {
            fusion_method: self.fusion_method,
            initial_k: self.initial_k,
            final_k: self.final_k,
            reranker_enabled: self.use_reranker,
        }
    }
}
