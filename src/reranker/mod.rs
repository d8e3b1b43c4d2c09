//! Second-stage reranking of fused candidates.
//!
//! # Architecture
//!
//! ```ascii
//!                    ┌─────────────────────────────┐
//!                    │   Query + fused candidates  │
//!                    └──────────────┬──────────────┘
//!                                   │
//!                                   ▼
//!     ┌─────────────────────────────────────────────────────┐
//!     │                    RerankStage                       │
//!     │   enabled? ─ cache ─ timeout ─ fallback ─ stats      │
//!     └──────────────────────────┬──────────────────────────┘
//!                                │
//!                                ▼
//!     ┌─────────────────────────────────────────────────────┐
//!     │                  Reranker Trait                      │
//!     │  rerank(query, candidates, top_k) → Vec<Reranked..>  │
//!     └──────────────────────────┬──────────────────────────┘
//!                                │
//!                ┌───────────────┴───────────────┐
//!                ▼                               ▼
//!     ┌───────────────────┐           ┌──────────────────┐
//!     │ EmbeddingReranker │           │  HybridReranker  │
//!     └───────────────────┘           └──────────────────┘
//! ```
//!
//! # Module Structure
//!
//! ```ascii
//! reranker/
//! ├── mod.rs        ─► This file (re-exports)
//! ├── config.rs     ─► RerankerConfig
//! ├── result.rs     ─► RerankedDocument
//! ├── traits.rs     ─► Reranker trait
//! ├── embedding.rs  ─► EmbeddingReranker
//! ├── hybrid.rs     ─► HybridReranker
//! ├── cache.rs      ─► RerankCache (LRU)
//! └── stage.rs      ─► RerankStage, RerankStatus, RerankStats
//! ```

mod cache;
mod config;
mod embedding;
mod hybrid;
mod result;
mod stage;
mod traits;

pub use cache::RerankCache;
pub use config::RerankerConfig;
pub use embedding::EmbeddingReranker;
pub use hybrid::HybridReranker;
pub use result::RerankedDocument;
pub use stage::{RerankOutcome, RerankStage, RerankStats, RerankStatus};
pub use traits::Reranker;

#[cfg(test)]
mod tests;
