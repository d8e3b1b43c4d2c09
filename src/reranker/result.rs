//! Reranking result types.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::fusion::FusionScore;

/// A candidate flowing through the rerank stage.
///
/// Before reranking `final_score` holds the fusion score; afterwards it
/// holds the reranker's relevance score.
///
/// # Fields
///
/// - `final_score`: Score used for ordering (higher = more relevant)
/// - `vector_score`: Dense similarity component, when known
/// - `bm25_score`: Lexical component, when known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankedDocument {
    pub document: Document,
    pub final_score: f64,
    pub vector_score: f64,
    pub bm25_score: f64,
}

impl RerankedDocument {
    /// Create a candidate with only a final score.
    pub fn new(document: Document, final_score: f64) -> Self {
        Self {
            document,
            final_score,
            vector_score: 0.0,
            bm25_score: 0.0,
        }
    }

    /// Carry a fused document into the rerank stage.
    pub fn from_fusion(fused: &FusionScore) -> Self {
        Self {
            document: fused.document.clone(),
            final_score: fused.combined_score,
            vector_score: fused.vector_score.unwrap_or(0.0),
            bm25_score: fused.bm25_score.unwrap_or(0.0),
        }
    }
}

impl From<FusionScore> for RerankedDocument {
    fn from(fused: FusionScore) -> Self {
        Self {
            final_score: fused.combined_score,
            vector_score: fused.vector_score.unwrap_or(0.0),
            bm25_score: fused.bm25_score.unwrap_or(0.0),
            document: fused.document,
        }
    }
}

/// Mean `final_score` of a slice; 0.0 when empty.
pub(crate) fn mean_score(docs: &[RerankedDocument]) -> f64 {
    if docs.is_empty() {
        0.0
    } else {
        docs.iter().map(|d| d.final_score).sum::<f64>() / docs.len() as f64
    }
}
