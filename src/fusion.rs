//! Rank fusion of vector and BM25 result lists.
//!
//! Two strategies merge the sources into one list keyed by document id:
//!
//! ```ascii
//! RRF:       score(d) = Σ_{s ∋ d} 1 / (k + rank_s(d))
//!
//! Weighted:  score(d) = vw × v(d)/max(max_v, 1) + bw × b(d)/max(max_b, 1)
//!            (each normalized term clamped to ≥ 0, missing source = 0)
//! ```
//!
//! RRF needs no score normalization, which makes it robust when the two
//! sources use unrelated scales. Weighted fusion keeps score magnitudes
//! but is only meaningful when the sources are roughly calibrated.
//!
//! When a document appears in both lists the vector-side copy is kept.
//! A source contributes one term per document: repeated ids within a list
//! (chunked stores, duplicated corpus entries) count at their best rank only.
//! Ties keep first-appearance order: the vector list first, then BM25.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::document::Document;
use crate::ranking::RankedList;

/// Default RRF smoothing constant.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Strategy used to merge the two sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMethod {
    /// Reciprocal Rank Fusion.
    #[default]
    Rrf,
    /// Weighted sum of max-normalized scores.
    Weighted,
}

impl fmt::Display for FusionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rrf => write!(f, "rrf"),
            Self::Weighted => write!(f, "weighted"),
        }
    }
}

/// A fused document with per-source provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionScore {
    pub document: Document,
    pub combined_score: f64,
    /// 1-indexed rank in the vector list, if present there.
    pub vector_rank: Option<usize>,
    /// 1-indexed rank in the BM25 list, if present there.
    pub bm25_rank: Option<usize>,
    /// Raw score (RRF) or normalized score (weighted) from the vector list.
    pub vector_score: Option<f64>,
    /// Raw score (RRF) or normalized score (weighted) from the BM25 list.
    pub bm25_score: Option<f64>,
}

impl FusionScore {
    fn new(document: Document) -> Self {
        Self {
            document,
            combined_score: 0.0,
            vector_rank: None,
            bm25_rank: None,
            vector_score: None,
            bm25_score: None,
        }
    }
}

/// Insertion-ordered accumulator keyed by document id.
struct Accumulator {
    entries: Vec<FusionScore>,
    index: HashMap<String, usize>,
}

impl Accumulator {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Entry for a document, inserting it on first sight.
    fn entry(&mut self, document: &Document) -> &mut FusionScore {
        let idx = match self.index.get(&document.id) {
            Some(&idx) => idx,
            None => {
                let idx = self.entries.len();
                self.index.insert(document.id.clone(), idx);
                self.entries.push(FusionScore::new(document.clone()));
                idx
            }
        };
        &mut self.entries[idx]
    }

    /// Sort by descending score; the stable sort keeps first-appearance order on ties.
    fn into_sorted(self) -> Vec<FusionScore> {
        let mut indexed: Vec<(usize, FusionScore)> = self.entries.into_iter().enumerate().collect();
        indexed.sort_by(|(ia, a), (ib, b)| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(Ordering::Equal)
                .then(ia.cmp(ib))
        });
        indexed.into_iter().map(|(_, score)| score).collect()
    }
}

/// Reciprocal Rank Fusion of the two lists.
///
/// # Example
///
/// ```
/// use edgequake_retrieval::{reciprocal_rank_fusion, Document, RankedList, RetrievalSource};
///
/// let vector = RankedList::from_scored(
///     RetrievalSource::Vector,
///     vec![(Document::new("a", "alpha"), 0.9), (Document::new("b", "bravo"), 0.8)],
/// );
/// let bm25 = RankedList::from_scored(RetrievalSource::Bm25, vec![(Document::new("b", "bravo"), 3.0)]);
///
/// let fused = reciprocal_rank_fusion(&vector, &bm25, 60.0);
/// assert_eq!(fused[0].document.id, "b");
/// assert!((fused[0].combined_score - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-12);
/// ```
pub fn reciprocal_rank_fusion(vector: &RankedList, bm25: &RankedList, k: f64) -> Vec<FusionScore> {
    let mut acc = Accumulator::with_capacity(vector.len() + bm25.len());

    for item in vector {
        let entry = acc.entry(&item.document);
        if entry.vector_rank.is_some() {
            continue;
        }
        entry.combined_score += 1.0 / (k + item.rank as f64);
        entry.vector_rank = Some(item.rank);
        entry.vector_score = Some(item.score);
    }
    for item in bm25 {
        let entry = acc.entry(&item.document);
        if entry.bm25_rank.is_some() {
            continue;
        }
        entry.combined_score += 1.0 / (k + item.rank as f64);
        entry.bm25_rank = Some(item.rank);
        entry.bm25_score = Some(item.score);
    }

    acc.into_sorted()
}

/// Weighted fusion of max-normalized source scores.
///
/// Combined scores lie in `[0, vector_weight + bm25_weight]`.
pub fn weighted_fusion(
    vector: &RankedList,
    bm25: &RankedList,
    vector_weight: f64,
    bm25_weight: f64,
) -> Vec<FusionScore> {
    let max_vector = vector.max_score().unwrap_or(1.0).max(1.0);
    let max_bm25 = bm25.max_score().unwrap_or(1.0).max(1.0);

    let mut acc = Accumulator::with_capacity(vector.len() + bm25.len());

    for item in vector {
        let normalized = (item.score / max_vector).max(0.0);
        let entry = acc.entry(&item.document);
        if entry.vector_rank.is_some() {
            continue;
        }
        entry.combined_score += vector_weight * normalized;
        entry.vector_rank = Some(item.rank);
        entry.vector_score = Some(normalized);
    }
    for item in bm25 {
        let normalized = (item.score / max_bm25).max(0.0);
        let entry = acc.entry(&item.document);
        if entry.bm25_rank.is_some() {
            continue;
        }
        entry.combined_score += bm25_weight * normalized;
        entry.bm25_rank = Some(item.rank);
        entry.bm25_score = Some(normalized);
    }

    acc.into_sorted()
}

/// Parameters for [`fuse`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionParams {
    pub rrf_k: f64,
    pub vector_weight: f64,
    pub bm25_weight: f64,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            vector_weight: 0.6,
            bm25_weight: 0.4,
        }
    }
}

/// Fuse with the given method.
pub fn fuse(
    method: FusionMethod,
    vector: &RankedList,
    bm25: &RankedList,
    params: FusionParams,
) -> Vec<FusionScore> {
    match method {
        FusionMethod::Rrf => reciprocal_rank_fusion(vector, bm25, params.rrf_k),
        FusionMethod::Weighted => {
            weighted_fusion(vector, bm25, params.vector_weight, params.bm25_weight)
        }
    }
}
