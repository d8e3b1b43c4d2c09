//! Ranked result lists produced by a single retrieval source.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::Document;

/// Which retrieval signal produced a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalSource {
    /// Dense vector similarity.
    Vector,
    /// Sparse lexical BM25 matching.
    Bm25,
}

impl fmt::Display for RetrievalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector => write!(f, "vector"),
            Self::Bm25 => write!(f, "bm25"),
        }
    }
}

/// A document with its source-local score and 1-indexed rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    /// Score in the source's own units; not comparable across sources.
    pub score: f64,
    /// 1-indexed position in the source list.
    pub rank: usize,
}

/// Ordered output of one retrieval source for one query.
///
/// Ranks are assigned from position on construction, so they are always
/// 1-indexed and strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedList {
    source: RetrievalSource,
    items: Vec<ScoredDocument>,
}

impl RankedList {
    /// An empty list for a source.
    pub fn empty(source: RetrievalSource) -> Self {
        Self {
            source,
            items: Vec::new(),
        }
    }

    /// Build a list from `(document, score)` pairs already in rank order.
    pub fn from_scored(
        source: RetrievalSource,
        scored: impl IntoIterator<Item = (Document, f64)>,
    ) -> Self {
        let items = scored
            .into_iter()
            .enumerate()
            .map(|(idx, (document, score))| ScoredDocument {
                document,
                score,
                rank: idx + 1,
            })
            .collect();
        Self { source, items }
    }

    /// Source that produced this list.
    pub fn source(&self) -> RetrievalSource {
        self.source
    }

    /// Entries in rank order.
    pub fn items(&self) -> &[ScoredDocument] {
        &self.items
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over entries in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredDocument> {
        self.items.iter()
    }

    /// Highest source score in the list, if any.
    pub fn max_score(&self) -> Option<f64> {
        self.items.iter().map(|d| d.score).reduce(f64::max)
    }
}

impl<'a> IntoIterator for &'a RankedList {
    type Item = &'a ScoredDocument;
    type IntoIter = std::slice::Iter<'a, ScoredDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
