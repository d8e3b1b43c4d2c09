//! Okapi BM25 lexical scoring over an in-memory corpus.
//!
//! # Algorithm
//!
//! ```ascii
//! score(D, Q) = Σ_{q ∈ Q} IDF(q) × f(q,D)×(k1+1) / (f(q,D) + k1×(1-b+b×|D|/avgdl))
//!
//! IDF(q) = ln((N - n(q) + 0.5) / (n(q) + 0.5) + 1),  clamped to ≥ 0
//!
//! Where:
//! - f(q,D) = occurrences of q in D
//! - |D|    = token count of D
//! - avgdl  = mean token count across the corpus
//! - N      = corpus size, n(q) = documents containing q
//! ```
//!
//! Terms absent from a document contribute nothing, so a document sharing
//! no term with the query scores exactly 0. Every query token counts once
//! per occurrence; a repeated query word weighs more.
//!
//! # Ordering
//!
//! Results are sorted by descending score. Equal scores keep corpus order,
//! so identical inputs always produce identical output.

use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::document::{Document, TextExtractable};
use crate::ranking::{RankedList, RetrievalSource};
use crate::tokenizer::Tokenizer;

/// Default term frequency saturation.
pub const DEFAULT_K1: f64 = 1.5;
/// Default length normalization.
pub const DEFAULT_B: f64 = 0.75;

/// BM25 scorer.
///
/// # Example
///
/// ```
/// use edgequake_retrieval::{Bm25Engine, Document};
///
/// let corpus = vec![
///     Document::new("1", "Webhook node receives HTTP requests"),
///     Document::new("2", "Slack node sends channel messages"),
/// ];
/// let hits = Bm25Engine::new().search("slack messages", &corpus, 10);
/// assert_eq!(hits.items()[0].document.id, "2");
/// ```
#[derive(Debug, Clone)]
pub struct Bm25Engine {
    /// Term frequency saturation parameter (k1).
    pub k1: f64,
    /// Length normalization parameter (b). 0 = none, 1 = full.
    pub b: f64,
    tokenizer: Tokenizer,
}

impl Bm25Engine {
    /// Create with default parameters (k1=1.5, b=0.75).
    pub fn new() -> Self {
        Self::with_params(DEFAULT_K1, DEFAULT_B)
    }

    /// Create with custom k1 and b parameters.
    pub fn with_params(k1: f64, b: f64) -> Self {
        Self {
            k1: k1.max(0.0),
            b: b.clamp(0.0, 1.0),
            tokenizer: Tokenizer::default(),
        }
    }

    /// Use a custom tokenizer.
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Tokenizer used for queries and documents.
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Compute IDF from a document frequency, clamped to be non-negative.
    #[inline]
    pub(crate) fn compute_idf_from_df(n: f64, df: f64) -> f64 {
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln().max(0.0)
    }

    /// Score every text against the query, in input order.
    pub fn score_texts<T: TextExtractable>(&self, query: &str, texts: &[T]) -> Vec<f64> {
        if texts.is_empty() {
            return Vec::new();
        }

        let query_terms = self.tokenizer.tokenize(query);
        if query_terms.is_empty() {
            return vec![0.0; texts.len()];
        }

        let term_counts: Vec<(usize, HashMap<String, usize>)> = texts
            .iter()
            .map(|t| {
                let tokens = self.tokenizer.tokenize(&t.extract_text());
                let len = tokens.len();
                let mut counts: HashMap<String, usize> = HashMap::new();
                for token in tokens {
                    *counts.entry(token).or_insert(0) += 1;
                }
                (len, counts)
            })
            .collect();

        let n = texts.len() as f64;
        let avgdl = term_counts.iter().map(|(len, _)| *len).sum::<usize>() as f64 / n;

        let mut idf_cache: HashMap<&str, f64> = HashMap::new();
        for term in &query_terms {
            idf_cache.entry(term.as_str()).or_insert_with(|| {
                let df = term_counts
                    .iter()
                    .filter(|(_, counts)| counts.contains_key(term))
                    .count() as f64;
                Self::compute_idf_from_df(n, df)
            });
        }

        term_counts
            .iter()
            .map(|(len, counts)| self.compute_bm25_score(&query_terms, *len, counts, avgdl, &idf_cache))
            .collect()
    }

    fn compute_bm25_score(
        &self,
        query_terms: &[String],
        doc_len: usize,
        counts: &HashMap<String, usize>,
        avgdl: f64,
        idf_cache: &HashMap<&str, f64>,
    ) -> f64 {
        let length_ratio = if avgdl > 0.0 {
            doc_len as f64 / avgdl
        } else {
            0.0
        };
        let length_norm = 1.0 - self.b + self.b * length_ratio;

        let mut score = 0.0;
        for term in query_terms {
            let tf = counts.get(term).copied().unwrap_or(0) as f64;
            if tf > 0.0 {
                let idf = idf_cache.get(term.as_str()).copied().unwrap_or(0.0);
                score += idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * length_norm);
            }
        }
        score
    }

    /// Return the top `k` corpus documents for a query, best first.
    pub fn search(&self, query: &str, corpus: &[Document], k: usize) -> RankedList {
        if corpus.is_empty() || k == 0 {
            return RankedList::empty(RetrievalSource::Bm25);
        }

        let scores = self.score_texts(query, corpus);
        let mut order: Vec<usize> = (0..corpus.len()).collect();
        order.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });
        order.truncate(k);

        debug!(
            "BM25 search over {} documents: {} results",
            corpus.len(),
            order.len()
        );

        RankedList::from_scored(
            RetrievalSource::Bm25,
            order.into_iter().map(|i| (corpus[i].clone(), scores[i])),
        )
    }
}

impl Default for Bm25Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Document> {
        vec![
            Document::new("1", "The capital of France is Paris."),
            Document::new("2", "Tokyo is the capital of Japan."),
            Document::new("3", "London is the capital of England."),
        ]
    }

    #[test]
    fn test_search_basic() {
        let results = Bm25Engine::new().search("capital of France", &corpus(), 10);
        assert_eq!(results.len(), 3);
        assert_eq!(results.items()[0].document.id, "1");
        assert!(results.items()[0].score > results.items()[1].score);
    }

    #[test]
    fn test_zero_overlap_scores_exactly_zero() {
        let texts = ["webhook trigger node", "slack message channel"];
        let scores = Bm25Engine::new().score_texts("gmail email", &texts);
        assert_eq!(scores, vec![0.0, 0.0]);
    }

    #[test]
    fn test_empty_corpus() {
        let results = Bm25Engine::new().search("anything", &[], 10);
        assert!(results.is_empty());
    }

    #[test]
    fn test_k_zero() {
        assert!(Bm25Engine::new().search("capital", &corpus(), 0).is_empty());
    }

    #[test]
    fn test_top_k_truncates() {
        let results = Bm25Engine::new().search("capital", &corpus(), 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_ties_keep_corpus_order() {
        let corpus = vec![
            Document::new("a", "alpha bravo"),
            Document::new("b", "alpha bravo"),
            Document::new("c", "alpha bravo"),
        ];
        let ids: Vec<String> = Bm25Engine::new()
            .search("alpha", &corpus, 3)
            .iter()
            .map(|d| d.document.id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_zero_score_documents_rank_after_matches() {
        let corpus = vec![
            Document::new("miss", "gmail email inbox"),
            Document::new("hit", "slack notification"),
        ];
        let results = Bm25Engine::new().search("slack", &corpus, 10);
        assert_eq!(results.items()[0].document.id, "hit");
        assert_eq!(results.items()[1].score, 0.0);
    }

    #[test]
    fn test_exact_score_single_document() {
        // N=1, df=1: idf = ln(0.5/1.5 + 1); docLen == avgdl so length_norm = 1
        let engine = Bm25Engine::new();
        let scores = engine.score_texts("webhook", &["webhook node"]);
        let idf = (0.5f64 / 1.5 + 1.0).ln();
        let expected = idf * (1.0 * 2.5) / (1.0 + 1.5);
        assert!((scores[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_idf_never_negative() {
        assert!(Bm25Engine::compute_idf_from_df(3.0, 3.0) >= 0.0);
        assert!(Bm25Engine::compute_idf_from_df(1.0, 1.0) >= 0.0);
        assert!(Bm25Engine::compute_idf_from_df(10.0, 1.0) > Bm25Engine::compute_idf_from_df(10.0, 5.0));
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let corpus = vec![
            Document::new("1", "The Peugeot 2008 ENVY is a great car."),
            Document::new("2", "Peugeot makes many cars."),
            Document::new("3", "Peugeot 208 is also available."),
        ];
        let results = Bm25Engine::new().search("Peugeot ENVY", &corpus, 3);
        assert_eq!(results.items()[0].document.id, "1");
        assert!(results.items()[0].score > results.items()[1].score * 1.5);
    }

    #[test]
    fn test_deterministic() {
        let engine = Bm25Engine::new();
        let first = engine.search("capital japan", &corpus(), 3);
        let second = engine.search("capital japan", &corpus(), 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_documents_do_not_divide_by_zero() {
        let corpus = vec![Document::new("1", ""), Document::new("2", "!!")];
        let results = Bm25Engine::new().search("anything", &corpus, 10);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|d| d.score == 0.0));
    }

    #[test]
    fn test_params_are_clamped() {
        let engine = Bm25Engine::with_params(-1.0, 2.0);
        assert_eq!(engine.k1, 0.0);
        assert_eq!(engine.b, 1.0);
    }
}
