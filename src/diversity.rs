//! Maximal Marginal Relevance (MMR) diversity selection.
//!
//! ```ascii
//! selected = [docs[0]]
//! while |selected| < final_k and candidates remain:
//!     pick argmax_d  λ × score(d) − (1 − λ) × max_{s ∈ selected} jaccard(d, s)
//! ```
//!
//! Similarity is Jaccard overlap of token sets, so near-duplicate passages
//! are pushed down in favour of documents covering other ground. λ = 1
//! reduces to plain relevance order; λ = 0 maximizes novelty.

use std::collections::HashSet;
use tracing::debug;

use crate::reranker::RerankedDocument;
use crate::similarity::jaccard_similarity;
use crate::tokenizer::Tokenizer;

/// Greedy MMR reordering of a ranked list.
#[derive(Debug, Clone)]
pub struct MmrSelector {
    lambda: f64,
    tokenizer: Tokenizer,
}

impl MmrSelector {
    /// Create a selector; `lambda` is clamped to `[0, 1]`.
    pub fn new(lambda: f64) -> Self {
        Self {
            lambda: lambda.clamp(0.0, 1.0),
            tokenizer: Tokenizer::default(),
        }
    }

    /// Relevance/diversity trade-off in use.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Select up to `final_k` documents balancing relevance and novelty.
    ///
    /// The first document is always kept. Ties go to the earliest
    /// candidate.
    pub fn diversify(&self, docs: &[RerankedDocument], final_k: usize) -> Vec<RerankedDocument> {
        if docs.len() <= 1 || final_k <= 1 {
            return docs.iter().take(final_k).cloned().collect();
        }

        let token_sets: Vec<HashSet<String>> = docs
            .iter()
            .map(|d| self.tokenizer.token_set(&d.document.text))
            .collect();

        let mut selected: Vec<usize> = vec![0];
        let mut remaining: Vec<usize> = (1..docs.len()).collect();

        while selected.len() < final_k && !remaining.is_empty() {
            let mut best_pos = 0;
            let mut best_score = f64::NEG_INFINITY;

            for (pos, &candidate) in remaining.iter().enumerate() {
                let max_similarity = selected
                    .iter()
                    .map(|&s| jaccard_similarity(&token_sets[candidate], &token_sets[s]))
                    .fold(0.0f64, f64::max);
                let mmr = self.lambda * docs[candidate].final_score
                    - (1.0 - self.lambda) * max_similarity;

                if mmr > best_score {
                    best_score = mmr;
                    best_pos = pos;
                }
            }

            selected.push(remaining.remove(best_pos));
        }

        debug!(
            "MMR selected {} of {} documents (lambda={})",
            selected.len(),
            docs.len(),
            self.lambda
        );

        selected.into_iter().map(|i| docs[i].clone()).collect()
    }
}

impl Default for MmrSelector {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn doc(id: &str, text: &str, score: f64) -> RerankedDocument {
        RerankedDocument::new(Document::new(id, text), score)
    }

    fn ids(docs: &[RerankedDocument]) -> Vec<&str> {
        docs.iter().map(|d| d.document.id.as_str()).collect()
    }

    #[test]
    fn test_lambda_one_is_relevance_order() {
        let docs = vec![
            doc("a", "slack notification channel", 0.9),
            doc("b", "slack notification channel", 0.8),
            doc("c", "database storage", 0.7),
        ];
        let result = MmrSelector::new(1.0).diversify(&docs, 3);
        assert_eq!(ids(&result), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_near_duplicate_is_demoted() {
        let docs = vec![
            doc("a", "slack notification channel alerts", 0.9),
            doc("b", "slack notification channel alerts", 0.85),
            doc("c", "postgresql database storage", 0.6),
        ];
        let result = MmrSelector::new(0.5).diversify(&docs, 2);
        assert_eq!(ids(&result), vec!["a", "c"]);
    }

    #[test]
    fn test_first_document_always_kept() {
        let docs = vec![
            doc("low", "webhook trigger", 0.1),
            doc("high", "gmail email", 0.9),
        ];
        let result = MmrSelector::new(0.0).diversify(&docs, 2);
        assert_eq!(result[0].document.id, "low");
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_ties_go_to_earliest() {
        let docs = vec![
            doc("a", "alpha", 0.9),
            doc("b", "bravo", 0.5),
            doc("c", "charlie", 0.5),
        ];
        let result = MmrSelector::new(0.5).diversify(&docs, 2);
        assert_eq!(ids(&result), vec!["a", "b"]);
    }

    #[test]
    fn test_small_inputs_unchanged() {
        let selector = MmrSelector::default();
        assert!(selector.diversify(&[], 5).is_empty());

        let single = vec![doc("a", "alpha", 0.9)];
        assert_eq!(selector.diversify(&single, 5), single);
    }

    #[test]
    fn test_respects_final_k() {
        let docs: Vec<RerankedDocument> = (0..6)
            .map(|i| doc(&format!("d{i}"), &format!("topic{i} words"), 1.0 - i as f64 * 0.1))
            .collect();
        assert_eq!(MmrSelector::new(0.7).diversify(&docs, 4).len(), 4);
        assert_eq!(MmrSelector::new(0.7).diversify(&docs, 10).len(), 6);
    }

    #[test]
    fn test_lambda_is_clamped() {
        assert_eq!(MmrSelector::new(1.5).lambda(), 1.0);
        assert_eq!(MmrSelector::new(-0.5).lambda(), 0.0);
    }
}
