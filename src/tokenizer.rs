//! Term tokenization for lexical scoring.
//!
//! ```ascii
//! "Hi to you!"  ──lowercase──►  "hi to you!"
//!               ──split on non-word──►  ["hi", "to", "you"]
//!               ──drop len < 3──►  ["you"]
//! ```
//!
//! Word characters are alphanumerics and `_`. The same tokenizer feeds
//! BM25, the hybrid reranker and MMR similarity, so their notion of a
//! "term" always agrees.

use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Configuration for the tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizerConfig {
    /// Minimum token length in characters.
    pub min_token_length: usize,
    /// Strip diacritics (NFKD + drop combining marks) before splitting.
    pub fold_diacritics: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            min_token_length: 3,
            fold_diacritics: false,
        }
    }
}

impl TokenizerConfig {
    /// Default config with diacritic folding, so "véhicule" matches "vehicule".
    pub fn folding() -> Self {
        Self {
            fold_diacritics: true,
            ..Default::default()
        }
    }
}

/// Tokenizer turning text into index terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    /// Create a tokenizer with the given configuration.
    pub fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Split text into lowercase terms.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let normalized: String = if self.config.fold_diacritics {
            lowered
                .nfkd()
                .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
                .collect()
        } else {
            lowered
        };

        normalized
            .split(|c: char| !is_word_char(c))
            .filter(|t| t.chars().count() >= self.config.min_token_length)
            .map(str::to_string)
            .collect()
    }

    /// Distinct terms of a text.
    pub fn token_set(&self, text: &str) -> HashSet<String> {
        self.tokenize(text).into_iter().collect()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize with the default configuration.
pub fn tokenize(text: &str) -> Vec<String> {
    Tokenizer::default().tokenize(text)
}
