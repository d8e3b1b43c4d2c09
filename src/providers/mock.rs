//! Deterministic mock embedding provider for testing.
//!
//! Embeddings are hashed bags of words: every token adds 1.0 to the bucket
//! its FNV-1a hash selects, and the vector is L2-normalized. Texts sharing
//! vocabulary therefore have a high cosine similarity, and the same text
//! always yields the same vector across runs and platforms.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::EmbeddingError;
use crate::tokenizer::Tokenizer;
use crate::traits::EmbeddingProvider;

/// Default vector dimension.
const DEFAULT_MOCK_DIMENSION: usize = 64;

/// Mock embedding provider with injectable failure and latency.
#[derive(Debug)]
pub struct MockEmbeddingProvider {
    dimension: usize,
    tokenizer: Tokenizer,
    delay: Option<Duration>,
    failing: AtomicBool,
    call_count: AtomicUsize,
}

impl MockEmbeddingProvider {
    /// Create a provider with the default dimension.
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_MOCK_DIMENSION)
    }

    /// Create a provider producing vectors of `dimension` components.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            tokenizer: Tokenizer::default(),
            delay: None,
            failing: AtomicBool::new(false),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Start in the failing state.
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    /// Toggle failure injection at runtime.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed` calls received so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in self.tokenizer.tokenize(text) {
            let bucket = (fnv1a(token.as_bytes()) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ *b as u64).wrapping_mul(PRIME))
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-bag-of-words"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_tokens(&self) -> usize {
        8192
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::ApiError(
                "mock embedding failure (503)".to_string(),
            ));
        }

        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
