//! Bounded LRU cache of rerank results.
//!
//! Keys combine the query, a hash of the ordered candidate ids and the
//! requested `top_k`, so the same candidates in a different order, or a
//! different cut-off, never reuse a stale answer.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

use super::result::RerankedDocument;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    query: String,
    ids_hash: u64,
    top_k: usize,
}

impl CacheKey {
    pub(crate) fn new(query: &str, candidates: &[RerankedDocument], top_k: usize) -> Self {
        let mut hasher = DefaultHasher::new();
        candidates.len().hash(&mut hasher);
        for candidate in candidates {
            candidate.document.id.hash(&mut hasher);
        }
        Self {
            query: query.to_string(),
            ids_hash: hasher.finish(),
            top_k,
        }
    }
}

/// Thread-safe LRU of rerank results. A capacity of 0 disables caching.
pub struct RerankCache {
    entries: Option<Mutex<LruCache<CacheKey, Vec<RerankedDocument>>>>,
}

impl RerankCache {
    /// Create a cache holding up to `capacity` results.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Whether results are cached at all.
    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub(crate) fn get(&self, key: &CacheKey) -> Option<Vec<RerankedDocument>> {
        self.entries.as_ref()?.lock().get(key).cloned()
    }

    pub(crate) fn put(&self, key: CacheKey, results: Vec<RerankedDocument>) {
        if let Some(entries) = &self.entries {
            entries.lock().put(key, results);
        }
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.lock().len())
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached result.
    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().clear();
        }
    }
}
