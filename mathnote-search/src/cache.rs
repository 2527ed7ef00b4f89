//! In-memory result cache for the search manager.
//!
//! Caches the full ranked result list (before truncation) keyed by the normalised
//! query, the sorted source set and the requested result count. Uses
//! [`moka`] for async-friendly caching with TTL and automatic eviction.
//! Each manager owns its own cache, so managers built with different
//! configurations never see each other's entries.

use std::time::Duration;

use moka::future::Cache;

use crate::types::{SearchResult, SearchSource};

/// Maximum number of cached search result sets.
const MAX_CACHE_ENTRIES: u64 = 100;

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Lowercased, trimmed, whitespace-collapsed query.
    query: String,
    /// Sorted and deduplicated so `[Google, Bing]` and `[Bing, Google]`
    /// share an entry.
    sources: Vec<SearchSource>,
    max_results: usize,
}

impl CacheKey {
    pub fn new(query: &str, sources: &[SearchSource], max_results: usize) -> Self {
        let query = query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let mut sources = sources.to_vec();
        sources.sort();
        sources.dedup();
        Self {
            query,
            sources,
            max_results,
        }
    }
}

/// Search result cache. A TTL of zero disables it: lookups always miss
/// and inserts are dropped.
#[derive(Clone)]
pub struct ResultCache {
    inner: Option<Cache<CacheKey, Vec<SearchResult>>>,
}

impl ResultCache {
    pub fn new(ttl_seconds: u64) -> Self {
        let inner = (ttl_seconds > 0).then(|| {
            Cache::builder()
                .max_capacity(MAX_CACHE_ENTRIES)
                .time_to_live(Duration::from_secs(ttl_seconds))
                .build()
        });
        Self { inner }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Returns `Some(results)` on cache hit, `None` on miss.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<SearchResult>> {
        match &self.inner {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    pub async fn insert(&self, key: CacheKey, results: Vec<SearchResult>) {
        if let Some(cache) = &self.inner {
            cache.insert(key, results).await;
        }
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        if let Some(cache) = &self.inner {
            cache.invalidate_all();
        }
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
