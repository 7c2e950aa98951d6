//! In-memory TTL cache for search results.
//!
//! Keyed by the normalised query, the ordered engine list and the result
//! limit. Uses [`moka`] for async-friendly caching with automatic eviction.

use std::sync::OnceLock;
use std::time::Duration;

use moka::future::Cache;

use crate::types::{SearchEngine, SearchResult};

/// Maximum number of cached result sets.
const MAX_CACHE_ENTRIES: u64 = 100;

/// Process-wide search cache.
///
/// The TTL is fixed by the first caller and cannot change afterwards.
static CACHE: OnceLock<Cache<CacheKey, Vec<SearchResult>>> = OnceLock::new();

/// Cache key: normalised query + ordered engine list + result limit.
///
/// Engine order is part of the key because it decides which engine answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    query: String,
    engines: Vec<SearchEngine>,
    max_results: usize,
}

impl CacheKey {
    /// Build a cache key. The query is trimmed and lowercased.
    pub fn new(query: &str, engines: &[SearchEngine], max_results: usize) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            engines: engines.to_vec(),
            max_results,
        }
    }
}

fn get_or_init_cache(ttl_seconds: u64) -> &'static Cache<CacheKey, Vec<SearchResult>> {
    CACHE.get_or_init(|| {
        Cache::builder()
            .max_capacity(MAX_CACHE_ENTRIES)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build()
    })
}

/// Look up cached results. `None` on miss.
pub async fn get(key: &CacheKey, ttl_seconds: u64) -> Option<Vec<SearchResult>> {
    get_or_init_cache(ttl_seconds).get(key).await
}

/// Insert results into the cache.
pub async fn insert(key: CacheKey, results: Vec<SearchResult>, ttl_seconds: u64) {
    get_or_init_cache(ttl_seconds).insert(key, results).await;
}
