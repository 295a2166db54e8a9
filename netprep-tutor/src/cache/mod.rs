//! # Response Caching Layer
//!
//! This module implements an in-memory cache for normalized tutor responses,
//! keyed by model and prompt so a model switch never serves stale cards.
//!
//! ## Features
//!
//! - **TTL-Based Expiration**: Automatic invalidation with a configurable time-to-live
//! - **LRU Eviction**: Least Recently Used eviction policy with a bounded entry count
//! - **Metrics Collection**: Hit/miss/eviction counters exposed via [`CacheStats`]
//! - **Pluggable Backend**: Consumers depend on the [`ResponseCache`] trait, not a
//!   concrete store, so tests can inject their own implementation
//!
//! ## Example
//!
//! ```rust
//! use netprep_tutor::cache::{MemoryCache, ResponseCache};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let cache = MemoryCache::new(Duration::from_secs(1800), 1_000);
//!
//! cache.set("gemini-1.5-flash:explain OSPF".to_string(), "cached card".to_string()).await;
//!
//! if let Some(value) = cache.get("gemini-1.5-flash:explain OSPF").await {
//!     println!("Cache hit: {}", value);
//! }
//! # }
//! ```

pub mod entry;
pub mod store;
pub mod types;

pub use entry::CacheEntry;
pub use store::MemoryCache;
pub use types::{CacheKey, CacheStats, CacheValue};

use async_trait::async_trait;

/// Read/write interface the pipeline depends on.
///
/// Kept deliberately small: lookups are infallible (a broken cache behaves
/// like a miss) and writes are fire-and-forget.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Look up a cached value, or `None` on miss or expiry.
    async fn get(&self, key: &str) -> Option<CacheValue>;

    /// Store a value under the given key.
    async fn set(&self, key: CacheKey, value: CacheValue);
}

/// Cache that stores nothing. Used when caching is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl ResponseCache for NoopCache {
    async fn get(&self, _key: &str) -> Option<CacheValue> {
        None
    }

    async fn set(&self, _key: CacheKey, _value: CacheValue) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_cache_never_hits() {
        let cache = NoopCache;

        cache.set("key1".to_string(), "value1".to_string()).await;
        assert_eq!(cache.get("key1").await, None);
    }
}
