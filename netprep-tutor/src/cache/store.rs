//! In-memory cache store with TTL expiration and LRU eviction

use crate::cache::entry::CacheEntry;
use crate::cache::types::{CacheKey, CacheStats, CacheValue};
use crate::cache::ResponseCache;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Process-scoped response cache with TTL support and LRU eviction
///
/// This implementation provides:
/// - Thread-safe async access via RwLock
/// - TTL-based expiration checked on read
/// - LRU eviction when the entry limit is reached
/// - Hit/miss/eviction metrics
///
/// Entries live only as long as the process; there is no persistence.
pub struct MemoryCache {
    /// Time-to-live applied to every entry
    ttl: Duration,

    /// Maximum number of entries before LRU eviction kicks in
    max_entries: usize,

    /// Internal storage
    store: Arc<RwLock<CacheStore>>,
}

/// Internal cache storage
struct CacheStore {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, CacheEntry>,

    /// LRU tracking: maintains access order, least recent at the front
    lru_queue: VecDeque<CacheKey>,

    /// Current cache statistics
    stats: CacheStats,
}

impl MemoryCache {
    /// Create a new cache with the given TTL and entry limit.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        info!(
            "Initializing response cache (ttl: {:?}, max_entries: {})",
            ttl, max_entries
        );

        let store = CacheStore {
            entries: HashMap::new(),
            lru_queue: VecDeque::new(),
            stats: CacheStats::default(),
        };

        Self {
            ttl,
            max_entries,
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Store a value, evicting the least recently used entries when full.
    pub async fn insert(&self, key: CacheKey, value: CacheValue) {
        let entry = CacheEntry::new(key.clone(), value, self.ttl);
        let mut store = self.store.write().await;

        if store.entries.contains_key(&key) {
            debug!("Updating existing cache entry: {}", key);
            store.entries.insert(key.clone(), entry);
            store.lru_queue.retain(|k| k != &key);
            store.lru_queue.push_back(key);
        } else {
            // Make room before inserting a new key
            while store.entries.len() >= self.max_entries {
                if let Some(oldest) = store.lru_queue.pop_front() {
                    debug!("Evicting entry due to max_entries limit: {}", oldest);
                    store.entries.remove(&oldest);
                    store.stats.evictions_lru += 1;
                } else {
                    break;
                }
            }

            debug!("Inserting new cache entry: {}", key);
            store.entries.insert(key.clone(), entry);
            store.lru_queue.push_back(key);
        }

        store.stats.entries = store.entries.len();
    }

    /// Look up a value. Expired entries count as misses and are removed.
    pub async fn lookup(&self, key: &str) -> Option<CacheValue> {
        let mut store = self.store.write().await;

        let Some(entry) = store.entries.get(key) else {
            debug!("Cache miss: {}", key);
            store.stats.misses += 1;
            return None;
        };

        if entry.is_expired() {
            debug!("Cache entry expired: {}", key);
            store.entries.remove(key);
            store.lru_queue.retain(|k| k != key);
            store.stats.misses += 1;
            store.stats.evictions_ttl += 1;
            store.stats.entries = store.entries.len();
            return None;
        }

        let value = entry.value.clone();

        if let Some(entry) = store.entries.get_mut(key) {
            entry.mark_accessed();
        }
        store.stats.hits += 1;

        // Move to the back of the LRU queue (most recently used)
        store.lru_queue.retain(|k| k != key);
        store.lru_queue.push_back(key.to_string());

        debug!("Cache hit: {}", key);
        Some(value)
    }

    /// Remove a specific entry, returning its value if present.
    pub async fn remove(&self, key: &str) -> Option<CacheValue> {
        let mut store = self.store.write().await;

        let entry = store.entries.remove(key)?;
        store.lru_queue.retain(|k| k != key);
        store.stats.entries = store.entries.len();

        debug!("Removed cache entry: {}", key);
        Some(entry.value)
    }

    /// Clear all entries.
    pub async fn clear(&self) {
        let mut store = self.store.write().await;

        let count = store.entries.len();
        store.entries.clear();
        store.lru_queue.clear();
        store.stats.entries = 0;

        info!("Cleared {} entries from cache", count);
    }

    /// Check if a key exists without touching access metadata or stats.
    pub async fn contains_key(&self, key: &str) -> bool {
        let store = self.store.read().await;
        store.entries.contains_key(key)
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        store.stats.clone()
    }

    /// Get number of entries in cache.
    pub async fn len(&self) -> usize {
        let store = self.store.read().await;
        store.entries.len()
    }

    /// Check if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        let store = self.store.read().await;
        store.entries.is_empty()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<CacheValue> {
        self.lookup(key).await
    }

    async fn set(&self, key: CacheKey, value: CacheValue) {
        self.insert(key, value).await;
    }
}
