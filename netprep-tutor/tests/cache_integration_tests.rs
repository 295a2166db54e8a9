//! Integration tests for the cache module
//!
//! These tests verify the complete cache functionality including:
//! - Basic cache operations
//! - TTL expiration
//! - LRU eviction
//! - Trait-object injection
//! - Concurrent access

use netprep_tutor::cache::{MemoryCache, NoopCache, ResponseCache};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_basic_cache_operations() {
    let cache = MemoryCache::new(Duration::from_secs(60), 100);

    // Test insert and get
    cache
        .set(
            "gemini-1.5-flash:prompt".to_string(),
            r#"{"title": "OSPF"}"#.to_string(),
        )
        .await;

    let value = cache.get("gemini-1.5-flash:prompt").await;
    assert_eq!(value, Some(r#"{"title": "OSPF"}"#.to_string()));

    // Test cache hit tracking
    let stats = cache.stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 0);
}

#[tokio::test]
async fn test_ttl_expiration() {
    let cache = MemoryCache::new(Duration::from_millis(100), 100);

    cache
        .set("expiring_key".to_string(), "expiring_value".to_string())
        .await;

    // Should be available immediately
    assert!(cache.get("expiring_key").await.is_some());

    // Wait for expiration
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Should be expired now
    assert!(cache.get("expiring_key").await.is_none());

    let stats = cache.stats().await;
    assert!(stats.evictions_ttl > 0);
}

#[tokio::test]
async fn test_lru_eviction() {
    let cache = MemoryCache::new(Duration::from_secs(300), 3);

    // Fill cache to capacity
    cache.set("key1".to_string(), "value1".to_string()).await;
    cache.set("key2".to_string(), "value2".to_string()).await;
    cache.set("key3".to_string(), "value3".to_string()).await;

    // Access key2 and key3 to make them more recent
    cache.get("key2").await;
    cache.get("key3").await;

    // Insert new entry, should evict key1 (least recently used)
    cache.set("key4".to_string(), "value4".to_string()).await;

    // Verify key1 was evicted
    assert!(cache.get("key1").await.is_none());

    // Others should still be present
    assert!(cache.get("key2").await.is_some());
    assert!(cache.get("key3").await.is_some());
    assert!(cache.get("key4").await.is_some());
}

#[tokio::test]
async fn test_cache_stats() {
    let cache = MemoryCache::new(Duration::from_secs(60), 100);

    // Generate some cache activity
    cache.set("k1".to_string(), "v1".to_string()).await;
    cache.set("k2".to_string(), "v2".to_string()).await;

    cache.get("k1").await; // Hit
    cache.get("k1").await; // Hit
    cache.get("k3").await; // Miss

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 2);
    assert!(stats.hit_rate() > 0.0);
}

#[tokio::test]
async fn test_trait_object_injection() {
    // The pipeline consumes the cache through this trait; both backends
    // must be usable behind the same Arc.
    let backends: Vec<Arc<dyn ResponseCache>> = vec![
        Arc::new(MemoryCache::new(Duration::from_secs(60), 100)),
        Arc::new(NoopCache),
    ];

    for cache in backends {
        cache.set("key".to_string(), "value".to_string()).await;
        // MemoryCache hits, NoopCache misses; neither panics
        let _ = cache.get("key").await;
    }
}

#[tokio::test]
async fn test_expired_entry_is_removed_not_just_hidden() {
    let cache = MemoryCache::new(Duration::from_millis(50), 100);

    cache.set("k1".to_string(), "v1".to_string()).await;
    assert_eq!(cache.len().await, 1);

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(cache.get("k1").await.is_none());
    assert_eq!(cache.len().await, 0);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn test_concurrent_cache_access() {
    use tokio::task;

    let cache = Arc::new(MemoryCache::new(Duration::from_secs(60), 1000));

    // Spawn multiple concurrent tasks
    let mut handles = vec![];

    for i in 0..10 {
        let cache_clone = Arc::clone(&cache);
        let handle = task::spawn(async move {
            for j in 0..10 {
                let key = format!("key_{}_{}", i, j);
                let value = format!("value_{}_{}", i, j);
                cache_clone.set(key.clone(), value.clone()).await;
                let retrieved = cache_clone.get(&key).await;
                assert_eq!(retrieved, Some(value));
            }
        });
        handles.push(handle);
    }

    // Wait for all tasks
    for handle in handles {
        handle.await.unwrap();
    }

    // Verify all entries were inserted
    let stats = cache.stats().await;
    assert_eq!(stats.entries, 100);
    assert_eq!(stats.hits, 100);
}

#[tokio::test]
async fn test_cache_performance_characteristics() {
    let cache = MemoryCache::new(Duration::from_secs(60), 10_000);

    // Insert many entries
    let start = std::time::Instant::now();
    for i in 0..1000 {
        cache
            .set(format!("key_{}", i), format!("value_{}", i))
            .await;
    }
    let insert_duration = start.elapsed();

    // Read many entries
    let start = std::time::Instant::now();
    for i in 0..1000 {
        cache.get(&format!("key_{}", i)).await;
    }
    let read_duration = start.elapsed();

    println!("Insert 1000 entries: {:?}", insert_duration);
    println!("Read 1000 entries: {:?}", read_duration);

    // Verify performance is reasonable (should be well under 1 second for each)
    assert!(insert_duration.as_millis() < 5000);
    assert!(read_duration.as_millis() < 5000);

    let stats = cache.stats().await;
    assert_eq!(stats.entries, 1000);
    assert_eq!(stats.hits, 1000);
}
