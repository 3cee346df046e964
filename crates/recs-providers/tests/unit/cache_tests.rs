//! Tests for cache providers

use std::time::Duration;

use recs_domain::ports::providers::{CacheEntryConfig, CacheProvider};
use recs_providers::{MokaCacheProvider, NullCacheProvider};

#[tokio::test]
async fn test_moka_set_get_delete() {
    let cache = MokaCacheProvider::new();
    cache
        .set_json("product:1:embedding", "[1.0,0.0]", CacheEntryConfig::default())
        .await
        .unwrap();

    assert_eq!(
        cache.get_json("product:1:embedding").await.unwrap().as_deref(),
        Some("[1.0,0.0]")
    );
    assert!(cache.exists("product:1:embedding").await.unwrap());
    assert!(cache.delete("product:1:embedding").await.unwrap());
    assert!(!cache.delete("product:1:embedding").await.unwrap());
    assert!(cache.get_json("product:1:embedding").await.unwrap().is_none());
}

#[tokio::test]
async fn test_moka_entry_expires_after_ttl() {
    let cache = MokaCacheProvider::new();
    cache
        .set_json(
            "user:1:session",
            "[0.0,1.0]",
            CacheEntryConfig::default().with_ttl(Duration::from_millis(50)),
        )
        .await
        .unwrap();
    cache
        .set_json("user:1:long_term", "[1.0,0.0]", CacheEntryConfig::persistent())
        .await
        .unwrap();
    assert!(cache.get_json("user:1:session").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(cache.get_json("user:1:session").await.unwrap().is_none());
    assert!(cache.get_json("user:1:long_term").await.unwrap().is_some());
}

#[tokio::test]
async fn test_moka_time_to_live() {
    let cache = MokaCacheProvider::new();
    cache
        .set_json("ttl", "1", CacheEntryConfig::default().with_ttl_secs(600))
        .await
        .unwrap();
    cache
        .set_json("forever", "1", CacheEntryConfig::persistent())
        .await
        .unwrap();

    let remaining = cache.time_to_live("ttl").await.unwrap().unwrap();
    assert!(remaining <= Duration::from_secs(600));
    assert!(remaining > Duration::from_secs(590));
    assert!(cache.time_to_live("forever").await.unwrap().is_none());
    assert!(cache.time_to_live("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_moka_overwrite_replaces_ttl() {
    let cache = MokaCacheProvider::new();
    cache
        .set_json("k", "1", CacheEntryConfig::default().with_ttl(Duration::from_millis(50)))
        .await
        .unwrap();
    cache
        .set_json("k", "2", CacheEntryConfig::persistent())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(cache.get_json("k").await.unwrap().as_deref(), Some("2"));
}

#[tokio::test]
async fn test_moka_increment() {
    let cache = MokaCacheProvider::new();
    assert_eq!(cache.increment("counter", 1).await.unwrap(), 1);
    assert_eq!(cache.increment("counter", 4).await.unwrap(), 5);
    assert_eq!(cache.increment("counter", -2).await.unwrap(), 3);

    cache
        .set_json("text", "\"abc\"", CacheEntryConfig::default())
        .await
        .unwrap();
    assert_eq!(cache.increment("text", 2).await.unwrap(), 2);
}

#[tokio::test]
async fn test_moka_concurrent_increments() {
    let cache = MokaCacheProvider::new();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for _ in 0..25 {
                cache.increment("shared", 1).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(cache.get_json("shared").await.unwrap().as_deref(), Some("200"));
}

#[tokio::test]
async fn test_moka_score_boards() {
    let cache = MokaCacheProvider::new();
    cache.increment_score("views", "1", 1.0).await.unwrap();
    cache.increment_score("views", "2", 1.0).await.unwrap();
    cache.increment_score("views", "2", 1.0).await.unwrap();
    cache.increment_score("views", "3", 2.0).await.unwrap();
    assert_eq!(cache.increment_score("views", "1", 0.5).await.unwrap(), 1.5);

    let top = cache.top_scores("views", 2).await.unwrap();
    assert_eq!(
        top,
        vec![("2".to_string(), 2.0), ("3".to_string(), 2.0)]
    );
    assert_eq!(cache.score("views", "1").await.unwrap(), Some(1.5));
    assert_eq!(cache.score("views", "9").await.unwrap(), None);
    assert_eq!(cache.board("views").await.unwrap().len(), 3);
    assert!(cache.top_scores("unknown", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_moka_many_roundtrip_preserves_order() {
    let cache = MokaCacheProvider::new();
    let entries = vec![
        ("a".to_string(), "1".to_string()),
        ("c".to_string(), "3".to_string()),
    ];
    cache
        .set_many_json(&entries, CacheEntryConfig::default())
        .await
        .unwrap();

    let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let values = cache.get_many_json(&keys).await.unwrap();
    assert_eq!(
        values,
        vec![Some("1".to_string()), None, Some("3".to_string())]
    );
}

#[tokio::test]
async fn test_moka_stats_and_clear() {
    let cache = MokaCacheProvider::with_capacity(100);
    assert_eq!(cache.max_entries(), 100);
    cache
        .set_json("a", "1", CacheEntryConfig::default())
        .await
        .unwrap();
    cache.increment_score("views", "1", 1.0).await.unwrap();
    cache.get_json("a").await.unwrap();
    cache.get_json("b").await.unwrap();

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.boards, 1);
    assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);

    cache.clear().await.unwrap();
    assert_eq!(cache.size().await.unwrap(), 0);
    assert!(cache.board("views").await.unwrap().is_empty());
    assert_eq!(cache.provider_name(), "moka");
}

#[tokio::test]
async fn test_null_cache_always_misses() {
    let cache = NullCacheProvider::new();
    cache
        .set_json("a", "1", CacheEntryConfig::default())
        .await
        .unwrap();
    assert!(cache.get_json("a").await.unwrap().is_none());
    assert!(!cache.exists("a").await.unwrap());
    assert!(!cache.delete("a").await.unwrap());
    assert_eq!(cache.increment("counter", 3).await.unwrap(), 3);
    assert_eq!(cache.increment_score("views", "1", 2.0).await.unwrap(), 2.0);
    assert!(cache.top_scores("views", 5).await.unwrap().is_empty());
    assert_eq!(cache.size().await.unwrap(), 0);
    assert_eq!(cache.provider_name(), "null");
}
