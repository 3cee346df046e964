//! Moka in-memory cache provider
//!
//! Concurrent in-memory cache built on Moka, with a TTL chosen per entry
//! at write time.
//!
//! ## Features
//!
//! - Per-entry expiry through [`moka::Expiry`]; entries without a TTL live
//!   until evicted
//! - Atomic counters via Moka's entry API
//! - Score boards (member → score) for view counters
//! - Hit/miss accounting
//!
//! ## Example
//!
//! ```
//! use recs_providers::cache::MokaCacheProvider;
//!
//! let provider = MokaCacheProvider::with_capacity(10_000);
//! assert_eq!(provider.max_entries(), 10_000);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::Expiry;
use moka::future::Cache;
use recs_domain::error::Result;
use recs_domain::ports::providers::cache::{CacheEntryConfig, CacheProvider, CacheStats};

use crate::constants::{CACHE_DEFAULT_SIZE_LIMIT, PROVIDER_MOKA};

/// Stored value with the lifetime it was written with
#[derive(Debug, Clone)]
struct CachedValue {
    json: Arc<str>,
    ttl: Option<Duration>,
    written_at: Instant,
}

impl CachedValue {
    fn new(json: &str, ttl: Option<Duration>) -> Self {
        Self {
            json: Arc::from(json),
            ttl,
            written_at: Instant::now(),
        }
    }

    fn remaining(&self) -> Option<Duration> {
        self.ttl
            .map(|ttl| ttl.saturating_sub(self.written_at.elapsed()))
    }
}

/// Expiry policy reading the TTL stored in each value
struct PerEntryExpiry;

impl Expiry<String, CachedValue> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Moka-based in-memory cache provider
#[derive(Clone)]
pub struct MokaCacheProvider {
    cache: Cache<String, CachedValue>,
    boards: Arc<DashMap<String, HashMap<String, f64>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    max_entries: u64,
}

impl Default for MokaCacheProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MokaCacheProvider {
    /// Create a new Moka cache provider with default settings
    pub fn new() -> Self {
        Self::with_capacity(CACHE_DEFAULT_SIZE_LIMIT)
    }

    /// Create a new Moka cache provider holding at most `max_entries`
    pub fn with_capacity(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryExpiry)
            .build();

        Self {
            cache,
            boards: Arc::new(DashMap::new()),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            max_entries,
        }
    }

    /// Get the maximum capacity of the cache
    pub fn max_entries(&self) -> u64 {
        self.max_entries
    }

    fn record(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[async_trait]
impl CacheProvider for MokaCacheProvider {
    async fn get_json(&self, key: &str) -> Result<Option<String>> {
        let value = self.cache.get(key).await;
        self.record(value.is_some());
        Ok(value.map(|v| v.json.to_string()))
    }

    async fn set_json(&self, key: &str, value: &str, config: CacheEntryConfig) -> Result<()> {
        self.cache
            .insert(key.to_string(), CachedValue::new(value, config.ttl))
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn time_to_live(&self, key: &str) -> Result<Option<Duration>> {
        Ok(self.cache.get(key).await.and_then(|v| v.remaining()))
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        let entry = self
            .cache
            .entry(key.to_string())
            .and_upsert_with(|existing| {
                let (current, ttl) = existing.map_or((0, None), |e| {
                    let value = e.into_value();
                    // a non-integer value is overwritten as if absent
                    (value.json.parse::<i64>().unwrap_or(0), value.ttl)
                });
                let next = current.saturating_add(delta);
                std::future::ready(CachedValue::new(&next.to_string(), ttl))
            })
            .await;
        Ok(entry.into_value().json.parse::<i64>().unwrap_or(delta))
    }

    async fn increment_score(&self, board: &str, member: &str, delta: f64) -> Result<f64> {
        let mut scores = self.boards.entry(board.to_string()).or_default();
        let score = scores.entry(member.to_string()).or_insert(0.0);
        *score += delta;
        Ok(*score)
    }

    async fn score(&self, board: &str, member: &str) -> Result<Option<f64>> {
        Ok(self
            .boards
            .get(board)
            .and_then(|scores| scores.get(member).copied()))
    }

    async fn top_scores(&self, board: &str, limit: usize) -> Result<Vec<(String, f64)>> {
        let Some(scores) = self.boards.get(board) else {
            return Ok(Vec::new());
        };
        let mut entries: Vec<(String, f64)> =
            scores.iter().map(|(m, s)| (m.clone(), *s)).collect();
        drop(scores);
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn board(&self, board: &str) -> Result<HashMap<String, f64>> {
        Ok(self
            .boards
            .get(board)
            .map(|scores| scores.value().clone())
            .unwrap_or_default())
    }

    async fn clear(&self) -> Result<()> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        self.boards.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        // Run pending tasks to ensure entry_count is accurate
        self.cache.run_pending_tasks().await;
        let mut stats = CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
            hit_rate: 0.0,
            boards: self.boards.len() as u64,
        };
        stats.hit_rate = stats.calculate_hit_rate();
        Ok(stats)
    }

    async fn size(&self) -> Result<usize> {
        // Run pending tasks to ensure entry_count is accurate
        self.cache.run_pending_tasks().await;
        Ok(self.cache.entry_count() as usize)
    }

    fn provider_name(&self) -> &str {
        PROVIDER_MOKA
    }
}

impl std::fmt::Debug for MokaCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheProvider")
            .field("max_entries", &self.max_entries)
            .field("entries", &self.cache.entry_count())
            .field("boards", &self.boards.len())
            .finish()
    }
}
