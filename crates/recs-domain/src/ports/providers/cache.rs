//! Cache Provider Port
//!
//! Port for the key-value backend behind the embedding cache. Values are
//! stored as whole JSON strings, so a reader sees either the previous or
//! the new value of a key, never a partial write.
//!
//! Besides plain keys the backend keeps integer counters and named score
//! boards (member → score), used for view counts and result-cache
//! generations.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Cache Entry Configuration
///
/// Configures how a cache entry is stored. Entries without a TTL live
/// until evicted or deleted.
///
/// # Example
///
/// ```
/// use recs_domain::ports::providers::cache::CacheEntryConfig;
/// use std::time::Duration;
///
/// let config = CacheEntryConfig::default().with_ttl(Duration::from_secs(600));
/// assert_eq!(config.ttl, Some(Duration::from_secs(600)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntryConfig {
    /// Time to live for the cache entry
    pub ttl: Option<Duration>,
}

impl CacheEntryConfig {
    /// Entry that never expires
    pub fn persistent() -> Self {
        Self { ttl: None }
    }

    /// Set the TTL for the cache entry
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set TTL in seconds
    pub fn with_ttl_secs(mut self, secs: u64) -> Self {
        self.ttl = Some(Duration::from_secs(secs));
        self
    }
}

/// Cache Operation Statistics
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of cache entries
    pub entries: u64,
    /// Cache hit rate (0.0 to 1.0)
    pub hit_rate: f64,
    /// Number of score boards
    pub boards: u64,
}

impl CacheStats {
    /// Calculate hit rate from hits and misses
    pub fn calculate_hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Cache Provider Port
///
/// # Implementations
///
/// - **Moka**: in-process cache with per-entry TTL
/// - **Null**: stores nothing, every read misses
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug {
    /// Get a value as JSON string; `None` if absent or expired
    async fn get_json(&self, key: &str) -> Result<Option<String>>;

    /// Store a JSON string, replacing any previous value atomically
    async fn set_json(&self, key: &str, value: &str, config: CacheEntryConfig) -> Result<()>;

    /// Batch read, one slot per requested key in request order
    async fn get_many_json(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get_json(key).await?);
        }
        Ok(values)
    }

    /// Batch write with a shared entry configuration
    async fn set_many_json(
        &self,
        entries: &[(String, String)],
        config: CacheEntryConfig,
    ) -> Result<()> {
        for (key, value) in entries {
            self.set_json(key, value, config.clone()).await?;
        }
        Ok(())
    }

    /// Delete a key; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Whether a key exists and has not expired
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Remaining lifetime of a key
    ///
    /// `None` when the key is absent or has no expiry.
    async fn time_to_live(&self, key: &str) -> Result<Option<Duration>>;

    /// Add `delta` to an integer counter (created at 0) and return the new value
    async fn increment(&self, key: &str, delta: i64) -> Result<i64>;

    /// Add `delta` to a member's score on a board and return the new score
    async fn increment_score(&self, board: &str, member: &str, delta: f64) -> Result<f64>;

    /// Score of one member
    async fn score(&self, board: &str, member: &str) -> Result<Option<f64>>;

    /// Highest scores on a board, descending, ties by member ascending
    async fn top_scores(&self, board: &str, limit: usize) -> Result<Vec<(String, f64)>>;

    /// Snapshot of a board as a map
    async fn board(&self, board: &str) -> Result<HashMap<String, f64>>;

    /// Clear all values, counters and boards
    async fn clear(&self) -> Result<()>;

    /// Get cache statistics
    async fn stats(&self) -> Result<CacheStats>;

    /// Get the cache size (number of entries)
    async fn size(&self) -> Result<usize>;

    /// Get the name/identifier of this provider implementation
    fn provider_name(&self) -> &str;
}
