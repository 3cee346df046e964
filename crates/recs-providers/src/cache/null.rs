//! Null cache provider for testing
//!
//! A cache provider implementation that doesn't store anything.
//! Useful for testing the fallback paths and for disabling caching.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use recs_domain::error::Result;
use recs_domain::ports::providers::cache::{CacheEntryConfig, CacheProvider, CacheStats};

use crate::constants::PROVIDER_NULL;

/// Null cache provider that doesn't store anything
///
/// Every read misses and every write is accepted and dropped. Counters
/// behave as if freshly created on each call.
///
/// # Example
///
/// ```rust
/// use recs_providers::cache::NullCacheProvider;
///
/// let provider = NullCacheProvider::new();
/// // All operations succeed but nothing is cached
/// ```
#[derive(Debug, Clone, Default)]
pub struct NullCacheProvider;

impl NullCacheProvider {
    /// Create a new null cache provider
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheProvider for NullCacheProvider {
    async fn get_json(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set_json(&self, _key: &str, _value: &str, _config: CacheEntryConfig) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }

    async fn time_to_live(&self, _key: &str) -> Result<Option<Duration>> {
        Ok(None)
    }

    async fn increment(&self, _key: &str, delta: i64) -> Result<i64> {
        Ok(delta)
    }

    async fn increment_score(&self, _board: &str, _member: &str, delta: f64) -> Result<f64> {
        Ok(delta)
    }

    async fn score(&self, _board: &str, _member: &str) -> Result<Option<f64>> {
        Ok(None)
    }

    async fn top_scores(&self, _board: &str, _limit: usize) -> Result<Vec<(String, f64)>> {
        Ok(Vec::new())
    }

    async fn board(&self, _board: &str) -> Result<HashMap<String, f64>> {
        Ok(HashMap::new())
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        Ok(CacheStats::default())
    }

    async fn size(&self) -> Result<usize> {
        Ok(0)
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NULL
    }
}
