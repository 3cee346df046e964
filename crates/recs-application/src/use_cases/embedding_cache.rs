//! Embedding Cache Use Case
//!
//! Typed front over a [`CacheProvider`] holding the "current" vectors of the
//! engine: product embeddings, user long-term and session embeddings, view
//! counters, cached ranked results and applied-job markers.
//!
//! Every vector is written as one serialized value, so a reader sees either
//! the previous or the new vector of a key and never a mix of both.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use recs_domain::error::Result;
use recs_domain::ports::providers::{CacheEntryConfig, CacheProvider, CacheStats};
use recs_domain::value_objects::{
    CacheConfig, Embedding, ItemId, RankedResult, SearchStrategy, UserId, UserVectors,
};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Cache key helpers
mod cache_keys {
    use recs_domain::value_objects::{ItemId, UserId};
    use uuid::Uuid;

    pub const VIEWS_BOARD: &str = "views";

    #[inline]
    pub fn product(id: ItemId) -> String {
        format!("product:{id}:embedding")
    }

    #[inline]
    pub fn long_term(id: UserId) -> String {
        format!("user:{id}:long_term")
    }

    #[inline]
    pub fn session(id: UserId) -> String {
        format!("user:{id}:session")
    }

    #[inline]
    pub fn results_generation(id: UserId) -> String {
        format!("results:{id}:generation")
    }

    #[inline]
    pub fn results(id: UserId, generation: i64, request_key: &str) -> String {
        format!("results:{id}:{generation}:{request_key}")
    }

    #[inline]
    pub fn applied(event_id: Uuid) -> String {
        format!("feedback:applied:{event_id}")
    }
}

/// A ranked result list together with the strategy that retrieved it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRanking {
    /// Strategy the search used
    pub strategy: SearchStrategy,
    /// Ranked results, best first
    pub results: Vec<RankedResult>,
}

/// Embedding cache over a pluggable backend
///
/// Product and long-term vectors are kept without TTL unless
/// `product_ttl_secs` is configured; session vectors carry the TTL the
/// caller supplies. Every write checks the configured dimension.
#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    provider: Arc<dyn CacheProvider>,
    dimensions: usize,
    product_ttl: Option<Duration>,
    result_ttl: Duration,
}

impl EmbeddingCache {
    /// Create a cache for vectors of `dimensions`
    pub fn new(provider: Arc<dyn CacheProvider>, dimensions: usize, config: &CacheConfig) -> Self {
        Self {
            provider,
            dimensions,
            product_ttl: config.product_ttl_secs.map(Duration::from_secs),
            result_ttl: Duration::from_secs(config.result_ttl_secs),
        }
    }

    /// Backend provider
    pub fn provider(&self) -> &Arc<dyn CacheProvider> {
        &self.provider
    }

    /// Dimension every stored vector must have
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    // ------------------------------------------------------------------
    // Serialization helpers
    // ------------------------------------------------------------------

    async fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(json) = self.provider.get_json(key).await? else {
            return Ok(None);
        };
        Ok(decode(key, &json))
    }

    async fn set_value<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        config: CacheEntryConfig,
    ) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.provider.set_json(key, &json, config).await
    }

    async fn get_embedding(&self, key: &str) -> Result<Option<Embedding>> {
        let embedding: Option<Embedding> = self.get_value(key).await?;
        if let Some(embedding) = &embedding {
            embedding.ensure_dimensions(self.dimensions)?;
        }
        Ok(embedding)
    }

    async fn set_embedding(
        &self,
        key: &str,
        embedding: &Embedding,
        config: CacheEntryConfig,
    ) -> Result<()> {
        embedding.ensure_dimensions(self.dimensions)?;
        self.set_value(key, embedding, config).await
    }

    fn product_entry(&self) -> CacheEntryConfig {
        CacheEntryConfig { ttl: self.product_ttl }
    }

    // ------------------------------------------------------------------
    // Product vectors
    // ------------------------------------------------------------------

    /// Current embedding of a product
    pub async fn get_product_embedding(&self, item_id: ItemId) -> Result<Option<Embedding>> {
        self.get_embedding(&cache_keys::product(item_id)).await
    }

    /// Replace the embedding of a product
    pub async fn set_product_embedding(&self, item_id: ItemId, embedding: &Embedding) -> Result<()> {
        self.set_embedding(&cache_keys::product(item_id), embedding, self.product_entry())
            .await
    }

    /// Embeddings of many products in one round trip; misses are left out
    pub async fn get_product_embeddings(
        &self,
        item_ids: &[ItemId],
    ) -> Result<HashMap<ItemId, Embedding>> {
        let keys: Vec<String> = item_ids.iter().map(|id| cache_keys::product(*id)).collect();
        let values = self.provider.get_many_json(&keys).await?;

        let mut found = HashMap::with_capacity(values.len());
        for ((id, key), json) in item_ids.iter().zip(&keys).zip(values) {
            let Some(json) = json else { continue };
            if let Some(embedding) = decode::<Embedding>(key, &json) {
                embedding.ensure_dimensions(self.dimensions)?;
                found.insert(*id, embedding);
            }
        }
        Ok(found)
    }

    /// Replace the embeddings of many products in one round trip
    pub async fn set_product_embeddings(&self, items: &[(ItemId, Embedding)]) -> Result<()> {
        let mut entries = Vec::with_capacity(items.len());
        for (id, embedding) in items {
            embedding.ensure_dimensions(self.dimensions)?;
            entries.push((cache_keys::product(*id), serde_json::to_string(embedding)?));
        }
        self.provider
            .set_many_json(&entries, self.product_entry())
            .await
    }

    // ------------------------------------------------------------------
    // User vectors
    // ------------------------------------------------------------------

    /// Long-term taste vector of a user
    pub async fn get_long_term(&self, user_id: UserId) -> Result<Option<Embedding>> {
        self.get_embedding(&cache_keys::long_term(user_id)).await
    }

    /// Replace the long-term vector of a user (no TTL)
    pub async fn set_long_term(&self, user_id: UserId, embedding: &Embedding) -> Result<()> {
        self.set_embedding(
            &cache_keys::long_term(user_id),
            embedding,
            CacheEntryConfig::persistent(),
        )
        .await
    }

    /// Session vector of a user, absent once its TTL has elapsed
    pub async fn get_session(&self, user_id: UserId) -> Result<Option<Embedding>> {
        self.get_embedding(&cache_keys::session(user_id)).await
    }

    /// Replace the session vector of a user, expiring after `ttl`
    pub async fn set_session(
        &self,
        user_id: UserId,
        embedding: &Embedding,
        ttl: Duration,
    ) -> Result<()> {
        self.set_embedding(
            &cache_keys::session(user_id),
            embedding,
            CacheEntryConfig::default().with_ttl(ttl),
        )
        .await
    }

    /// Remaining lifetime of a user's session vector
    pub async fn session_ttl_remaining(&self, user_id: UserId) -> Result<Option<Duration>> {
        self.provider
            .time_to_live(&cache_keys::session(user_id))
            .await
    }

    /// Both vectors of a user
    pub async fn user_vectors(&self, user_id: UserId) -> Result<UserVectors> {
        Ok(UserVectors {
            long_term: self.get_long_term(user_id).await?,
            session: self.get_session(user_id).await?,
        })
    }

    // ------------------------------------------------------------------
    // View counters
    // ------------------------------------------------------------------

    /// Count one view of an item, returning the new count
    pub async fn track_view(&self, item_id: ItemId) -> Result<u64> {
        let count = self
            .provider
            .increment_score(cache_keys::VIEWS_BOARD, &item_id.to_string(), 1.0)
            .await?;
        Ok(count.max(0.0) as u64)
    }

    /// Views recorded for an item
    pub async fn view_count(&self, item_id: ItemId) -> Result<u64> {
        Ok(self
            .provider
            .score(cache_keys::VIEWS_BOARD, &item_id.to_string())
            .await?
            .map_or(0, |count| count.max(0.0) as u64))
    }

    /// Views recorded for each of `item_ids`; items never viewed are left out
    pub async fn view_counts(&self, item_ids: &[ItemId]) -> Result<HashMap<ItemId, u64>> {
        let board = self.provider.board(cache_keys::VIEWS_BOARD).await?;
        Ok(item_ids
            .iter()
            .filter_map(|id| {
                board
                    .get(&id.to_string())
                    .map(|count| (*id, count.max(0.0) as u64))
            })
            .collect())
    }

    /// Most viewed items, highest count first
    pub async fn hot_items(&self, limit: usize) -> Result<Vec<(ItemId, u64)>> {
        let top = self
            .provider
            .top_scores(cache_keys::VIEWS_BOARD, limit)
            .await?;
        Ok(top
            .into_iter()
            .filter_map(|(member, count)| {
                member
                    .parse::<u64>()
                    .ok()
                    .map(|id| (ItemId(id), count.max(0.0) as u64))
            })
            .collect())
    }

    /// Whether an item has at least `threshold` views
    pub async fn is_hot(&self, item_id: ItemId, threshold: u64) -> Result<bool> {
        Ok(self.view_count(item_id).await? >= threshold)
    }

    // ------------------------------------------------------------------
    // Ranked result cache
    // ------------------------------------------------------------------

    /// Current result generation of a user
    ///
    /// Read it before the user's vectors and hand the same value to
    /// [`Self::cache_ranked_results`]: results are then filed under the
    /// generation their inputs belong to, and a concurrent invalidation
    /// leaves them unreachable.
    pub async fn results_generation(&self, user_id: UserId) -> Result<i64> {
        Ok(self
            .provider
            .get_json(&cache_keys::results_generation(user_id))
            .await?
            .and_then(|raw| raw.parse::<i64>().ok())
            .unwrap_or(0))
    }

    /// Cached ranking for a user's request under `generation`
    pub async fn cached_ranked_results(
        &self,
        user_id: UserId,
        generation: i64,
        request_key: &str,
    ) -> Result<Option<CachedRanking>> {
        self.get_value(&cache_keys::results(user_id, generation, request_key))
            .await
    }

    /// Cache a ranking for a user's request under `generation`
    pub async fn cache_ranked_results(
        &self,
        user_id: UserId,
        generation: i64,
        request_key: &str,
        ranking: &CachedRanking,
    ) -> Result<()> {
        self.set_value(
            &cache_keys::results(user_id, generation, request_key),
            ranking,
            CacheEntryConfig::default().with_ttl(self.result_ttl),
        )
        .await
    }

    /// Make every cached result of a user stale
    ///
    /// Bumps the user's result generation; entries of older generations are
    /// no longer read and age out with their TTL.
    pub async fn invalidate_user_results(&self, user_id: UserId) -> Result<i64> {
        self.provider
            .increment(&cache_keys::results_generation(user_id), 1)
            .await
    }

    // ------------------------------------------------------------------
    // Applied-job markers
    // ------------------------------------------------------------------

    /// Whether a background job for `event_id` already ran
    pub async fn is_applied(&self, event_id: Uuid) -> Result<bool> {
        self.provider.exists(&cache_keys::applied(event_id)).await
    }

    /// Record that the background job for `event_id` ran
    pub async fn mark_applied(&self, event_id: Uuid, ttl: Duration) -> Result<()> {
        self.provider
            .set_json(
                &cache_keys::applied(event_id),
                "true",
                CacheEntryConfig::default().with_ttl(ttl),
            )
            .await
    }

    /// Backend statistics
    pub async fn stats(&self) -> Result<CacheStats> {
        self.provider.stats().await
    }
}

/// Decode a cached value; undecodable entries count as misses
fn decode<T: DeserializeOwned>(key: &str, json: &str) -> Option<T> {
    match serde_json::from_str(json) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding undecodable cache entry");
            None
        }
    }
}
