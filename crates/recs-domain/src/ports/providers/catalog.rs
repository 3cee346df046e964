//! Catalog Provider Port
//!
//! Read access to the durable catalog store: item attributes, aggregate
//! popularity and per-user purchase history. Every method may fail with
//! [`Error::CatalogUnavailable`](crate::Error::CatalogUnavailable); the
//! engine degrades instead of failing the request.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::Result;
use crate::value_objects::{
    BrandId, ItemAttributes, ItemId, PopularityStats, SearchFilters, UserId,
};

/// Catalog Provider
#[async_trait]
pub trait CatalogProvider: Send + Sync + std::fmt::Debug {
    /// Attributes of the given items; unknown ids are omitted
    async fn item_attributes(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, ItemAttributes>>;

    /// Every item id matching `filters`
    async fn matching_item_ids(&self, filters: &SearchFilters) -> Result<HashSet<ItemId>>;

    /// Number of items matching `filters`
    async fn count_matching(&self, filters: &SearchFilters) -> Result<usize>;

    /// Total number of items
    async fn catalog_size(&self) -> Result<usize>;

    /// Uniform random sample of up to `n` item ids
    async fn sample_item_ids(&self, n: usize) -> Result<Vec<ItemId>>;

    /// Aggregate interaction counts; items without stats are omitted
    async fn popularity_stats(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, PopularityStats>>;

    /// Prices the user paid, oldest first
    async fn user_purchase_prices(&self, user_id: UserId) -> Result<Vec<f64>>;

    /// `(brand, interaction weight)` pairs from the user's history
    async fn user_brand_interactions(&self, user_id: UserId) -> Result<Vec<(BrandId, f64)>>;

    /// Get the name/identifier of this provider implementation
    fn provider_name(&self) -> &str;
}
