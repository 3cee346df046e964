//! In-memory catalog provider
//!
//! Reference implementation of the catalog store contract, backed by
//! concurrent maps. Used as the catalog for tests and local runs. Can be
//! switched offline to exercise the engine's degradation paths.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::seq::IndexedRandom;
use recs_domain::error::{Error, Result};
use recs_domain::ports::providers::CatalogProvider;
use recs_domain::value_objects::{
    BrandId, InteractionType, ItemAttributes, ItemId, PopularityStats, SearchFilters, UserId,
};

use crate::constants::PROVIDER_IN_MEMORY_CATALOG;

/// In-memory catalog store
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: DashMap<ItemId, ItemAttributes>,
    popularity: DashMap<ItemId, PopularityStats>,
    purchases: DashMap<UserId, Vec<f64>>,
    brand_history: DashMap<UserId, Vec<(BrandId, f64)>>,
    offline: AtomicBool,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item
    pub fn upsert_item(&self, id: ItemId, attributes: ItemAttributes) {
        self.items.insert(id, attributes);
    }

    /// Insert or replace many items
    pub fn upsert_items<I: IntoIterator<Item = (ItemId, ItemAttributes)>>(&self, items: I) {
        for (id, attributes) in items {
            self.items.insert(id, attributes);
        }
    }

    /// Replace an item's aggregate popularity
    pub fn set_popularity(&self, id: ItemId, stats: PopularityStats) {
        self.popularity.insert(id, stats);
    }

    /// Record an interaction into the aggregates
    ///
    /// Updates the item's popularity counters, the user's purchase prices
    /// (for purchases of priced items) and the user's brand history
    /// (weighted by the interaction weight).
    pub fn record_interaction(
        &self,
        user_id: UserId,
        item_id: ItemId,
        interaction: InteractionType,
        at: DateTime<Utc>,
    ) {
        {
            let mut stats = self.popularity.entry(item_id).or_default();
            match interaction {
                InteractionType::View | InteractionType::Click => stats.views += 1,
                InteractionType::Like | InteractionType::ThumbsUp => stats.likes += 1,
                InteractionType::AddToCart => stats.carts += 1,
                InteractionType::Purchase => stats.purchases += 1,
                InteractionType::Dislike | InteractionType::ThumbsDown | InteractionType::Rating => {}
            }
            stats.last_interaction = Some(stats.last_interaction.map_or(at, |prev| prev.max(at)));
        }

        let Some(attributes) = self.items.get(&item_id).map(|a| a.value().clone()) else {
            return;
        };
        if interaction == InteractionType::Purchase {
            if let Some(price) = attributes.price {
                self.purchases.entry(user_id).or_default().push(price);
            }
        }
        if let Some(brand) = attributes.brand_id {
            let weight = f64::from(interaction.weight(None));
            self.brand_history
                .entry(user_id)
                .or_default()
                .push((brand, weight));
        }
    }

    /// Simulate an outage: every query fails with `CatalogUnavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn ensure_online(&self, operation: &str) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(Error::catalog_unavailable(format!(
                "{operation}: catalog offline"
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogProvider for InMemoryCatalog {
    async fn item_attributes(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, ItemAttributes>> {
        self.ensure_online("item_attributes")?;
        Ok(ids
            .iter()
            .filter_map(|id| self.items.get(id).map(|a| (*id, a.value().clone())))
            .collect())
    }

    async fn matching_item_ids(&self, filters: &SearchFilters) -> Result<HashSet<ItemId>> {
        self.ensure_online("matching_item_ids")?;
        Ok(self
            .items
            .iter()
            .filter(|entry| filters.matches(entry.value()))
            .map(|entry| *entry.key())
            .collect())
    }

    async fn count_matching(&self, filters: &SearchFilters) -> Result<usize> {
        self.ensure_online("count_matching")?;
        Ok(self
            .items
            .iter()
            .filter(|entry| filters.matches(entry.value()))
            .count())
    }

    async fn catalog_size(&self) -> Result<usize> {
        self.ensure_online("catalog_size")?;
        Ok(self.items.len())
    }

    async fn sample_item_ids(&self, n: usize) -> Result<Vec<ItemId>> {
        self.ensure_online("sample_item_ids")?;
        let ids: Vec<ItemId> = self.items.iter().map(|entry| *entry.key()).collect();
        let sample = {
            let mut rng = rand::rng();
            ids.choose_multiple(&mut rng, n).copied().collect()
        };
        Ok(sample)
    }

    async fn popularity_stats(&self, ids: &[ItemId]) -> Result<HashMap<ItemId, PopularityStats>> {
        self.ensure_online("popularity_stats")?;
        Ok(ids
            .iter()
            .filter_map(|id| self.popularity.get(id).map(|s| (*id, s.value().clone())))
            .collect())
    }

    async fn user_purchase_prices(&self, user_id: UserId) -> Result<Vec<f64>> {
        self.ensure_online("user_purchase_prices")?;
        Ok(self
            .purchases
            .get(&user_id)
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }

    async fn user_brand_interactions(&self, user_id: UserId) -> Result<Vec<(BrandId, f64)>> {
        self.ensure_online("user_brand_interactions")?;
        Ok(self
            .brand_history
            .get(&user_id)
            .map(|h| h.value().clone())
            .unwrap_or_default())
    }

    fn provider_name(&self) -> &str {
        PROVIDER_IN_MEMORY_CATALOG
    }
}
