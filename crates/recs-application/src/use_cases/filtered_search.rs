//! Filtered Search Use Case
//!
//! Combines nearest-neighbor search with attribute filters using one of two
//! strategies:
//!
//! - **subset**: fetch the matching id set from the catalog, then search
//!   only those ids. Chosen when the estimated selectivity is below
//!   `selectivity_threshold`.
//! - **postfilter**: overfetch `k * factor` unfiltered neighbors and drop
//!   the non-matching ones, doubling the factor up to
//!   `max_overfetch_factor` while fewer than `k` survive.
//!
//! Catalog failures degrade: an estimator failure falls back to
//! postfilter, an id-set or attribute failure to an unrestricted search
//! marked `degraded`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use recs_domain::error::{Error, Result};
use recs_domain::ports::providers::{CatalogProvider, SelectivityEstimator, VectorIndexProvider};
use recs_domain::value_objects::{
    Embedding, ItemAttributes, ItemId, Neighbor, SearchConfig, SearchFilters, SearchResults,
    SearchStrategy,
};

use super::embedding_cache::EmbeddingCache;
use crate::ports::services::FilteredSearchInterface;

/// Filtered search service
pub struct FilteredSearchService {
    index: Arc<dyn VectorIndexProvider>,
    catalog: Arc<dyn CatalogProvider>,
    estimator: Arc<dyn SelectivityEstimator>,
    cache: Arc<EmbeddingCache>,
    config: SearchConfig,
}

impl FilteredSearchService {
    /// Create the service with injected dependencies
    pub fn new(
        index: Arc<dyn VectorIndexProvider>,
        catalog: Arc<dyn CatalogProvider>,
        estimator: Arc<dyn SelectivityEstimator>,
        cache: Arc<EmbeddingCache>,
        config: SearchConfig,
    ) -> Self {
        Self {
            index,
            catalog,
            estimator,
            cache,
            config,
        }
    }

    /// Search configuration
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Pick a strategy from the estimated selectivity
    async fn choose_strategy(&self, filters: &SearchFilters) -> SearchStrategy {
        match self.estimator.estimate(filters).await {
            Ok(selectivity) if selectivity < self.config.selectivity_threshold => {
                tracing::debug!(selectivity, estimator = self.estimator.name(), "using subset strategy");
                SearchStrategy::Subset
            }
            Ok(selectivity) => {
                tracing::debug!(selectivity, estimator = self.estimator.name(), "using postfilter strategy");
                SearchStrategy::Postfilter
            }
            Err(e) => {
                tracing::warn!(error = %e, "selectivity estimation failed, using postfilter");
                SearchStrategy::Postfilter
            }
        }
    }

    /// Unfiltered search reported as a degraded result
    async fn degraded_search(
        &self,
        query: &Embedding,
        k: usize,
        started: Instant,
        cause: &Error,
    ) -> Result<SearchResults> {
        tracing::warn!(error = %cause, "catalog unavailable, serving unrestricted results");
        let neighbors = self.index.search(query, k).await?;
        Ok(
            SearchResults::from_neighbors(neighbors, k, SearchStrategy::Unfiltered, started.elapsed())
                .degraded(),
        )
    }

    async fn search_subset(
        &self,
        query: &Embedding,
        k: usize,
        filters: &SearchFilters,
        started: Instant,
    ) -> Result<SearchResults> {
        let allowed = match self.catalog.matching_item_ids(filters).await {
            Ok(ids) => ids,
            Err(e) if e.is_degradation() => {
                return self.degraded_search(query, k, started, &e).await;
            }
            Err(e) => return Err(e),
        };
        let neighbors = if allowed.is_empty() {
            Vec::new()
        } else {
            self.index.search_subset(query, k, &allowed).await?
        };
        Ok(SearchResults::from_neighbors(
            neighbors,
            k,
            SearchStrategy::Subset,
            started.elapsed(),
        ))
    }

    async fn search_postfilter(
        &self,
        query: &Embedding,
        k: usize,
        filters: &SearchFilters,
        started: Instant,
    ) -> Result<SearchResults> {
        let catalog_size = self.index.len();
        let max_factor = self.config.max_overfetch_factor.max(1);
        let mut factor = self.config.overfetch_factor.clamp(1, max_factor);
        let mut attributes: HashMap<ItemId, ItemAttributes> = HashMap::new();
        let mut rounds = 0usize;

        loop {
            rounds += 1;
            let fetch = k.saturating_mul(factor).min(catalog_size);
            let neighbors = self.index.search(query, fetch).await?;

            let missing: Vec<ItemId> = neighbors
                .iter()
                .map(|n| n.item_id)
                .filter(|id| !attributes.contains_key(id))
                .collect();
            if !missing.is_empty() {
                match self.catalog.item_attributes(&missing).await {
                    Ok(fetched) => attributes.extend(fetched),
                    Err(e) if e.is_degradation() => {
                        tracing::warn!(error = %e, "attribute fetch failed, serving unrestricted results");
                        return Ok(SearchResults::from_neighbors(
                            neighbors,
                            k,
                            SearchStrategy::Unfiltered,
                            started.elapsed(),
                        )
                        .degraded());
                    }
                    Err(e) => return Err(e),
                }
            }

            let exhausted = fetch >= catalog_size || factor >= max_factor;
            let survivors: Vec<Neighbor> = neighbors
                .into_iter()
                .filter(|n| attributes.get(&n.item_id).is_some_and(|a| filters.matches(a)))
                .collect();

            if survivors.len() >= k || exhausted {
                tracing::debug!(
                    rounds,
                    factor,
                    survivors = survivors.len(),
                    "postfilter search finished"
                );
                return Ok(SearchResults::from_neighbors(
                    survivors,
                    k,
                    SearchStrategy::Postfilter,
                    started.elapsed(),
                ));
            }
            factor = factor.saturating_mul(2).min(max_factor);
        }
    }

    /// Drop `exclude` from results and renumber the hits
    fn without_item(results: SearchResults, exclude: ItemId, k: usize) -> SearchResults {
        let neighbors: Vec<Neighbor> = results
            .hits
            .iter()
            .filter(|h| h.item_id != exclude)
            .map(|h| Neighbor::new(h.item_id, h.distance))
            .collect();
        let mut trimmed =
            SearchResults::from_neighbors(neighbors, k, results.strategy, results.elapsed);
        trimmed.degraded = results.degraded;
        trimmed
    }
}

#[async_trait]
impl FilteredSearchInterface for FilteredSearchService {
    async fn search(
        &self,
        query: &Embedding,
        k: usize,
        filters: &SearchFilters,
        strategy: Option<SearchStrategy>,
    ) -> Result<SearchResults> {
        let started = Instant::now();
        query.ensure_dimensions(self.index.dimensions())?;
        if k == 0 || self.index.is_empty() {
            return Ok(SearchResults::empty(k, SearchStrategy::Unfiltered));
        }

        let strategy = if filters.is_unrestricted() {
            SearchStrategy::Unfiltered
        } else {
            match strategy {
                Some(SearchStrategy::Unfiltered) | None => self.choose_strategy(filters).await,
                Some(forced) => forced,
            }
        };

        let results = match strategy {
            SearchStrategy::Unfiltered => {
                let neighbors = self.index.search(query, k).await?;
                SearchResults::from_neighbors(neighbors, k, strategy, started.elapsed())
            }
            SearchStrategy::Subset => self.search_subset(query, k, filters, started).await?,
            SearchStrategy::Postfilter => {
                self.search_postfilter(query, k, filters, started).await?
            }
        };
        tracing::debug!(
            k,
            strategy = results.strategy.as_str(),
            total_found = results.total_found,
            degraded = results.degraded,
            elapsed_ms = results.elapsed.as_millis() as u64,
            "filtered search"
        );
        Ok(results)
    }

    async fn search_similar(
        &self,
        item_id: ItemId,
        k: usize,
        filters: &SearchFilters,
        exclude_self: bool,
    ) -> Result<SearchResults> {
        let Some(vector) = self.item_vector(item_id).await? else {
            tracing::debug!(item_id = item_id.get(), "no vector for similar-item search");
            return Ok(SearchResults::empty(k, SearchStrategy::Unfiltered));
        };
        if !exclude_self {
            return self.search(&vector, k, filters, None).await;
        }
        let results = self
            .search(&vector, k.saturating_add(1), filters, None)
            .await?;
        Ok(Self::without_item(results, item_id, k))
    }

    async fn item_vector(&self, item_id: ItemId) -> Result<Option<Embedding>> {
        match self.cache.get_product_embedding(item_id).await {
            Ok(Some(vector)) => return Ok(Some(vector)),
            Ok(None) => {}
            Err(e) if e.is_integrity() => return Err(e),
            Err(e) => tracing::warn!(item_id = item_id.get(), error = %e, "cache read failed"),
        }
        let vector = self.index.reconstruct(item_id).await?;
        if let Some(vector) = &vector {
            if let Err(e) = self.cache.set_product_embedding(item_id, vector).await {
                tracing::warn!(item_id = item_id.get(), error = %e, "cache warm failed");
            }
        }
        Ok(vector)
    }

    async fn retain_matching(
        &self,
        item_ids: Vec<ItemId>,
        filters: &SearchFilters,
    ) -> Result<(Vec<ItemId>, bool)> {
        if filters.is_unrestricted() || item_ids.is_empty() {
            return Ok((item_ids, false));
        }
        match self.catalog.item_attributes(&item_ids).await {
            Ok(attributes) => {
                let kept = item_ids
                    .into_iter()
                    .filter(|id| attributes.get(id).is_some_and(|a| filters.matches(a)))
                    .collect();
                Ok((kept, false))
            }
            Err(e) if e.is_degradation() => {
                tracing::warn!(error = %e, "attribute fetch failed, ids left unfiltered");
                Ok((item_ids, true))
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for FilteredSearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredSearchService")
            .field("index", &self.index.provider_name())
            .field("catalog", &self.catalog.provider_name())
            .field("estimator", &self.estimator.name())
            .field("config", &self.config)
            .finish()
    }
}
