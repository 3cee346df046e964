//! Selectivity estimators
//!
//! Two ways of estimating what fraction of the catalog a filter matches:
//! an exact count from the catalog, or evaluating the filter on a random
//! sample of item attributes.

use std::sync::Arc;

use async_trait::async_trait;
use recs_domain::error::Result;
use recs_domain::ports::providers::{CatalogProvider, SelectivityEstimator};
use recs_domain::value_objects::SearchFilters;

/// Exact selectivity: matching count over catalog size
#[derive(Debug, Clone)]
pub struct ExactCountEstimator {
    catalog: Arc<dyn CatalogProvider>,
}

impl ExactCountEstimator {
    /// Create an estimator over `catalog`
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl SelectivityEstimator for ExactCountEstimator {
    async fn estimate(&self, filters: &SearchFilters) -> Result<f64> {
        if filters.is_unrestricted() {
            return Ok(1.0);
        }
        let total = self.catalog.catalog_size().await?;
        if total == 0 {
            return Ok(0.0);
        }
        let matching = self.catalog.count_matching(filters).await?;
        Ok((matching as f64 / total as f64).clamp(0.0, 1.0))
    }

    fn name(&self) -> &str {
        "exact"
    }
}

/// Sampled selectivity: fraction of a random sample matching the filter
#[derive(Debug, Clone)]
pub struct SamplingEstimator {
    catalog: Arc<dyn CatalogProvider>,
    sample_size: usize,
}

impl SamplingEstimator {
    /// Create an estimator sampling `sample_size` items per estimate
    pub fn new(catalog: Arc<dyn CatalogProvider>, sample_size: usize) -> Self {
        Self {
            catalog,
            sample_size: sample_size.max(1),
        }
    }
}

#[async_trait]
impl SelectivityEstimator for SamplingEstimator {
    async fn estimate(&self, filters: &SearchFilters) -> Result<f64> {
        if filters.is_unrestricted() {
            return Ok(1.0);
        }
        let sample = self.catalog.sample_item_ids(self.sample_size).await?;
        if sample.is_empty() {
            return Ok(0.0);
        }
        let attributes = self.catalog.item_attributes(&sample).await?;
        let matching = attributes.values().filter(|a| filters.matches(a)).count();
        Ok(matching as f64 / sample.len() as f64)
    }

    fn name(&self) -> &str {
        "sampling"
    }
}
