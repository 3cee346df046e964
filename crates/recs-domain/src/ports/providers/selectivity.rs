//! Selectivity Estimator Port
//!
//! Estimates the fraction of the catalog a filter matches. The filtered
//! search compares the estimate against its threshold to pick a strategy;
//! how the estimate is obtained (exact count, sampling) is up to the
//! implementation.

use async_trait::async_trait;

use crate::error::Result;
use crate::value_objects::SearchFilters;

/// Selectivity Estimator
#[async_trait]
pub trait SelectivityEstimator: Send + Sync + std::fmt::Debug {
    /// Estimated matching fraction in `[0, 1]`
    async fn estimate(&self, filters: &SearchFilters) -> Result<f64>;

    /// Get the name/identifier of this estimator
    fn name(&self) -> &str;
}
