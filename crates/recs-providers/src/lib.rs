//! # Recs Engine - Provider Implementations
//!
//! Adapters implementing the ports defined in `recs-domain`.
//!
//! ## Provider Categories
//!
//! | Category | Port | Implementations |
//! |----------|------|-----------------|
//! | Vector Index | `VectorIndexProvider` | InMemory (Flat, IVF) |
//! | Cache | `CacheProvider` | Moka, Null |
//! | Catalog | `CatalogProvider` | InMemory |
//! | Selectivity | `SelectivityEstimator` | ExactCount, Sampling |
//!
//! ## Feature Flags
//!
//! ```toml
//! [dependencies]
//! recs-providers = { version = "0.1", default-features = false }
//! ```
//!
//! Without `cache-moka` only the null cache is available.

pub use recs_domain::error::{Error, Result};
pub use recs_domain::ports::providers::{
    CacheProvider, CatalogProvider, SelectivityEstimator, VectorIndexProvider,
};

/// Provider-specific constants
pub mod constants;

/// Vector index provider implementations
pub mod vector_index;

/// Cache provider implementations
pub mod cache;

/// Catalog and selectivity estimator implementations
pub mod catalog;

pub use cache::NullCacheProvider;
#[cfg(feature = "cache-moka")]
pub use cache::MokaCacheProvider;
pub use catalog::{ExactCountEstimator, InMemoryCatalog, SamplingEstimator};
pub use vector_index::InMemoryVectorIndex;
