//! Application Port Interfaces
//!
//! - **services.rs** - Service interfaces implemented by the use cases
//!
//! Provider ports (vector index, cache, catalog, selectivity) live in
//! `recs-domain` and are re-exported here for convenience.

/// Application service interfaces
pub mod services;

pub use recs_domain::ports::providers::{
    CacheEntryConfig, CacheProvider, CacheStats, CatalogProvider, IndexStats,
    SelectivityEstimator, VectorIndexProvider,
};
pub use services::{
    FeedbackOutcome, FeedbackServiceInterface, FilteredSearchInterface,
    RecommendationServiceInterface,
};
