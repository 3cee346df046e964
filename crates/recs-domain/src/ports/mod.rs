//! Domain Port Interfaces
//!
//! Boundary contracts implemented by the providers layer. Application
//! services only ever hold `Arc<dyn Port>`, so tests swap in lightweight
//! in-memory implementations.

/// External service provider ports
pub mod providers;

pub use providers::{
    CacheEntryConfig, CacheProvider, CacheStats, CatalogProvider, IndexStats,
    SelectivityEstimator, VectorIndexProvider,
};
