//! External Provider Ports
//!
//! | Port | Description |
//! |------|-------------|
//! | VectorIndexProvider | Nearest-neighbor search over item embeddings |
//! | CacheProvider | Key-value backend with TTL, counters and score boards |
//! | CatalogProvider | Durable catalog store: attributes, popularity, purchase history |
//! | SelectivityEstimator | Filter selectivity estimation |

/// Cache provider port
pub mod cache;
/// Catalog provider port
pub mod catalog;
/// Selectivity estimator port
pub mod selectivity;
/// Vector index provider port
pub mod vector_index;

pub use cache::{CacheEntryConfig, CacheProvider, CacheStats};
pub use catalog::CatalogProvider;
pub use selectivity::SelectivityEstimator;
pub use vector_index::{IndexStats, VectorIndexProvider};
