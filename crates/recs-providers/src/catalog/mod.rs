//! Catalog Provider Implementations
//!
//! | Provider | Port | Description |
//! |----------|------|-------------|
//! | [`InMemoryCatalog`] | `CatalogProvider` | Map-backed catalog with an outage switch |
//! | [`ExactCountEstimator`] | `SelectivityEstimator` | Matching count over catalog size |
//! | [`SamplingEstimator`] | `SelectivityEstimator` | Filter evaluated on a random sample |

pub mod estimators;
pub mod in_memory;

pub use estimators::{ExactCountEstimator, SamplingEstimator};
pub use in_memory::InMemoryCatalog;
