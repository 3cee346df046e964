//! # Recs Engine
//!
//! Retrieval, personalization and ranking for product recommendations.
//!
//! This crate is the public facade over the layered workspace crates.
//!
//! ## Features
//!
//! - **Filtered vector search**: subset or overfetching postfilter strategy
//!   chosen by estimated filter selectivity
//! - **Personalization**: context-weighted blend of long-term, session and
//!   query vectors
//! - **Re-ranking**: linear model over similarity, popularity, price and
//!   brand affinity
//! - **Feedback loop**: inline session updates, deferred idempotent
//!   long-term updates
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use recs::infrastructure::{ConfigLoader, EngineContext};
//! use recs::application::RecommendRequest;
//!
//! let config = ConfigLoader::new().load()?;
//! let context = EngineContext::from_config(config, catalog).await?;
//! context.index_items(records).await?;
//!
//! let recs = context
//!     .recommendations()
//!     .recommend(RecommendRequest::new(20).for_user(user_id))
//!     .await?;
//! ```
//!
//! ## Architecture
//!
//! - `domain` - value objects, errors and provider ports
//! - `application` - search, blending, ranking, cache and feedback use cases
//! - `providers` - in-memory index, moka/null cache, reference catalog
//! - `infrastructure` - configuration, logging and the composition root

/// Domain layer - value objects, errors and provider ports
///
/// Re-exports from the domain crate for convenience
pub mod domain {
    pub use recs_domain::*;
}

/// Application layer - use cases and service interfaces
///
/// Re-exports from the application crate for convenience
pub mod application {
    pub use recs_application::*;
}

/// Provider implementations
///
/// Re-exports from the providers crate for convenience
pub mod providers {
    pub use recs_providers::*;
}

/// Infrastructure layer - configuration, logging and composition root
///
/// Re-exports from the infrastructure crate for convenience
pub mod infrastructure {
    pub use recs_infrastructure::*;
}

// Re-export commonly used domain types at the crate root
pub use domain::error::{Error, Result};
pub use domain::value_objects::*;

// Re-export the entry points
pub use application::{
    FeedbackServiceInterface, FilteredSearchInterface, RecommendRequest,
    RecommendationServiceInterface, Recommendations,
};
pub use infrastructure::{AppConfig, ConfigLoader, EngineContext};
