//! Domain Value Objects
//!
//! Immutable values that carry the engine's invariants.
//!
//! ## Value Objects
//!
//! | Value Object | Description |
//! |--------------|-------------|
//! | [`Embedding`] | Unit-length vector of a fixed dimension |
//! | [`ItemRecord`] | Item id, embedding and filterable attributes |
//! | [`UserVectors`] | A user's long-term and session vectors |
//! | [`InteractionEvent`] | One recorded user interaction |
//! | [`SearchFilters`] | Conjunction of attribute predicates |
//! | [`SearchResults`] | Annotated nearest-neighbor result set |
//! | [`RankedResult`] | Re-ranked candidate with its signal breakdown |

/// Component configuration sections
pub mod config;
/// Unit-length embeddings and distance arithmetic
pub mod embedding;
/// Identifier newtypes
pub mod ids;
/// Interactions and their weight tables
pub mod interaction;
/// Catalog items
pub mod item;
/// Ranking weights, signals and user aggregates
pub mod ranking;
/// Filters and search results
pub mod search;
/// User vectors and request contexts
pub mod user;

pub use config::{
    CacheConfig, CacheProviderKind, ContextWeights, EstimatorKind, FeedbackConfig, IndexConfig,
    IndexKind, PersonalizationConfig, RankingConfig, RecommendConfig, SearchConfig,
};
pub use embedding::{Embedding, similarity_from_distance};
pub use ids::{BrandId, CategoryId, ItemId, MerchantId, UserId};
pub use interaction::{InteractionEvent, InteractionType};
pub use item::{ItemAttributes, ItemRecord};
pub use ranking::{
    BrandPreferences, PopularityStats, PriceProfile, RankedResult, RankingWeights,
    SignalBreakdown,
};
pub use search::{Neighbor, SearchFilters, SearchHit, SearchResults, SearchStrategy};
pub use user::{RequestContext, UserVectors};
