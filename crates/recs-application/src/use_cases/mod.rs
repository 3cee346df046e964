//! Use Cases
//!
//! | Use case | Interface | Description |
//! |----------|-----------|-------------|
//! | [`EmbeddingCache`] | - | Typed store for current vectors, counters and result cache |
//! | [`FilteredSearchService`] | `FilteredSearchInterface` | Subset / postfilter search |
//! | [`SignalCollector`] | - | Ranking signals from the catalog, with fallbacks |
//! | [`FeedbackUpdater`] | `FeedbackServiceInterface` | Session EMA + deferred long-term EMA |
//! | [`RecommendationService`] | `RecommendationServiceInterface` | Blend, search, rank within budget |

pub mod embedding_cache;
pub mod feedback;
pub mod filtered_search;
pub mod recommendation;
pub mod signal_collector;

pub use embedding_cache::{CachedRanking, EmbeddingCache};
pub use feedback::{
    FeedbackUpdater, LongTermJob, LongTermUpdateQueue, LongTermUpdateWorker, ema_update,
};
pub use filtered_search::FilteredSearchService;
pub use recommendation::{RecommendRequest, RecommendationService, Recommendations};
pub use signal_collector::SignalCollector;
