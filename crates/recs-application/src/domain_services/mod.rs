//! Domain Services
//!
//! Pure, synchronous computations used by the use cases.
//!
//! | Service | Description |
//! |---------|-------------|
//! | [`PersonalizationBlender`] | Context-weighted blend of user and query vectors |
//! | [`Ranker`] | Linear multi-signal re-ranking with per-signal scorers |

/// User/query vector blending
pub mod personalization;
/// Scorers and the linear re-ranker
pub mod ranking;

pub use personalization::{BlendOutcome, PersonalizationBlender};
pub use ranking::{
    BrandAffinityScorer, PopularityScorer, PriceAffinityScorer, Ranker, RankingSignals,
};
