//! Configuration Value Objects
//!
//! Tunables of each engine component. Defaults come from
//! [`crate::constants`]; the infrastructure layer composes these sections
//! into the application configuration and validates them on load.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ranking::RankingWeights;
use super::user::RequestContext;
use crate::constants::*;

/// Vector index structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndexKind {
    /// Exact exhaustive scan
    #[default]
    Flat,
    /// Inverted file with a k-means coarse quantizer (approximate)
    Ivf {
        /// Number of inverted lists
        nlist: usize,
        /// Lists probed per query
        nprobe: usize,
    },
}

impl IndexKind {
    /// IVF with default list counts
    pub fn ivf() -> Self {
        Self::Ivf {
            nlist: INDEX_IVF_NLIST_DEFAULT,
            nprobe: INDEX_IVF_NPROBE_DEFAULT,
        }
    }

    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Ivf { .. } => "ivf",
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Embedding dimension every stored vector must have
    pub dimensions: usize,
    /// Index structure
    pub kind: IndexKind,
    /// Delta size relative to base that triggers a merge rebuild
    pub rebuild_growth_ratio: f64,
    /// Snapshot file loaded at startup and written on shutdown
    pub snapshot_path: Option<PathBuf>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dimensions: EMBEDDING_DIMENSION_DEFAULT,
            kind: IndexKind::Flat,
            rebuild_growth_ratio: INDEX_REBUILD_GROWTH_RATIO,
            snapshot_path: None,
        }
    }
}

impl IndexConfig {
    /// Flat index of the given dimension
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions,
            ..Self::default()
        }
    }
}

/// Selectivity estimation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    /// Ask the catalog for an exact match count
    #[default]
    Exact,
    /// Evaluate the filter on a random sample of items
    Sampling,
}

/// Filtered search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Selectivity below which the subset strategy is used
    pub selectivity_threshold: f64,
    /// Initial postfilter overfetch multiplier
    pub overfetch_factor: usize,
    /// Hard cap on the overfetch multiplier
    pub max_overfetch_factor: usize,
    /// Selectivity estimation method
    pub estimator: EstimatorKind,
    /// Sample size for [`EstimatorKind::Sampling`]
    pub sample_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            selectivity_threshold: SEARCH_SELECTIVITY_THRESHOLD,
            overfetch_factor: SEARCH_OVERFETCH_FACTOR,
            max_overfetch_factor: SEARCH_MAX_OVERFETCH_FACTOR,
            estimator: EstimatorKind::Exact,
            sample_size: SEARCH_SELECTIVITY_SAMPLE_SIZE,
        }
    }
}

/// Blend weights for one request context
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextWeights {
    /// Weight of the long-term vector
    pub long_term: f32,
    /// Weight of the session vector
    pub session: f32,
    /// Weight of the query or item vector
    pub query: f32,
}

impl ContextWeights {
    /// Build from a `(long_term, session, query)` tuple
    pub const fn from_tuple(weights: (f32, f32, f32)) -> Self {
        Self {
            long_term: weights.0,
            session: weights.1,
            query: weights.2,
        }
    }

    /// Whether every weight is finite and non-negative
    pub fn is_valid(&self) -> bool {
        [self.long_term, self.session, self.query]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
    }
}

/// Personalization blending configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalizationConfig {
    /// Weights for the feed context
    pub feed: ContextWeights,
    /// Weights for the search context
    pub search: ContextWeights,
    /// Weights for the similar-item context
    pub similar: ContextWeights,
    /// Default item weight for personalized similar items
    pub item_blend_ratio: f32,
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            feed: ContextWeights::from_tuple(BLEND_WEIGHTS_FEED),
            search: ContextWeights::from_tuple(BLEND_WEIGHTS_SEARCH),
            similar: ContextWeights::from_tuple(BLEND_WEIGHTS_SIMILAR),
            item_blend_ratio: BLEND_ITEM_RATIO_DEFAULT,
        }
    }
}

impl PersonalizationConfig {
    /// Weights for a request context
    pub fn weights_for(&self, context: RequestContext) -> ContextWeights {
        match context {
            RequestContext::Feed => self.feed,
            RequestContext::Search => self.search,
            RequestContext::Similar => self.similar,
        }
    }
}

/// Ranking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Linear model weights
    pub weights: RankingWeights,
    /// Score used when a signal is unavailable
    pub neutral_score: f64,
    /// Popularity half-life in days
    pub popularity_half_life_days: f64,
    /// Popularity weight of a view
    pub popularity_view_weight: f64,
    /// Popularity weight of a like
    pub popularity_like_weight: f64,
    /// Popularity weight of an add-to-cart
    pub popularity_cart_weight: f64,
    /// Popularity weight of a purchase
    pub popularity_purchase_weight: f64,
    /// Decayed raw popularity that maps to a score of 1.0
    pub popularity_saturation: f64,
    /// Minimum price deviation relative to the mean
    pub price_min_std_ratio: f64,
    /// Absolute minimum price deviation
    pub price_min_std_floor: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: RankingWeights::default(),
            neutral_score: RANKING_NEUTRAL_SCORE,
            popularity_half_life_days: POPULARITY_HALF_LIFE_DAYS,
            popularity_view_weight: POPULARITY_VIEW_WEIGHT,
            popularity_like_weight: POPULARITY_LIKE_WEIGHT,
            popularity_cart_weight: POPULARITY_CART_WEIGHT,
            popularity_purchase_weight: POPULARITY_PURCHASE_WEIGHT,
            popularity_saturation: POPULARITY_SATURATION,
            price_min_std_ratio: PRICE_MIN_STD_RATIO,
            price_min_std_floor: PRICE_MIN_STD_FLOOR,
        }
    }
}

/// Feedback loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// EMA rate for session vectors
    pub session_alpha: f32,
    /// EMA rate for long-term vectors
    pub long_term_alpha: f32,
    /// Capacity of the long-term update queue
    pub queue_capacity: usize,
    /// Lifetime of applied-event markers in seconds
    pub applied_marker_ttl_secs: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            session_alpha: FEEDBACK_SESSION_ALPHA,
            long_term_alpha: FEEDBACK_LONG_TERM_ALPHA,
            queue_capacity: FEEDBACK_QUEUE_CAPACITY,
            applied_marker_ttl_secs: FEEDBACK_APPLIED_MARKER_TTL_SECS,
        }
    }
}

impl FeedbackConfig {
    /// Applied-marker lifetime as a duration
    pub fn applied_marker_ttl(&self) -> Duration {
        Duration::from_secs(self.applied_marker_ttl_secs)
    }
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheProviderKind {
    /// In-process moka cache
    #[default]
    Moka,
    /// Stores nothing
    Null,
}

/// Embedding cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend
    pub provider: CacheProviderKind,
    /// Maximum number of entries
    pub max_entries: u64,
    /// Lifetime of product vectors in seconds; `None` keeps them until evicted
    pub product_ttl_secs: Option<u64>,
    /// Lifetime of cached ranked results in seconds
    pub result_ttl_secs: u64,
    /// View count above which an item is considered hot
    pub hot_threshold: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            provider: CacheProviderKind::Moka,
            max_entries: CACHE_MAX_ENTRIES,
            product_ttl_secs: None,
            result_ttl_secs: CACHE_RESULT_TTL_SECS,
            hot_threshold: CACHE_HOT_THRESHOLD,
        }
    }
}

/// Recommendation request defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// End-to-end latency budget in milliseconds
    pub latency_budget_ms: u64,
    /// Result count when a request does not specify one
    pub default_k: usize,
    /// Whether re-ranking runs by default
    pub use_ranking: bool,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            latency_budget_ms: RECOMMEND_LATENCY_BUDGET_MS,
            default_k: RECOMMEND_DEFAULT_K,
            use_ranking: true,
        }
    }
}

impl RecommendConfig {
    /// Latency budget as a duration
    pub fn latency_budget(&self) -> Duration {
        Duration::from_millis(self.latency_budget_ms)
    }
}
