//! Domain layer constants
//!
//! Defaults for the tunables of the retrieval engine. Every value here is
//! surfaced through configuration; none of them is an invariant.

// ============================================================================
// EMBEDDING CONSTANTS
// ============================================================================

/// Tolerance used when checking that a vector has unit length
pub const EMBEDDING_NORM_TOLERANCE: f32 = 1e-5;

/// Default embedding dimension produced by the encoder
pub const EMBEDDING_DIMENSION_DEFAULT: usize = 512;

// ============================================================================
// VECTOR INDEX CONSTANTS
// ============================================================================

/// Delta segment size (relative to base) that triggers a merge rebuild
pub const INDEX_REBUILD_GROWTH_RATIO: f64 = 0.10;

/// Default number of inverted lists for the IVF index
pub const INDEX_IVF_NLIST_DEFAULT: usize = 64;

/// Default number of inverted lists probed per IVF query
pub const INDEX_IVF_NPROBE_DEFAULT: usize = 8;

/// Lloyd iterations used when training the IVF quantizer
pub const INDEX_IVF_TRAIN_ITERATIONS: usize = 10;

/// Norm tolerance applied to vectors read back from a snapshot
pub const INDEX_SNAPSHOT_NORM_TOLERANCE: f32 = 1e-3;

/// Snapshot format version written by `persist`
pub const INDEX_SNAPSHOT_FORMAT_VERSION: u32 = 1;

// ============================================================================
// FILTERED SEARCH CONSTANTS
// ============================================================================

/// Selectivity below which the subset strategy is chosen
pub const SEARCH_SELECTIVITY_THRESHOLD: f64 = 0.10;

/// Initial overfetch multiplier for the postfilter strategy
pub const SEARCH_OVERFETCH_FACTOR: usize = 5;

/// Hard cap on the overfetch multiplier
pub const SEARCH_MAX_OVERFETCH_FACTOR: usize = 10;

/// Sample size used by the sampling selectivity estimator
pub const SEARCH_SELECTIVITY_SAMPLE_SIZE: usize = 1000;

// ============================================================================
// PERSONALIZATION CONSTANTS
// ============================================================================

/// Feed context: (long-term, session, query) weights
pub const BLEND_WEIGHTS_FEED: (f32, f32, f32) = (0.7, 0.3, 0.0);

/// Search context: (long-term, session, query) weights
pub const BLEND_WEIGHTS_SEARCH: (f32, f32, f32) = (0.1, 0.2, 0.7);

/// Similar-item context: (long-term, session, item) weights
pub const BLEND_WEIGHTS_SIMILAR: (f32, f32, f32) = (0.05, 0.05, 0.9);

/// Default weight on the item vector for personalized similar items
pub const BLEND_ITEM_RATIO_DEFAULT: f32 = 0.9;

// ============================================================================
// RANKING CONSTANTS
// ============================================================================

/// Score assigned to a signal that is unavailable for an item
pub const RANKING_NEUTRAL_SCORE: f64 = 0.5;

/// Default similarity weight
pub const RANKING_WEIGHT_SIMILARITY: f64 = 0.6;

/// Default popularity weight
pub const RANKING_WEIGHT_POPULARITY: f64 = 0.2;

/// Default price-affinity weight
pub const RANKING_WEIGHT_PRICE: f64 = 0.1;

/// Default brand-affinity weight
pub const RANKING_WEIGHT_BRAND: f64 = 0.1;

/// Popularity half-life in days
pub const POPULARITY_HALF_LIFE_DAYS: f64 = 30.0;

/// Popularity weight of a view
pub const POPULARITY_VIEW_WEIGHT: f64 = 1.0;

/// Popularity weight of a like
pub const POPULARITY_LIKE_WEIGHT: f64 = 3.0;

/// Popularity weight of an add-to-cart
pub const POPULARITY_CART_WEIGHT: f64 = 5.0;

/// Popularity weight of a purchase
pub const POPULARITY_PURCHASE_WEIGHT: f64 = 10.0;

/// Raw popularity at which the log-compressed score saturates at 1.0
pub const POPULARITY_SATURATION: f64 = 10_000.0;

/// Minimum price deviation as a fraction of the mean price
pub const PRICE_MIN_STD_RATIO: f64 = 0.1;

/// Absolute floor on the price deviation
pub const PRICE_MIN_STD_FLOOR: f64 = 1.0;

// ============================================================================
// FEEDBACK CONSTANTS
// ============================================================================

/// EMA rate for session vectors
pub const FEEDBACK_SESSION_ALPHA: f32 = 0.3;

/// EMA rate for long-term vectors
pub const FEEDBACK_LONG_TERM_ALPHA: f32 = 0.1;

/// Capacity of the long-term update queue
pub const FEEDBACK_QUEUE_CAPACITY: usize = 1024;

/// Lifetime of applied-event markers in seconds (24 hours)
pub const FEEDBACK_APPLIED_MARKER_TTL_SECS: u64 = 24 * 60 * 60;

// ============================================================================
// CACHE CONSTANTS
// ============================================================================

/// Default maximum number of cache entries
pub const CACHE_MAX_ENTRIES: u64 = 100_000;

/// Lifetime of cached ranked results in seconds
pub const CACHE_RESULT_TTL_SECS: u64 = 300;

/// Default view count above which an item counts as hot
pub const CACHE_HOT_THRESHOLD: u64 = 100;

// ============================================================================
// REQUEST CONSTANTS
// ============================================================================

/// End-to-end latency budget for a recommendation request
pub const RECOMMEND_LATENCY_BUDGET_MS: u64 = 150;

/// Default number of results per request
pub const RECOMMEND_DEFAULT_K: usize = 20;
