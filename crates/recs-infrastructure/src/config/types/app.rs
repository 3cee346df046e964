//! Main application configuration

use recs_domain::value_objects::{
    CacheConfig, FeedbackConfig, IndexConfig, PersonalizationConfig, RankingConfig,
    RecommendConfig, SearchConfig,
};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;

/// Engine configuration
///
/// One section per component. Every section falls back to its defaults,
/// so a TOML file only needs the keys it overrides:
///
/// ```toml
/// [index]
/// dimensions = 256
/// snapshot_path = "/var/lib/recs/index.snap"
///
/// [search]
/// selectivity_threshold = 0.05
///
/// [feedback]
/// session_alpha = 0.4
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Vector index
    pub index: IndexConfig,
    /// Filtered search
    pub search: SearchConfig,
    /// Personalization blending
    pub personalization: PersonalizationConfig,
    /// Re-ranking
    pub ranking: RankingConfig,
    /// Feedback loop
    pub feedback: FeedbackConfig,
    /// Embedding cache
    pub cache: CacheConfig,
    /// Recommendation request defaults
    pub recommend: RecommendConfig,
    /// Logging
    pub logging: LoggingConfig,
}
