//! Configuration loader
//!
//! Handles loading configuration from various sources including
//! TOML files, environment variables, and default values.

use std::env;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use recs_domain::error::{Error, Result};
use recs_domain::value_objects::{
    CacheConfig, CacheProviderKind, EstimatorKind, FeedbackConfig, IndexConfig, IndexKind,
    PersonalizationConfig, RankingConfig, RecommendConfig, SearchConfig,
};

use crate::config::{AppConfig, LoggingConfig};
use crate::constants::*;
use crate::error_ext::ErrorContext;
use crate::logging::{log_config_loaded, parse_log_level};

/// Configuration loader service
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Configuration file path
    config_path: Option<PathBuf>,

    /// Environment prefix
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new configuration loader with default settings
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Set the configuration file path
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix
    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources
    ///
    /// Sources are merged in this order (later sources override earlier):
    /// 1. Default values from `AppConfig::default()`
    /// 2. TOML configuration file (if it exists)
    /// 3. Environment variables with prefix, nested keys split on `__`
    ///    (e.g. `RECS_SEARCH__OVERFETCH_FACTOR`)
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        match &self.config_path {
            Some(config_path) if config_path.exists() => {
                figment = figment.merge(Toml::file(config_path));
                log_config_loaded(config_path, true);
            }
            Some(config_path) => log_config_loaded(config_path, false),
            None => {
                if let Some(default_path) = Self::find_default_config_path() {
                    figment = figment.merge(Toml::file(&default_path));
                    log_config_loaded(&default_path, true);
                }
            }
        }

        figment = figment.merge(
            Env::prefixed(&format!("{}_", self.env_prefix)).split(CONFIG_ENV_NESTING_SEPARATOR),
        );

        let app_config: AppConfig = figment
            .extract()
            .config_context("Failed to extract configuration")?;

        validate_app_config(&app_config)?;

        Ok(app_config)
    }

    /// Reload configuration from the same sources
    pub fn reload(&self) -> Result<AppConfig> {
        self.load()
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, config: &AppConfig, path: P) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(config).config_context("Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), toml_string).io_context(format!(
            "Failed to write config file {}",
            path.as_ref().display()
        ))?;

        Ok(())
    }

    /// Get the current configuration file path
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// First existing file among the conventional locations
    fn find_default_config_path() -> Option<PathBuf> {
        let current_dir = env::current_dir().ok()?;

        let candidates = [
            Some(current_dir.join(DEFAULT_CONFIG_FILENAME)),
            Some(
                current_dir
                    .join(DEFAULT_CONFIG_DIR)
                    .join(DEFAULT_CONFIG_FILENAME),
            ),
            dirs::config_dir().map(|d| d.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILENAME)),
            dirs::home_dir().map(|d| {
                d.join(format!(".{DEFAULT_CONFIG_DIR}"))
                    .join(DEFAULT_CONFIG_FILENAME)
            }),
        ];

        candidates.into_iter().flatten().find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Configuration {
        message: message.into(),
        source: None,
    }
}

fn in_unit_interval(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

/// Validate application configuration
///
/// Checks every section; the first violation is returned as
/// [`Error::Configuration`].
pub fn validate_app_config(config: &AppConfig) -> Result<()> {
    validate_index_config(&config.index)?;
    validate_search_config(&config.search)?;
    validate_personalization_config(&config.personalization)?;
    validate_ranking_config(&config.ranking)?;
    validate_feedback_config(&config.feedback)?;
    validate_cache_config(&config.cache)?;
    validate_recommend_config(&config.recommend)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_index_config(config: &IndexConfig) -> Result<()> {
    if config.dimensions == 0 {
        return Err(invalid("Index dimensions cannot be 0"));
    }
    if !(config.rebuild_growth_ratio.is_finite() && config.rebuild_growth_ratio > 0.0) {
        return Err(invalid("Index rebuild growth ratio must be positive"));
    }
    if let IndexKind::Ivf { nlist, nprobe } = config.kind {
        if nlist == 0 || nprobe == 0 {
            return Err(invalid("IVF nlist and nprobe must be at least 1"));
        }
        if nprobe > nlist {
            return Err(invalid(format!(
                "IVF nprobe ({nprobe}) cannot exceed nlist ({nlist})"
            )));
        }
    }
    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> Result<()> {
    if !in_unit_interval(config.selectivity_threshold) {
        return Err(invalid("Selectivity threshold must be in (0, 1]"));
    }
    if config.overfetch_factor == 0 {
        return Err(invalid("Overfetch factor must be at least 1"));
    }
    if config.max_overfetch_factor < config.overfetch_factor {
        return Err(invalid(format!(
            "Maximum overfetch factor ({}) cannot be below the initial factor ({})",
            config.max_overfetch_factor, config.overfetch_factor
        )));
    }
    if config.estimator == EstimatorKind::Sampling && config.sample_size == 0 {
        return Err(invalid("Sample size cannot be 0 with the sampling estimator"));
    }
    Ok(())
}

fn validate_personalization_config(config: &PersonalizationConfig) -> Result<()> {
    for (name, weights) in [
        ("feed", config.feed),
        ("search", config.search),
        ("similar", config.similar),
    ] {
        if !weights.is_valid() {
            return Err(invalid(format!(
                "Blend weights for the {name} context must be non-negative"
            )));
        }
    }
    if !(0.0..=1.0).contains(&config.item_blend_ratio) {
        return Err(invalid("Item blend ratio must be in [0, 1]"));
    }
    Ok(())
}

fn validate_ranking_config(config: &RankingConfig) -> Result<()> {
    if !config.weights.is_valid() {
        return Err(invalid("Ranking weights must be non-negative"));
    }
    if !(0.0..=1.0).contains(&config.neutral_score) {
        return Err(invalid("Neutral score must be in [0, 1]"));
    }
    if config.popularity_half_life_days <= 0.0 || config.popularity_saturation <= 0.0 {
        return Err(invalid(
            "Popularity half-life and saturation must be positive",
        ));
    }
    let interaction_weights = [
        config.popularity_view_weight,
        config.popularity_like_weight,
        config.popularity_cart_weight,
        config.popularity_purchase_weight,
    ];
    if interaction_weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(invalid("Popularity interaction weights must be non-negative"));
    }
    if config.price_min_std_ratio < 0.0 || config.price_min_std_floor <= 0.0 {
        return Err(invalid("Price deviation floor must be positive"));
    }
    Ok(())
}

fn validate_feedback_config(config: &FeedbackConfig) -> Result<()> {
    if !in_unit_interval(f64::from(config.session_alpha))
        || !in_unit_interval(f64::from(config.long_term_alpha))
    {
        return Err(invalid("Feedback alphas must be in (0, 1]"));
    }
    if config.queue_capacity == 0 {
        return Err(invalid("Long-term update queue capacity cannot be 0"));
    }
    if config.applied_marker_ttl_secs == 0 {
        return Err(invalid("Applied marker TTL cannot be 0"));
    }
    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<()> {
    if config.provider == CacheProviderKind::Null {
        return Ok(());
    }
    if config.max_entries == 0 {
        return Err(invalid("Cache max entries cannot be 0"));
    }
    if config.result_ttl_secs == 0 || config.product_ttl_secs == Some(0) {
        return Err(invalid("Cache TTLs cannot be 0"));
    }
    Ok(())
}

fn validate_recommend_config(config: &RecommendConfig) -> Result<()> {
    if config.latency_budget_ms == 0 {
        return Err(invalid("Latency budget cannot be 0"));
    }
    if config.default_k == 0 {
        return Err(invalid("Default result count cannot be 0"));
    }
    Ok(())
}

fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    parse_log_level(&config.level).map(|_| ())
}

/// Configuration builder for programmatic configuration
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: AppConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set index configuration
    pub fn with_index(mut self, index: IndexConfig) -> Self {
        self.config.index = index;
        self
    }

    /// Set the embedding dimension
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.config.index.dimensions = dimensions;
        self
    }

    /// Set filtered search configuration
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.config.search = search;
        self
    }

    /// Set personalization configuration
    pub fn with_personalization(mut self, personalization: PersonalizationConfig) -> Self {
        self.config.personalization = personalization;
        self
    }

    /// Set ranking configuration
    pub fn with_ranking(mut self, ranking: RankingConfig) -> Self {
        self.config.ranking = ranking;
        self
    }

    /// Set feedback configuration
    pub fn with_feedback(mut self, feedback: FeedbackConfig) -> Self {
        self.config.feedback = feedback;
        self
    }

    /// Set cache configuration
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// Set recommendation defaults
    pub fn with_recommend(mut self, recommend: RecommendConfig) -> Self {
        self.config.recommend = recommend;
        self
    }

    /// Set logging configuration
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Build the configuration
    pub fn build(self) -> AppConfig {
        self.config
    }
}
