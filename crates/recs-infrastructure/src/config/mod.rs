//! Configuration management
//!
//! Figment-based loading (defaults, TOML file, `RECS_` environment
//! variables), validation and programmatic building of [`AppConfig`].

pub mod loader;
pub mod types;

pub use loader::{ConfigBuilder, ConfigLoader, validate_app_config};
pub use types::{AppConfig, LoggingConfig};
