//! # Infrastructure Layer
//!
//! Cross-cutting technical concerns of the recs engine and the composition
//! root that wires providers into the application services.
//!
//! ## Module Categories
//!
//! ### Configuration & Wiring
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Figment loader (defaults, TOML, `RECS_` env), validation |
//! | [`di`] | [`EngineContext`] composition root |
//! | [`constants`] | Infrastructure constants |
//!
//! ### Observability
//! | Module | Description |
//! |--------|-------------|
//! | [`logging`] | Structured logging with tracing |
//!
//! ### Errors
//! | Module | Description |
//! |--------|-------------|
//! | [`error_ext`] | Context conversion of foreign errors |

pub mod config;
pub mod constants;
pub mod di;
pub mod error_ext;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, ConfigBuilder, ConfigLoader, LoggingConfig};
pub use di::EngineContext;
pub use error_ext::ErrorContext;
