//! Configuration data types

mod app;
mod logging;

pub use app::AppConfig;
pub use logging::LoggingConfig;
