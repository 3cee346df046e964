//! Infrastructure layer constants
//!
//! Contains constants that are part of the infrastructure implementation.
//! Engine tunables are defined in `recs_domain::constants`.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "recs.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "recs";

/// Environment variable prefix for configuration
pub const CONFIG_ENV_PREFIX: &str = "RECS";

/// Separator between nested keys in environment variable names
pub const CONFIG_ENV_NESTING_SEPARATOR: &str = "__";

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the configured filter
pub const LOG_ENV_FILTER: &str = "RECS_LOG";

/// File name prefix used when the configured log path has none
pub const LOG_FILE_PREFIX_DEFAULT: &str = "recs";

/// Suffix of rolled log files
pub const LOG_FILE_SUFFIX: &str = "log";

/// Maximum number of rotated log files to keep
pub const LOG_MAX_FILES: usize = 7;
