//! Error handling types
//!
//! Errors fall in two families. Integrity errors (dimension mismatches,
//! corrupt snapshots) always propagate to the caller. Degradation errors
//! (catalog outages, background update failures) are absorbed by the layer
//! that owns the fallback and only surface in logs.
//!
//! Empty indexes, empty candidate sets and cache misses are not errors at
//! all: they are represented as empty collections or `None`.

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the recommendation engine
#[derive(Error, Debug)]
pub enum Error {
    /// Vector dimension differs from the dimension the store was built with
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the index or cache is configured for
        expected: usize,
        /// Dimension of the offending vector
        actual: usize,
    },

    /// Persisted index snapshot is inconsistent and must be rebuilt
    #[error("Index corrupt: {message}")]
    IndexCorrupt {
        /// What was inconsistent
        message: String,
    },

    /// External catalog store could not answer
    #[error("Catalog unavailable: {message}")]
    CatalogUnavailable {
        /// Description of the failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Deferred long-term embedding update failed
    #[error("Background update failed: {message}")]
    BackgroundUpdateFailed {
        /// Description of the failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invalid argument provided to a function
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument
        message: String,
    },

    /// I/O operation error (simple form)
    #[error("I/O error: {source}")]
    IoSimple {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// I/O operation error (with context)
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing or serialization error
    #[error("JSON parsing error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// Cache operation error
    #[error("Cache error: {message}")]
    Cache {
        /// Description of the cache error
        message: String,
    },

    /// Configuration-related error (simple form)
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// Configuration-related error (with source)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Infrastructure failure wrapped with context
    #[error("Infrastructure error: {message}")]
    Infrastructure {
        /// Description of the failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

// Integrity error creation methods
impl Error {
    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create an index corruption error
    pub fn index_corrupt<S: Into<String>>(message: S) -> Self {
        Self::IndexCorrupt {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

// Degradation error creation methods
impl Error {
    /// Create a catalog unavailable error
    pub fn catalog_unavailable<S: Into<String>>(message: S) -> Self {
        Self::CatalogUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a catalog unavailable error with source
    pub fn catalog_unavailable_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::CatalogUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wrap a failure of the deferred long-term update
    pub fn background_update_failed<S: Into<String>>(message: S, source: Option<Error>) -> Self {
        Self::BackgroundUpdateFailed {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }
}

// I/O and infrastructure error creation methods
impl Error {
    /// Create an I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// Create an I/O error with source
    pub fn io_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a configuration error (simple)
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an infrastructure error
    pub fn infrastructure<S: Into<String>>(message: S) -> Self {
        Self::Infrastructure {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// Propagation policy
impl Error {
    /// Data-integrity violations that must always reach the caller
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. } | Self::IndexCorrupt { .. }
        )
    }

    /// Availability failures that callers absorb with a fallback
    pub fn is_degradation(&self) -> bool {
        matches!(
            self,
            Self::CatalogUnavailable { .. } | Self::BackgroundUpdateFailed { .. } | Self::Cache { .. }
        )
    }
}
