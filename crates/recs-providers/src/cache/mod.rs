//! Cache Provider Implementations
//!
//! Backends for the embedding cache.
//!
//! ## Available Providers
//!
//! | Provider | Type | Description |
//! |----------|------|-------------|
//! | [`NullCacheProvider`] | Testing | Stores nothing; exercises every fallback path |
//! | [`MokaCacheProvider`] | Local | In-memory cache with per-entry TTL |

#[cfg(feature = "cache-moka")]
pub mod moka;
pub mod null;

#[cfg(feature = "cache-moka")]
pub use moka::MokaCacheProvider;
pub use null::NullCacheProvider;

pub use recs_domain::ports::providers::cache::{CacheEntryConfig, CacheStats};
