//! Provider Constants
//!
//! Constants specific to provider implementations. Tunables shared with
//! the application layer live in `recs_domain::constants`.

// ============================================================================
// VECTOR INDEX CONSTANTS
// ============================================================================

/// Bytes per serialized vector component (f32)
pub const INDEX_BYTES_PER_DIMENSION: usize = 4;

/// Bytes per serialized item id (u64)
pub const INDEX_BYTES_PER_ID: usize = 8;

/// Bytes of the header length prefix (u32)
pub const INDEX_HEADER_LEN_BYTES: usize = 4;

/// Upper bound on the JSON header size
pub const INDEX_MAX_HEADER_BYTES: usize = 64 * 1024;

/// Largest vector dimension a snapshot header may declare
pub const INDEX_MAX_DIMENSIONS: usize = 1 << 16;

/// Suffix of the temporary file written before the atomic rename
pub const INDEX_TEMP_SUFFIX: &str = "tmp";

// ============================================================================
// CACHE CONSTANTS
// ============================================================================

/// Default maximum number of entries in the moka cache
pub const CACHE_DEFAULT_SIZE_LIMIT: u64 = 100_000;

// ============================================================================
// PROVIDER NAMES
// ============================================================================

/// Name of the in-memory vector index
pub const PROVIDER_IN_MEMORY_INDEX: &str = "in_memory";

/// Name of the moka cache provider
pub const PROVIDER_MOKA: &str = "moka";

/// Name of the null cache provider
pub const PROVIDER_NULL: &str = "null";

/// Name of the in-memory catalog
pub const PROVIDER_IN_MEMORY_CATALOG: &str = "in_memory";
