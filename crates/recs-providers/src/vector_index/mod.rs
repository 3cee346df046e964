//! Vector Index Provider Implementations
//!
//! | Provider | Description |
//! |----------|-------------|
//! | [`InMemoryVectorIndex`] | Flat or IVF index with lock-free snapshot reads and file persistence |

pub mod in_memory;
mod ivf;
mod persistence;
mod snapshot;

pub use in_memory::InMemoryVectorIndex;
pub use persistence::SnapshotHeader;
