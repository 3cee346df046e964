//! Vector Index Provider Port
//!
//! Nearest-neighbor search over item embeddings by cosine distance.
//! Implementations publish immutable snapshots so searches never wait on
//! writers.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value_objects::{Embedding, IndexKind, ItemId, ItemRecord, Neighbor};

/// Index shape at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Index structure
    pub kind: IndexKind,
    /// Dimension of every stored vector
    pub dimensions: usize,
    /// Vectors in the trained base segment
    pub base_len: usize,
    /// Vectors added since the last rebuild
    pub delta_len: usize,
    /// Distinct items searchable
    pub total: usize,
    /// Number of rebuilds since creation
    pub rebuilds: u64,
}

/// Vector Index Provider
///
/// # Contract
///
/// - Every vector has the configured dimension; anything else is
///   [`Error::DimensionMismatch`](crate::Error::DimensionMismatch)
/// - Searches return at most `k` neighbors ordered by distance ascending,
///   ties by item id ascending
/// - An empty index or `k == 0` yields an empty list, not an error
/// - Re-adding an id replaces its vector
#[async_trait]
pub trait VectorIndexProvider: Send + Sync + std::fmt::Debug {
    /// Dimension every stored vector must have
    fn dimensions(&self) -> usize;

    /// Number of searchable items
    fn len(&self) -> usize;

    /// Whether the index holds no items
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the whole index with `items`
    async fn build(&self, items: Vec<ItemRecord>) -> Result<()>;

    /// Insert or replace one vector
    async fn add(&self, item_id: ItemId, vector: Embedding) -> Result<()>;

    /// Insert or replace many vectors under one snapshot publication
    async fn add_batch(&self, items: Vec<(ItemId, Embedding)>) -> Result<()>;

    /// Up to `k` nearest neighbors of `query`
    async fn search(&self, query: &Embedding, k: usize) -> Result<Vec<Neighbor>>;

    /// Exact nearest neighbors restricted to `allowed`
    async fn search_subset(
        &self,
        query: &Embedding,
        k: usize,
        allowed: &HashSet<ItemId>,
    ) -> Result<Vec<Neighbor>>;

    /// Stored vector of an item
    async fn reconstruct(&self, item_id: ItemId) -> Result<Option<Embedding>>;

    /// Whether an item is indexed
    fn contains(&self, item_id: ItemId) -> bool;

    /// Write a snapshot to `path`
    async fn persist(&self, path: &Path) -> Result<()>;

    /// Replace the index contents with the snapshot at `path`
    async fn load(&self, path: &Path) -> Result<()>;

    /// Current shape of the index
    fn stats(&self) -> IndexStats;

    /// Get the name/identifier of this provider implementation
    fn provider_name(&self) -> &str;
}
