//! In-memory vector index provider implementation
//!
//! Holds the current [`IndexSnapshot`] behind an `ArcSwap`. Readers load
//! the pointer and search without locking; writers serialize on a mutex,
//! build the next snapshot off to the side and publish it with one atomic
//! store. Scans run on the blocking pool so a caller can time out and drop
//! the future without stalling the runtime.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use recs_domain::error::{Error, Result};
use recs_domain::ports::providers::{IndexStats, VectorIndexProvider};
use recs_domain::value_objects::{Embedding, IndexConfig, IndexKind, ItemId, ItemRecord, Neighbor};
use tokio::sync::Mutex;

use super::persistence;
use super::snapshot::{IndexSnapshot, Segment};
use crate::constants::PROVIDER_IN_MEMORY_INDEX;

/// In-memory vector index
///
/// Exact (`Flat`) or approximate (`Ivf`) search over unit-length vectors
/// by cosine distance. Incremental adds land in a delta segment; once the
/// delta exceeds `rebuild_growth_ratio` of the base the writer merges and
/// retrains before publishing.
pub struct InMemoryVectorIndex {
    dimensions: usize,
    kind: IndexKind,
    rebuild_growth_ratio: f64,
    current: ArcSwap<IndexSnapshot>,
    writer: Mutex<()>,
    rebuilds: AtomicU64,
}

impl std::fmt::Debug for InMemoryVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorIndex")
            .field("dimensions", &self.dimensions)
            .field("kind", &self.kind)
            .field("len", &self.current.load().len())
            .finish()
    }
}

impl InMemoryVectorIndex {
    /// Create an empty index
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            dimensions: config.dimensions,
            kind: config.kind,
            rebuild_growth_ratio: config.rebuild_growth_ratio,
            current: ArcSwap::from_pointee(IndexSnapshot::empty(config.dimensions, config.kind)),
            writer: Mutex::new(()),
            rebuilds: AtomicU64::new(0),
        }
    }

    /// Create an empty flat index of the given dimension
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self::new(&IndexConfig::with_dimensions(dimensions))
    }

    /// Create an index populated from a snapshot file
    pub async fn open(config: &IndexConfig, path: &Path) -> Result<Self> {
        let index = Self::new(config);
        index.load(path).await?;
        Ok(index)
    }

    fn check_dimensions(&self, embedding: &Embedding) -> Result<()> {
        embedding.ensure_dimensions(self.dimensions)
    }

    fn publish(&self, snapshot: IndexSnapshot, rebuilt: bool) {
        if rebuilt {
            self.rebuilds.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!(
            provider = PROVIDER_IN_MEMORY_INDEX,
            base = snapshot.base_len(),
            delta = snapshot.delta_len(),
            rebuilt,
            "published index snapshot"
        );
        self.current.store(Arc::new(snapshot));
    }

    /// Write entries through the delta, rebuilding past the growth threshold
    async fn upsert(&self, entries: Vec<(ItemId, Vec<f32>)>) -> Result<()> {
        let ratio = self.rebuild_growth_ratio;
        let _guard = self.writer.lock().await;
        let current = self.current.load_full();
        let (next, rebuilt) = tokio::task::spawn_blocking(move || {
            let next = current.with_delta(&entries);
            if next.needs_rebuild(ratio) {
                (next.rebuilt(), true)
            } else {
                (next, false)
            }
        })
        .await
        .map_err(|e| Error::internal(format!("index update task failed: {e}")))?;
        self.publish(next, rebuilt);
        Ok(())
    }
}

#[async_trait]
impl VectorIndexProvider for InMemoryVectorIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        self.current.load().len()
    }

    async fn build(&self, items: Vec<ItemRecord>) -> Result<()> {
        let mut segment = Segment::with_capacity(self.dimensions, items.len());
        for item in &items {
            self.check_dimensions(&item.embedding)?;
            segment.upsert(item.id, item.embedding.as_slice());
        }
        let kind = self.kind;
        let _guard = self.writer.lock().await;
        let snapshot = tokio::task::spawn_blocking(move || IndexSnapshot::from_segment(segment, kind))
            .await
            .map_err(|e| Error::internal(format!("index build task failed: {e}")))?;
        tracing::info!(items = snapshot.len(), kind = kind.as_str(), "built vector index");
        self.publish(snapshot, true);
        Ok(())
    }

    async fn add(&self, item_id: ItemId, vector: Embedding) -> Result<()> {
        self.check_dimensions(&vector)?;
        self.upsert(vec![(item_id, vector.into_vec())]).await
    }

    async fn add_batch(&self, items: Vec<(ItemId, Embedding)>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        for (_, vector) in &items {
            self.check_dimensions(vector)?;
        }
        let entries = items
            .into_iter()
            .map(|(id, vector)| (id, vector.into_vec()))
            .collect();
        self.upsert(entries).await
    }

    async fn search(&self, query: &Embedding, k: usize) -> Result<Vec<Neighbor>> {
        self.check_dimensions(query)?;
        let snapshot = self.current.load_full();
        if k == 0 || snapshot.len() == 0 {
            return Ok(Vec::new());
        }
        let query = query.clone();
        tokio::task::spawn_blocking(move || snapshot.search(query.as_slice(), k))
            .await
            .map_err(|e| Error::internal(format!("index search task failed: {e}")))
    }

    async fn search_subset(
        &self,
        query: &Embedding,
        k: usize,
        allowed: &HashSet<ItemId>,
    ) -> Result<Vec<Neighbor>> {
        self.check_dimensions(query)?;
        let snapshot = self.current.load_full();
        if k == 0 || allowed.is_empty() || snapshot.len() == 0 {
            return Ok(Vec::new());
        }
        let query = query.clone();
        let allowed: Vec<ItemId> = allowed.iter().copied().collect();
        tokio::task::spawn_blocking(move || snapshot.search_subset(query.as_slice(), k, allowed))
            .await
            .map_err(|e| Error::internal(format!("index subset search task failed: {e}")))
    }

    async fn reconstruct(&self, item_id: ItemId) -> Result<Option<Embedding>> {
        let snapshot = self.current.load();
        snapshot
            .vector(item_id)
            .map(|v| Embedding::normalized(v.to_vec()))
            .transpose()
    }

    fn contains(&self, item_id: ItemId) -> bool {
        self.current.load().contains(item_id)
    }

    async fn persist(&self, path: &Path) -> Result<()> {
        let snapshot = self.current.load_full();
        let kind = self.kind.as_str();
        let bytes = tokio::task::spawn_blocking(move || {
            persistence::encode(&snapshot.merged_segment(), kind)
        })
        .await
        .map_err(|e| Error::internal(format!("index encode task failed: {e}")))??;
        persistence::write_atomic(path, bytes).await?;
        tracing::info!(path = %path.display(), items = self.len(), "persisted vector index");
        Ok(())
    }

    async fn load(&self, path: &Path) -> Result<()> {
        let bytes = persistence::read(path).await?;
        let kind = self.kind;
        let (header, segment) = tokio::task::spawn_blocking(move || persistence::decode(&bytes))
            .await
            .map_err(|e| Error::internal(format!("index decode task failed: {e}")))??;
        if header.dimensions != self.dimensions {
            return Err(Error::dimension_mismatch(self.dimensions, header.dimensions));
        }

        let _guard = self.writer.lock().await;
        let snapshot = tokio::task::spawn_blocking(move || IndexSnapshot::from_segment(segment, kind))
            .await
            .map_err(|e| Error::internal(format!("index build task failed: {e}")))?;
        tracing::info!(
            path = %path.display(),
            items = snapshot.len(),
            written_as = %header.kind,
            "loaded vector index snapshot"
        );
        self.publish(snapshot, true);
        Ok(())
    }

    fn stats(&self) -> IndexStats {
        let snapshot = self.current.load();
        IndexStats {
            kind: snapshot.kind(),
            dimensions: self.dimensions,
            base_len: snapshot.base_len(),
            delta_len: snapshot.delta_len(),
            total: snapshot.len(),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
        }
    }

    fn provider_name(&self) -> &str {
        PROVIDER_IN_MEMORY_INDEX
    }
}
