//! Immutable index snapshots
//!
//! A snapshot is a trained `base` segment shared between snapshots through
//! an `Arc`, plus a small `delta` segment holding vectors added since the
//! last rebuild. Delta entries shadow base entries with the same id.
//! Searches run against one snapshot from start to finish, so a writer
//! publishing a new snapshot never disturbs them.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use recs_domain::value_objects::embedding::cosine_distance_unit;
use recs_domain::value_objects::{IndexKind, ItemId, Neighbor};

use super::ivf::IvfQuantizer;

/// Row-major vector storage with an id lookup table
#[derive(Debug, Clone, Default)]
pub(crate) struct Segment {
    dims: usize,
    ids: Vec<ItemId>,
    vectors: Vec<f32>,
    positions: HashMap<ItemId, usize>,
}

impl Segment {
    pub(crate) fn new(dims: usize) -> Self {
        Self {
            dims,
            ..Self::default()
        }
    }

    pub(crate) fn with_capacity(dims: usize, capacity: usize) -> Self {
        Self {
            dims,
            ids: Vec::with_capacity(capacity),
            vectors: Vec::with_capacity(capacity * dims),
            positions: HashMap::with_capacity(capacity),
        }
    }

    /// Insert or replace in place
    pub(crate) fn upsert(&mut self, id: ItemId, vector: &[f32]) {
        debug_assert_eq!(vector.len(), self.dims);
        if let Some(&pos) = self.positions.get(&id) {
            let start = pos * self.dims;
            self.vectors[start..start + self.dims].copy_from_slice(vector);
        } else {
            self.positions.insert(id, self.ids.len());
            self.ids.push(id);
            self.vectors.extend_from_slice(vector);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub(crate) fn dims(&self) -> usize {
        self.dims
    }

    pub(crate) fn id_at(&self, pos: usize) -> ItemId {
        self.ids[pos]
    }

    pub(crate) fn vector_at(&self, pos: usize) -> &[f32] {
        let start = pos * self.dims;
        &self.vectors[start..start + self.dims]
    }

    pub(crate) fn position(&self, id: ItemId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (ItemId, &[f32])> + '_ {
        self.ids
            .iter()
            .copied()
            .zip(self.vectors.chunks_exact(self.dims.max(1)))
    }
}

/// Candidate kept by the bounded top-k heap
///
/// Ordered by (distance, id) so the heap top is the current worst result.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    id: ItemId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded max-heap selecting the `k` smallest (distance, id) pairs
pub(crate) struct TopK {
    k: usize,
    heap: BinaryHeap<Candidate>,
}

impl TopK {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub(crate) fn push(&mut self, id: ItemId, distance: f32) {
        if self.k == 0 {
            return;
        }
        let candidate = Candidate { distance, id };
        if self.heap.len() < self.k {
            self.heap.push(candidate);
        } else if let Some(worst) = self.heap.peek() {
            if candidate < *worst {
                self.heap.pop();
                self.heap.push(candidate);
            }
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    pub(crate) fn into_sorted(self) -> Vec<Neighbor> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor::new(c.id, c.distance))
            .collect()
    }
}

/// Trained, immutable part of a snapshot
#[derive(Debug)]
pub(crate) struct BaseSegment {
    pub(crate) segment: Segment,
    pub(crate) quantizer: Option<IvfQuantizer>,
}

impl BaseSegment {
    pub(crate) fn train(segment: Segment, kind: IndexKind) -> Self {
        let quantizer = match kind {
            IndexKind::Flat => None,
            IndexKind::Ivf { nlist, .. } => IvfQuantizer::train(&segment, nlist),
        };
        Self { segment, quantizer }
    }
}

/// One published state of the index
#[derive(Debug)]
pub(crate) struct IndexSnapshot {
    kind: IndexKind,
    base: Arc<BaseSegment>,
    delta: Segment,
    shadowed: usize,
}

impl IndexSnapshot {
    pub(crate) fn empty(dims: usize, kind: IndexKind) -> Self {
        Self::from_segment(Segment::new(dims), kind)
    }

    /// Train a new base from `segment`, with an empty delta
    pub(crate) fn from_segment(segment: Segment, kind: IndexKind) -> Self {
        let dims = segment.dims();
        Self {
            kind,
            base: Arc::new(BaseSegment::train(segment, kind)),
            delta: Segment::new(dims),
            shadowed: 0,
        }
    }

    /// Copy of this snapshot with `entries` written to the delta
    pub(crate) fn with_delta(&self, entries: &[(ItemId, Vec<f32>)]) -> Self {
        let mut delta = self.delta.clone();
        for (id, vector) in entries {
            delta.upsert(*id, vector);
        }
        let shadowed = delta
            .ids
            .iter()
            .filter(|id| self.base.segment.position(**id).is_some())
            .count();
        Self {
            kind: self.kind,
            base: Arc::clone(&self.base),
            delta,
            shadowed,
        }
    }

    /// Every live entry merged into one segment (delta wins over base)
    pub(crate) fn merged_segment(&self) -> Segment {
        let mut merged = Segment::with_capacity(self.dims(), self.len());
        for (id, vector) in self.base.segment.iter() {
            if self.delta.position(id).is_none() {
                merged.upsert(id, vector);
            }
        }
        for (id, vector) in self.delta.iter() {
            merged.upsert(id, vector);
        }
        merged
    }

    /// Merge delta into a freshly trained base
    pub(crate) fn rebuilt(&self) -> Self {
        Self::from_segment(self.merged_segment(), self.kind)
    }

    /// Whether the delta outgrew `ratio` of the base
    pub(crate) fn needs_rebuild(&self, ratio: f64) -> bool {
        !self.delta.is_empty()
            && self.delta.len() as f64 > ratio * self.base.segment.len() as f64
    }

    pub(crate) fn dims(&self) -> usize {
        self.delta.dims()
    }

    pub(crate) fn kind(&self) -> IndexKind {
        self.kind
    }

    pub(crate) fn base_len(&self) -> usize {
        self.base.segment.len()
    }

    pub(crate) fn delta_len(&self) -> usize {
        self.delta.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.base.segment.len() - self.shadowed + self.delta.len()
    }

    pub(crate) fn contains(&self, id: ItemId) -> bool {
        self.delta.position(id).is_some() || self.base.segment.position(id).is_some()
    }

    pub(crate) fn vector(&self, id: ItemId) -> Option<&[f32]> {
        if let Some(pos) = self.delta.position(id) {
            return Some(self.delta.vector_at(pos));
        }
        self.base
            .segment
            .position(id)
            .map(|pos| self.base.segment.vector_at(pos))
    }

    /// Nearest neighbors over the whole snapshot
    ///
    /// Flat kinds scan every vector. IVF kinds probe inverted lists in
    /// order of centroid distance and stop after `nprobe` lists once `k`
    /// results are held, continuing past `nprobe` only while short of `k`.
    pub(crate) fn search(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let mut top = TopK::new(k);
        if k == 0 || self.len() == 0 {
            return Vec::new();
        }

        let base = &self.base.segment;
        match (&self.base.quantizer, self.kind) {
            (Some(quantizer), IndexKind::Ivf { nprobe, .. }) => {
                for (probed, list) in quantizer.probe_order(query).into_iter().enumerate() {
                    if probed >= nprobe.max(1) && top.is_full() {
                        break;
                    }
                    for &pos in quantizer.list(list) {
                        self.offer_base(&mut top, query, pos);
                    }
                }
            }
            _ => {
                for pos in 0..base.len() {
                    self.offer_base(&mut top, query, pos);
                }
            }
        }

        for (id, vector) in self.delta.iter() {
            top.push(id, cosine_distance_unit(query, vector));
        }
        top.into_sorted()
    }

    /// Exact nearest neighbors among `allowed` ids
    pub(crate) fn search_subset<I>(&self, query: &[f32], k: usize, allowed: I) -> Vec<Neighbor>
    where
        I: IntoIterator<Item = ItemId>,
    {
        let mut top = TopK::new(k);
        if k == 0 {
            return Vec::new();
        }
        for id in allowed {
            if let Some(vector) = self.vector(id) {
                top.push(id, cosine_distance_unit(query, vector));
            }
        }
        top.into_sorted()
    }

    fn offer_base(&self, top: &mut TopK, query: &[f32], pos: usize) {
        let base = &self.base.segment;
        let id = base.id_at(pos);
        if self.delta.position(id).is_some() {
            return;
        }
        top.push(id, cosine_distance_unit(query, base.vector_at(pos)));
    }
}
