//! Inverted-file coarse quantizer
//!
//! Spherical k-means over the base segment: centroids are kept at unit
//! length and vectors are assigned by largest dot product. Assignment runs
//! on the rayon pool. Seeding is deterministic (evenly strided picks) so a
//! given base always trains to the same lists.

use rayon::prelude::*;
use recs_domain::constants::INDEX_IVF_TRAIN_ITERATIONS;
use recs_domain::value_objects::embedding::{dot_product, l2_norm};

use super::snapshot::Segment;

/// Trained centroids and the base positions assigned to each
#[derive(Debug, Clone)]
pub(crate) struct IvfQuantizer {
    dims: usize,
    centroids: Vec<f32>,
    lists: Vec<Vec<usize>>,
}

impl IvfQuantizer {
    /// Train up to `nlist` lists; `None` for an empty segment
    pub(crate) fn train(segment: &Segment, nlist: usize) -> Option<Self> {
        let n = segment.len();
        if n == 0 {
            return None;
        }
        let dims = segment.dims();
        let nlist = nlist.clamp(1, n);
        let stride = n / nlist;

        let mut centroids = Vec::with_capacity(nlist * dims);
        for c in 0..nlist {
            centroids.extend_from_slice(segment.vector_at(c * stride));
        }

        let assign = |centroids: &[f32]| -> Vec<usize> {
            (0..n)
                .into_par_iter()
                .map(|pos| nearest_centroid(centroids, dims, segment.vector_at(pos)))
                .collect()
        };

        let mut assignments = assign(&centroids);
        for _ in 0..INDEX_IVF_TRAIN_ITERATIONS {
            recompute_centroids(&mut centroids, dims, segment, &assignments);
            let next = assign(&centroids);
            if next == assignments {
                break;
            }
            assignments = next;
        }
        // lists must agree with the final centroids
        let assignments = assign(&centroids);

        let mut lists = vec![Vec::new(); nlist];
        for (pos, &list) in assignments.iter().enumerate() {
            lists[list].push(pos);
        }
        tracing::debug!(
            vectors = n,
            lists = nlist,
            largest_list = lists.iter().map(Vec::len).max().unwrap_or(0),
            "trained IVF quantizer"
        );
        Some(Self {
            dims,
            centroids,
            lists,
        })
    }

    /// List indices ordered by centroid similarity to `query`, closest first
    pub(crate) fn probe_order(&self, query: &[f32]) -> Vec<usize> {
        let mut order: Vec<(usize, f32)> = self
            .centroids
            .chunks_exact(self.dims)
            .enumerate()
            .map(|(i, c)| (i, dot_product(query, c)))
            .collect();
        order.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        order.into_iter().map(|(i, _)| i).collect()
    }

    /// Base positions assigned to list `list`
    pub(crate) fn list(&self, list: usize) -> &[usize] {
        &self.lists[list]
    }

    #[cfg(test)]
    pub(crate) fn nlist(&self) -> usize {
        self.lists.len()
    }
}

fn nearest_centroid(centroids: &[f32], dims: usize, vector: &[f32]) -> usize {
    centroids
        .chunks_exact(dims)
        .enumerate()
        .map(|(i, c)| (i, dot_product(vector, c)))
        .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map_or(0, |(i, _)| i)
}

fn recompute_centroids(
    centroids: &mut [f32],
    dims: usize,
    segment: &Segment,
    assignments: &[usize],
) {
    let nlist = centroids.len() / dims;
    let mut sums = vec![0.0f32; nlist * dims];
    let mut counts = vec![0usize; nlist];
    for (pos, &list) in assignments.iter().enumerate() {
        counts[list] += 1;
        let slot = &mut sums[list * dims..(list + 1) * dims];
        for (s, v) in slot.iter_mut().zip(segment.vector_at(pos)) {
            *s += v;
        }
    }
    for list in 0..nlist {
        // empty lists keep their previous centroid
        if counts[list] == 0 {
            continue;
        }
        let sum = &sums[list * dims..(list + 1) * dims];
        let norm = l2_norm(sum);
        if norm > f32::EPSILON {
            for (c, s) in centroids[list * dims..(list + 1) * dims]
                .iter_mut()
                .zip(sum)
            {
                *c = s / norm;
            }
        }
    }
}
