//! Embedding Value Objects
//!
//! Unit-length vectors shared by items and users, plus the distance
//! arithmetic every component uses.

use serde::{Deserialize, Serialize};

use crate::constants::EMBEDDING_NORM_TOLERANCE;
use crate::error::{Error, Result};

/// Value Object: L2-normalized embedding
///
/// Represents an item or user in the shared similarity space. The vector
/// is normalized on construction and never mutated afterwards; updates
/// replace the whole value.
///
/// ## Business Rules
///
/// - Vector must contain at least one element
/// - Every component must be finite
/// - The stored vector has unit L2 norm (within `1e-5`)
/// - Arithmetic between embeddings of different dimension fails with
///   [`Error::DimensionMismatch`]
///
/// ## Example
///
/// ```rust
/// use recs_domain::value_objects::Embedding;
///
/// let e = Embedding::normalized(vec![3.0, 4.0]).unwrap();
/// assert!((e.as_slice()[0] - 0.6).abs() < 1e-6);
/// assert!(e.is_unit());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Embedding {
    vector: Vec<f32>,
}

impl Embedding {
    /// Normalize `values` to unit length
    ///
    /// Fails with `InvalidArgument` on empty input, non-finite components
    /// or a zero norm.
    pub fn normalized(values: Vec<f32>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::invalid_argument("embedding must not be empty"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::invalid_argument(
                "embedding contains non-finite components",
            ));
        }
        // scale into [-1, 1] first so the squared sum cannot overflow
        let scale = values.iter().fold(0.0f32, |max, v| max.max(v.abs()));
        if scale <= 0.0 {
            return Err(Error::invalid_argument("embedding has zero norm"));
        }
        let mut vector: Vec<f32> = values.into_iter().map(|v| v / scale).collect();
        let norm = l2_norm(&vector);
        for v in &mut vector {
            *v /= norm;
        }
        Ok(Self { vector })
    }

    /// Vector components
    pub fn as_slice(&self) -> &[f32] {
        &self.vector
    }

    /// Consume into the raw components
    pub fn into_vec(self) -> Vec<f32> {
        self.vector
    }

    /// Dimension of the vector
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    /// Whether the vector has unit norm within tolerance
    pub fn is_unit(&self) -> bool {
        is_unit_norm(&self.vector)
    }

    /// Fail with `DimensionMismatch` unless this embedding has `expected` dimensions
    pub fn ensure_dimensions(&self, expected: usize) -> Result<()> {
        if self.dimensions() == expected {
            Ok(())
        } else {
            Err(Error::dimension_mismatch(expected, self.dimensions()))
        }
    }

    /// Dot product with another embedding
    pub fn dot(&self, other: &Embedding) -> Result<f32> {
        other.ensure_dimensions(self.dimensions())?;
        Ok(dot_product(&self.vector, &other.vector))
    }

    /// Cosine distance `1 - dot`, in `[0, 2]`
    pub fn cosine_distance(&self, other: &Embedding) -> Result<f32> {
        other.ensure_dimensions(self.dimensions())?;
        Ok(cosine_distance_unit(&self.vector, &other.vector))
    }

    /// Cosine similarity (the dot product of two unit vectors), in `[-1, 1]`
    pub fn cosine_similarity(&self, other: &Embedding) -> Result<f32> {
        Ok(self.dot(other)?.clamp(-1.0, 1.0))
    }

    /// Normalized weighted sum of embeddings
    ///
    /// Returns `Ok(None)` when `terms` is empty or the sum cancels out to a
    /// zero vector. All terms must share one dimension.
    pub fn weighted_sum(terms: &[(f32, &Embedding)]) -> Result<Option<Embedding>> {
        let Some((_, first)) = terms.first() else {
            return Ok(None);
        };
        let dims = first.dimensions();
        let mut acc = vec![0.0f32; dims];
        for (weight, embedding) in terms {
            embedding.ensure_dimensions(dims)?;
            for (slot, value) in acc.iter_mut().zip(embedding.as_slice()) {
                *slot += weight * value;
            }
        }
        if l2_norm(&acc) <= f32::EPSILON {
            return Ok(None);
        }
        Embedding::normalized(acc).map(Some)
    }
}

impl TryFrom<Vec<f32>> for Embedding {
    type Error = Error;

    fn try_from(values: Vec<f32>) -> Result<Self> {
        Embedding::normalized(values)
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Self {
        embedding.vector
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.vector
    }
}

/// Map a cosine distance in `[0, 2]` to a similarity in `[0, 1]`
///
/// Monotonically decreasing; distance 0 maps to 1.0.
pub fn similarity_from_distance(distance: f32) -> f32 {
    (1.0 - distance / 2.0).clamp(0.0, 1.0)
}

/// Dot product of two equally sized slices
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine distance between two unit-length slices
pub fn cosine_distance_unit(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - dot_product(a, b)).clamp(0.0, 2.0)
}

/// Euclidean norm of a slice
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Whether a slice has unit norm within the default tolerance
pub fn is_unit_norm(v: &[f32]) -> bool {
    is_unit_norm_within(v, EMBEDDING_NORM_TOLERANCE)
}

/// Whether a slice has unit norm within `tolerance`
pub fn is_unit_norm_within(v: &[f32], tolerance: f32) -> bool {
    (l2_norm(v) - 1.0).abs() <= tolerance
}
