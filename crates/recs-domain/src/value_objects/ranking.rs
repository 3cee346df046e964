//! Ranking Value Objects
//!
//! Weights of the linear re-ranking model, the per-signal breakdown carried
//! by every ranked result, and the user/item aggregates the scorers read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BrandId, ItemId};
use crate::constants::{
    RANKING_WEIGHT_BRAND, RANKING_WEIGHT_POPULARITY, RANKING_WEIGHT_PRICE,
    RANKING_WEIGHT_SIMILARITY,
};

/// Weights of the linear ranking model
///
/// Expected to sum to about 1.0; this is not enforced, only that each
/// weight is non-negative (checked at configuration load).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    /// Weight of the similarity score
    pub similarity: f64,
    /// Weight of the popularity score
    pub popularity: f64,
    /// Weight of the price-affinity score
    pub price_affinity: f64,
    /// Weight of the brand-affinity score
    pub brand_affinity: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            similarity: RANKING_WEIGHT_SIMILARITY,
            popularity: RANKING_WEIGHT_POPULARITY,
            price_affinity: RANKING_WEIGHT_PRICE,
            brand_affinity: RANKING_WEIGHT_BRAND,
        }
    }
}

impl RankingWeights {
    /// Sum of all weights
    pub fn total(&self) -> f64 {
        self.similarity + self.popularity + self.price_affinity + self.brand_affinity
    }

    /// Whether every weight is finite and non-negative
    pub fn is_valid(&self) -> bool {
        [
            self.similarity,
            self.popularity,
            self.price_affinity,
            self.brand_affinity,
        ]
        .iter()
        .all(|w| w.is_finite() && *w >= 0.0)
    }
}

/// Per-signal scores behind a final ranking score, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    /// Rescaled complement of the distance
    pub similarity: f64,
    /// Popularity score
    pub popularity: f64,
    /// Price affinity score
    pub price_affinity: f64,
    /// Brand affinity score
    pub brand_affinity: f64,
}

impl SignalBreakdown {
    /// Weighted linear combination
    pub fn combine(&self, weights: &RankingWeights) -> f64 {
        weights.similarity * self.similarity
            + weights.popularity * self.popularity
            + weights.price_affinity * self.price_affinity
            + weights.brand_affinity * self.brand_affinity
    }
}

/// A re-ranked candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Item identifier
    pub item_id: ItemId,
    /// Raw cosine distance
    pub distance: f32,
    /// Similarity in `[0, 1]`
    pub similarity: f32,
    /// 0-based position after re-ranking
    pub rank: usize,
    /// 0-based position before re-ranking
    pub original_rank: usize,
    /// Weighted score the order is based on
    pub final_score: f64,
    /// Per-signal scores
    pub signals: Option<SignalBreakdown>,
}

/// Aggregate interaction counts of an item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PopularityStats {
    /// Number of views
    pub views: u64,
    /// Number of likes
    pub likes: u64,
    /// Number of add-to-carts
    pub carts: u64,
    /// Number of purchases
    pub purchases: u64,
    /// Most recent interaction, if any
    pub last_interaction: Option<DateTime<Utc>>,
}

impl PopularityStats {
    /// Total number of recorded interactions
    pub fn total(&self) -> u64 {
        self.views + self.likes + self.carts + self.purchases
    }
}

/// Summary of a user's historical purchase prices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceProfile {
    /// Mean price
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Lowest price
    pub min: f64,
    /// Highest price
    pub max: f64,
    /// Number of purchases summarised
    pub count: usize,
}

impl PriceProfile {
    /// Profile of the finite prices in `prices`; `None` when there are none
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        let finite: Vec<f64> = prices.iter().copied().filter(|p| p.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        let count = finite.len();
        let mean = finite.iter().sum::<f64>() / count as f64;
        let variance = finite.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / count as f64;
        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
            count,
        })
    }
}

/// Normalized brand preference weights, each in `[0, 1]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandPreferences {
    weights: HashMap<BrandId, f64>,
}

impl BrandPreferences {
    /// Aggregate weighted brand interactions
    ///
    /// Weights are summed per brand, negative totals are floored at zero
    /// and the result is divided by the largest total.
    pub fn from_interactions(interactions: &[(BrandId, f64)]) -> Self {
        let mut totals: HashMap<BrandId, f64> = HashMap::new();
        for (brand, weight) in interactions {
            if weight.is_finite() {
                *totals.entry(*brand).or_insert(0.0) += weight;
            }
        }
        let max = totals.values().copied().fold(0.0f64, f64::max);
        let weights = totals
            .into_iter()
            .map(|(brand, total)| {
                let normalized = if max > 0.0 { total.max(0.0) / max } else { 0.0 };
                (brand, normalized)
            })
            .collect();
        Self { weights }
    }

    /// Preference for a brand; unknown brands score 0
    pub fn weight(&self, brand: BrandId) -> f64 {
        self.weights.get(&brand).copied().unwrap_or(0.0)
    }

    /// Whether no brand has been seen
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Brands ordered by preference, strongest first
    pub fn top(&self, limit: usize) -> Vec<(BrandId, f64)> {
        let mut entries: Vec<(BrandId, f64)> =
            self.weights.iter().map(|(b, w)| (*b, *w)).collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(limit);
        entries
    }
}
