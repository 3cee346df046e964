//! Multi-Signal Ranking
//!
//! Independent scorers map auxiliary data to `[0, 1]`; the [`Ranker`]
//! combines them with similarity through the linear model in
//! [`RankingWeights`] and re-sorts the candidates.
//!
//! | Scorer | Input | Shape |
//! |--------|-------|-------|
//! | [`PopularityScorer`] | interaction counts, last interaction | decayed, log-compressed |
//! | [`PriceAffinityScorer`] | item price, user price profile | Gaussian falloff around the mean |
//! | [`BrandAffinityScorer`] | item brand, user brand preferences | lookup, unknown brand = 0 |
//!
//! A signal that is unavailable for an item scores the neutral midpoint.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use recs_domain::value_objects::{
    BrandId, BrandPreferences, ItemId, PopularityStats, PriceProfile, RankedResult,
    RankingConfig, RankingWeights, SearchResults, SignalBreakdown,
};

const SECONDS_PER_DAY: f64 = 86_400.0;

// ============================================================================
// Scorers
// ============================================================================

/// Time-decayed, log-compressed popularity
///
/// `ln(1 + raw * 0.5^(age / half_life)) / ln(1 + saturation)`, where `raw`
/// is the weighted sum of views, likes, carts and purchases and `age` the
/// time since the last interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopularityScorer {
    /// Half-life of the decay in days
    pub half_life_days: f64,
    /// Weight of a view
    pub view_weight: f64,
    /// Weight of a like
    pub like_weight: f64,
    /// Weight of an add-to-cart
    pub cart_weight: f64,
    /// Weight of a purchase
    pub purchase_weight: f64,
    /// Decayed raw popularity that maps to 1.0
    pub saturation: f64,
}

impl Default for PopularityScorer {
    fn default() -> Self {
        Self::from_config(&RankingConfig::default())
    }
}

impl PopularityScorer {
    /// Scorer with the configured constants
    pub fn from_config(config: &RankingConfig) -> Self {
        Self {
            half_life_days: config.popularity_half_life_days,
            view_weight: config.popularity_view_weight,
            like_weight: config.popularity_like_weight,
            cart_weight: config.popularity_cart_weight,
            purchase_weight: config.popularity_purchase_weight,
            saturation: config.popularity_saturation,
        }
    }

    /// Popularity score at `now`
    pub fn score(&self, stats: &PopularityStats, now: DateTime<Utc>) -> f64 {
        let raw = self.view_weight * stats.views as f64
            + self.like_weight * stats.likes as f64
            + self.cart_weight * stats.carts as f64
            + self.purchase_weight * stats.purchases as f64;
        let decay = match stats.last_interaction {
            Some(last) if self.half_life_days > 0.0 => {
                let age_days = ((now - last).num_seconds() as f64 / SECONDS_PER_DAY).max(0.0);
                0.5f64.powf(age_days / self.half_life_days)
            }
            _ => 1.0,
        };
        self.compress(raw * decay)
    }

    /// Score from a bare view count (cache counters, no decay)
    pub fn score_views(&self, views: u64) -> f64 {
        self.compress(self.view_weight * views as f64)
    }

    fn compress(&self, value: f64) -> f64 {
        if self.saturation <= 0.0 || !value.is_finite() {
            return 0.0;
        }
        (value.max(0.0).ln_1p() / self.saturation.ln_1p()).clamp(0.0, 1.0)
    }
}

/// Gaussian-like falloff of an item price around the user's mean
///
/// `exp(-0.5 * ((price - mean) / sigma)^2)` with
/// `sigma = max(std_dev, |mean| * min_std_ratio, min_std_floor)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceAffinityScorer {
    /// Minimum deviation relative to the mean
    pub min_std_ratio: f64,
    /// Absolute minimum deviation
    pub min_std_floor: f64,
}

impl Default for PriceAffinityScorer {
    fn default() -> Self {
        Self::from_config(&RankingConfig::default())
    }
}

impl PriceAffinityScorer {
    /// Scorer with the configured constants
    pub fn from_config(config: &RankingConfig) -> Self {
        Self {
            min_std_ratio: config.price_min_std_ratio,
            min_std_floor: config.price_min_std_floor,
        }
    }

    /// Affinity of `price` for a user with `profile`
    pub fn score(&self, price: f64, profile: &PriceProfile) -> f64 {
        if !price.is_finite() {
            return 0.0;
        }
        let sigma = profile
            .std_dev
            .max(profile.mean.abs() * self.min_std_ratio)
            .max(self.min_std_floor)
            .max(f64::EPSILON);
        let z = (price - profile.mean) / sigma;
        (-0.5 * z * z).exp().clamp(0.0, 1.0)
    }
}

/// Preference lookup for an item's brand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrandAffinityScorer;

impl BrandAffinityScorer {
    /// Preference weight of `brand`; 0 when the user never engaged with it
    pub fn score(self, brand: BrandId, preferences: &BrandPreferences) -> f64 {
        preferences.weight(brand).clamp(0.0, 1.0)
    }
}

// ============================================================================
// Signals
// ============================================================================

/// Auxiliary signal scores per item
///
/// Items missing from a map have no data for that signal and score the
/// ranker's neutral value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingSignals {
    /// Popularity scores
    pub popularity: HashMap<ItemId, f64>,
    /// Price affinity scores
    pub price_affinity: HashMap<ItemId, f64>,
    /// Brand affinity scores
    pub brand_affinity: HashMap<ItemId, f64>,
    /// Set when a signal source failed and neutral or fallback values were used
    pub degraded: bool,
}

impl RankingSignals {
    /// No signal data at all
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Set the popularity score of an item
    pub fn with_popularity(mut self, item_id: ItemId, score: f64) -> Self {
        self.popularity.insert(item_id, score);
        self
    }

    /// Set the price affinity score of an item
    pub fn with_price_affinity(mut self, item_id: ItemId, score: f64) -> Self {
        self.price_affinity.insert(item_id, score);
        self
    }

    /// Set the brand affinity score of an item
    pub fn with_brand_affinity(mut self, item_id: ItemId, score: f64) -> Self {
        self.brand_affinity.insert(item_id, score);
        self
    }
}

// ============================================================================
// Ranker
// ============================================================================

/// Weighted linear re-ranker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranker {
    weights: RankingWeights,
    neutral: f64,
}

impl Default for Ranker {
    fn default() -> Self {
        Self::from_config(&RankingConfig::default())
    }
}

impl Ranker {
    /// Ranker with explicit weights and neutral score
    pub fn new(weights: RankingWeights, neutral: f64) -> Self {
        Self {
            weights,
            neutral: neutral.clamp(0.0, 1.0),
        }
    }

    /// Ranker from configuration
    pub fn from_config(config: &RankingConfig) -> Self {
        Self::new(config.weights, config.neutral_score)
    }

    /// Model weights
    pub fn weights(&self) -> RankingWeights {
        self.weights
    }

    fn signal(&self, scores: &HashMap<ItemId, f64>, item_id: ItemId) -> f64 {
        scores
            .get(&item_id)
            .copied()
            .filter(|s| s.is_finite())
            .map_or(self.neutral, |s| s.clamp(0.0, 1.0))
    }

    /// Re-rank search results
    ///
    /// Sorted by final score descending; equal scores keep their original
    /// order. Every result carries its signal breakdown.
    pub fn rank(&self, results: &SearchResults, signals: &RankingSignals) -> Vec<RankedResult> {
        let mut ranked: Vec<RankedResult> = results
            .hits
            .iter()
            .enumerate()
            .map(|(original_rank, hit)| {
                let breakdown = SignalBreakdown {
                    similarity: f64::from(hit.similarity),
                    popularity: self.signal(&signals.popularity, hit.item_id),
                    price_affinity: self.signal(&signals.price_affinity, hit.item_id),
                    brand_affinity: self.signal(&signals.brand_affinity, hit.item_id),
                };
                RankedResult {
                    item_id: hit.item_id,
                    distance: hit.distance,
                    similarity: hit.similarity,
                    rank: original_rank,
                    original_rank,
                    final_score: breakdown.combine(&self.weights),
                    signals: Some(breakdown),
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.final_score
                .total_cmp(&a.final_score)
                .then_with(|| a.original_rank.cmp(&b.original_rank))
        });
        for (rank, result) in ranked.iter_mut().enumerate() {
            result.rank = rank;
        }
        ranked
    }

    /// Results in search order, scored by similarity alone
    pub fn passthrough(results: &SearchResults) -> Vec<RankedResult> {
        results
            .hits
            .iter()
            .enumerate()
            .map(|(rank, hit)| RankedResult {
                item_id: hit.item_id,
                distance: hit.distance,
                similarity: hit.similarity,
                rank,
                original_rank: rank,
                final_score: f64::from(hit.similarity),
                signals: None,
            })
            .collect()
    }

    /// Human-readable account of how a result was scored
    pub fn explain(&self, result: &RankedResult) -> String {
        let mut out = format!(
            "item {} ranked #{} (was #{}), score {:.4}",
            result.item_id,
            result.rank + 1,
            result.original_rank + 1,
            result.final_score
        );
        match &result.signals {
            Some(s) => {
                let w = &self.weights;
                out.push_str(&format!(
                    " = {:.2}*similarity {:.4} + {:.2}*popularity {:.4} + {:.2}*price {:.4} + {:.2}*brand {:.4}",
                    w.similarity,
                    s.similarity,
                    w.popularity,
                    s.popularity,
                    w.price_affinity,
                    s.price_affinity,
                    w.brand_affinity,
                    s.brand_affinity
                ));
            }
            None => out.push_str(" (similarity only)"),
        }
        out
    }
}
