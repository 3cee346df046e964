//! Search-Related Value Objects
//!
//! Attribute filters, nearest-neighbor hits and annotated result sets.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::embedding::similarity_from_distance;
use super::ids::{BrandId, CategoryId, ItemId, MerchantId};
use super::item::ItemAttributes;
use crate::error::Error;

/// Conjunction of optional attribute predicates
///
/// ## Business Rules
///
/// - No predicate set means unrestricted
/// - Price bounds are inclusive; an item without a price never satisfies one
/// - A minimum stock quantity requires a known quantity
/// - Empty id sets are treated as "no restriction"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Lower price bound (inclusive)
    pub min_price: Option<f64>,
    /// Upper price bound (inclusive)
    pub max_price: Option<f64>,
    /// Only items flagged in stock
    #[serde(default)]
    pub in_stock_only: bool,
    /// Minimum units in stock
    pub min_stock_quantity: Option<u32>,
    /// Allowed merchants
    #[serde(default)]
    pub merchant_ids: BTreeSet<MerchantId>,
    /// Allowed categories
    #[serde(default)]
    pub category_ids: BTreeSet<CategoryId>,
    /// Allowed brands
    #[serde(default)]
    pub brand_ids: BTreeSet<BrandId>,
}

impl SearchFilters {
    /// Filters with no predicate
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Restrict to a price range
    pub fn with_price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Only in-stock items
    pub fn in_stock(mut self) -> Self {
        self.in_stock_only = true;
        self
    }

    /// Require at least `quantity` units in stock
    pub fn with_min_stock(mut self, quantity: u32) -> Self {
        self.min_stock_quantity = Some(quantity);
        self
    }

    /// Restrict to the given merchants
    pub fn with_merchants<I: IntoIterator<Item = MerchantId>>(mut self, ids: I) -> Self {
        self.merchant_ids = ids.into_iter().collect();
        self
    }

    /// Restrict to the given categories
    pub fn with_categories<I: IntoIterator<Item = CategoryId>>(mut self, ids: I) -> Self {
        self.category_ids = ids.into_iter().collect();
        self
    }

    /// Restrict to the given brands
    pub fn with_brands<I: IntoIterator<Item = BrandId>>(mut self, ids: I) -> Self {
        self.brand_ids = ids.into_iter().collect();
        self
    }

    /// Whether no predicate is set
    pub fn is_unrestricted(&self) -> bool {
        self.min_price.is_none()
            && self.max_price.is_none()
            && !self.in_stock_only
            && self.min_stock_quantity.is_none()
            && self.merchant_ids.is_empty()
            && self.category_ids.is_empty()
            && self.brand_ids.is_empty()
    }

    /// Evaluate every predicate against an item
    pub fn matches(&self, attributes: &ItemAttributes) -> bool {
        if self.min_price.is_some() || self.max_price.is_some() {
            let Some(price) = attributes.price else {
                return false;
            };
            if self.min_price.is_some_and(|min| price < min)
                || self.max_price.is_some_and(|max| price > max)
            {
                return false;
            }
        }
        if self.in_stock_only && !attributes.in_stock {
            return false;
        }
        if let Some(min_qty) = self.min_stock_quantity {
            if attributes.stock_quantity.is_none_or(|qty| qty < min_qty) {
                return false;
            }
        }
        member_of(&self.merchant_ids, attributes.merchant_id)
            && member_of(&self.category_ids, attributes.category_id)
            && member_of(&self.brand_ids, attributes.brand_id)
    }
}

fn member_of<T: Ord>(allowed: &BTreeSet<T>, value: Option<T>) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.contains(&v))
}

/// How a filtered search was executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// No filter applied
    Unfiltered,
    /// Matching ids fetched first, search restricted to them
    Subset,
    /// Overfetched neighbors filtered afterwards
    Postfilter,
}

impl SearchStrategy {
    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unfiltered => "unfiltered",
            Self::Subset => "subset",
            Self::Postfilter => "postfilter",
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unfiltered" | "none" => Ok(Self::Unfiltered),
            "subset" | "prefilter" => Ok(Self::Subset),
            "postfilter" => Ok(Self::Postfilter),
            other => Err(Error::invalid_argument(format!(
                "unknown search strategy: {other}"
            ))),
        }
    }
}

/// One nearest neighbor returned by the index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Item identifier
    pub item_id: ItemId,
    /// Cosine distance to the query, in `[0, 2]`
    pub distance: f32,
}

impl Neighbor {
    /// Create a neighbor
    pub fn new(item_id: ItemId, distance: f32) -> Self {
        Self { item_id, distance }
    }

    /// Similarity in `[0, 1]`
    pub fn similarity(&self) -> f32 {
        similarity_from_distance(self.distance)
    }

    /// Result order: distance ascending, then item id ascending
    pub fn result_order(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.item_id.cmp(&other.item_id))
    }
}

/// A search hit with its position in the result list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Item identifier
    pub item_id: ItemId,
    /// Cosine distance to the query
    pub distance: f32,
    /// Similarity in `[0, 1]`
    pub similarity: f32,
    /// 0-based position
    pub rank: usize,
}

/// Annotated result of a (filtered) search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Hits ordered by distance ascending
    pub hits: Vec<SearchHit>,
    /// Requested result count
    pub k: usize,
    /// Number of hits found (may be less than `k`)
    pub total_found: usize,
    /// Wall time spent searching
    pub elapsed: Duration,
    /// Strategy actually used
    pub strategy: SearchStrategy,
    /// Set when a dependency failed and a fallback was used
    pub degraded: bool,
}

impl SearchResults {
    /// Build results from ordered neighbors
    pub fn from_neighbors(
        neighbors: Vec<Neighbor>,
        k: usize,
        strategy: SearchStrategy,
        elapsed: Duration,
    ) -> Self {
        let hits: Vec<SearchHit> = neighbors
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(rank, n)| SearchHit {
                item_id: n.item_id,
                distance: n.distance,
                similarity: n.similarity(),
                rank,
            })
            .collect();
        Self {
            total_found: hits.len(),
            hits,
            k,
            elapsed,
            strategy,
            degraded: false,
        }
    }

    /// Empty, non-error result
    pub fn empty(k: usize, strategy: SearchStrategy) -> Self {
        Self::from_neighbors(Vec::new(), k, strategy, Duration::ZERO)
    }

    /// Mark the result as produced by a fallback path
    pub fn degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    /// Whether nothing was found
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Item ids in result order
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.hits.iter().map(|h| h.item_id).collect()
    }
}
