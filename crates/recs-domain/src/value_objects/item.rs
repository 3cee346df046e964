//! Item Value Objects

use serde::{Deserialize, Serialize};

use super::embedding::Embedding;
use super::ids::{BrandId, CategoryId, ItemId, MerchantId};

/// Filterable attributes of a catalog item
///
/// A fixed set of optional fields. New filterable attributes are added
/// here explicitly, together with the matching predicate in
/// [`SearchFilters`](super::search::SearchFilters).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemAttributes {
    /// Current price, if known
    pub price: Option<f64>,
    /// Stock flag
    pub in_stock: bool,
    /// Units in stock, if tracked
    pub stock_quantity: Option<u32>,
    /// Selling merchant
    pub merchant_id: Option<MerchantId>,
    /// Catalog category
    pub category_id: Option<CategoryId>,
    /// Brand
    pub brand_id: Option<BrandId>,
}

impl ItemAttributes {
    /// Set the price
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    /// Set the stock flag and quantity
    pub fn with_stock(mut self, quantity: u32) -> Self {
        self.in_stock = quantity > 0;
        self.stock_quantity = Some(quantity);
        self
    }

    /// Set the merchant
    pub fn with_merchant(mut self, merchant: MerchantId) -> Self {
        self.merchant_id = Some(merchant);
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: CategoryId) -> Self {
        self.category_id = Some(category);
        self
    }

    /// Set the brand
    pub fn with_brand(mut self, brand: BrandId) -> Self {
        self.brand_id = Some(brand);
        self
    }
}

/// An embedded catalog item
///
/// Created when an item is embedded and added to the index; re-embedding
/// replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Item identifier
    pub id: ItemId,
    /// Unit-length item vector
    pub embedding: Embedding,
    /// Filterable attributes
    #[serde(default)]
    pub attributes: ItemAttributes,
}

impl ItemRecord {
    /// Record without attributes
    pub fn new(id: ItemId, embedding: Embedding) -> Self {
        Self {
            id,
            embedding,
            attributes: ItemAttributes::default(),
        }
    }

    /// Attach attributes
    pub fn with_attributes(mut self, attributes: ItemAttributes) -> Self {
        self.attributes = attributes;
        self
    }
}
