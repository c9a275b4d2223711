//! Catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use clementine_core::{CategoryId, ProductId};

/// A flat product category.
#[derive(Debug, Clone)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A product in the catalog.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Unit price. Serialized as a string on the wire.
    pub price: Decimal,
    /// Optional category; cleared when the category is deleted.
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every update.
    pub updated_at: DateTime<Utc>,
}
