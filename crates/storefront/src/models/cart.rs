//! Cart domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use clementine_core::{CartId, CartItemId, ProductId, UserId};

/// A user's shopping cart.
///
/// One cart per user, created lazily on first cart access. The row survives
/// checkout; only its items are cleared.
#[derive(Debug, Clone)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A cart line joined with the current product.
///
/// Prices here are live: they reflect the product's price at read time, not
/// at the time the item was added.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl CartLine {
    /// Line total at the current unit price.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}
