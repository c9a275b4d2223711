//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use clementine_core::{CartId, OrderId, OrderStatus, ProductId, UserId};

/// A placed order.
///
/// Orders are append-only: after checkout, `status` is the only mutable
/// field. Lines are a snapshot taken at checkout time, so the order reports
/// what was purchased regardless of later product or cart changes.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// The cart this order was checked out from. Kept as a plain reference;
    /// the cart row is never deleted.
    pub cart_id: CartId,
    pub shipping_address: String,
    /// Sum of line totals at checkout time.
    pub total_cost: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

/// An order line frozen at checkout time.
#[derive(Debug, Clone)]
pub struct OrderLine {
    /// The originating product, if it still exists.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}
