//! Cart and checkout route handlers.
//!
//! Every handler operates on the calling user's own cart; the cart is
//! created lazily on first touch. Checkout snapshots the cart into an order
//! and clears the cart in one atomic store operation.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use clementine_core::{CartItemId, ProductId};

use crate::db::{CheckoutError, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::state::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// One cart line on the wire. `total_price` uses the live product price.
#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub product: ProductId,
    pub quantity: i32,
    pub total_price: Decimal,
}

/// Cart contents with the running total.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart_items: Vec<CartItemResponse>,
    pub total_cost: Decimal,
}

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub shipping_address: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Add a product to the caller's cart, merging quantities for repeats.
#[instrument(skip(state, user, payload), fields(product_id = %payload.product_id))]
pub async fn add(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AddToCartRequest>,
) -> Result<Json<Value>> {
    if payload.quantity < 1 {
        return Err(AppError::Validation(
            "Quantity must be at least 1.".to_owned(),
        ));
    }

    state
        .store()
        .product_by_id(payload.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found.".to_owned()))?;

    let cart = state.store().get_or_create_cart(user.id).await?;

    state
        .store()
        .add_cart_item(cart.id, payload.product_id, payload.quantity)
        .await
        .map_err(|e| match e {
            // Product deleted between the check above and the insert
            RepositoryError::NotFound => AppError::NotFound("Product not found.".to_owned()),
            other => AppError::Database(other),
        })?;

    Ok(Json(json!({ "detail": "Item added to cart." })))
}

/// Remove an item from the caller's cart.
///
/// Items in other users' carts are indistinguishable from missing ones.
#[instrument(skip(state, user), fields(item_id = %item_id))]
pub async fn remove(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<Value>> {
    let cart = state.store().get_or_create_cart(user.id).await?;

    state
        .store()
        .remove_cart_item(cart.id, item_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::NotFound("Item not found in cart.".to_owned())
            }
            other => AppError::Database(other),
        })?;

    Ok(Json(json!({ "detail": "Item removed from cart." })))
}

/// View the caller's cart with per-line and overall totals.
#[instrument(skip(state, user))]
pub async fn show(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CartResponse>> {
    let cart = state.store().get_or_create_cart(user.id).await?;
    let lines = state.store().cart_lines(cart.id).await?;

    let total_cost = lines.iter().map(|line| line.total_price()).sum();
    let cart_items = lines
        .into_iter()
        .map(|line| CartItemResponse {
            product: line.product_id,
            quantity: line.quantity,
            total_price: line.total_price(),
        })
        .collect();

    Ok(Json(CartResponse {
        cart_items,
        total_cost,
    }))
}

/// Place an order from the caller's cart.
#[instrument(skip(state, user, payload))]
pub async fn checkout(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let shipping_address = payload
        .shipping_address
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Shipping address is required.".to_owned()))?;

    let cart = state.store().get_or_create_cart(user.id).await?;

    let order = state
        .store()
        .checkout(user.id, cart.id, shipping_address)
        .await
        .map_err(|e| match e {
            CheckoutError::EmptyCart => AppError::Validation("Cart is empty.".to_owned()),
            CheckoutError::Repository(err) => AppError::Database(err),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "detail": "Order placed successfully.", "order_id": order.id })),
    ))
}
