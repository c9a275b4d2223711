//! Order route handlers.
//!
//! Customers see their own order history; staff manage any order through
//! the `/orders/manage` endpoints. Order lines come from the checkout-time
//! snapshot, so later catalog edits never change what an order shows.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use clementine_core::{OrderId, OrderStatus, UserId};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::middleware::{CurrentUser, RequireAdmin};
use crate::models::Order;
use crate::state::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Order line on the wire; `price` is the unit price at checkout time.
#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

/// Order wire representation.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub user: UserId,
    pub shipping_address: String,
    pub total_cost: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub product_list: Vec<OrderLineResponse>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user: order.user_id,
            shipping_address: order.shipping_address,
            total_cost: order.total_cost,
            status: order.status,
            created_at: order.created_at,
            product_list: order
                .lines
                .into_iter()
                .map(|line| OrderLineResponse {
                    product_name: line.product_name,
                    quantity: line.quantity,
                    price: line.unit_price,
                })
                .collect(),
        }
    }
}

/// Status update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// The caller's order history.
#[instrument(skip(state, user))]
pub async fn index(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>> {
    let orders = state.store().orders_for_user(user.id).await?;
    if orders.is_empty() {
        return Err(AppError::NotFound(
            "No orders found for this user.".to_owned(),
        ));
    }

    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// Order detail for staff.
#[instrument(skip(state), fields(order_id = %order_id))]
pub async fn show_managed(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderResponse>> {
    let order = state
        .store()
        .order_by_id(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found.".to_owned()))?;

    Ok(Json(order.into()))
}

/// Update an order's status.
///
/// Any current-to-target move between the four statuses is allowed; only
/// membership is checked. A missing order outranks a bad status value.
#[instrument(skip(state, payload), fields(order_id = %order_id))]
pub async fn update_status(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Value>> {
    state
        .store()
        .order_by_id(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found.".to_owned()))?;

    let status = payload
        .status
        .as_deref()
        .and_then(|raw| raw.parse::<OrderStatus>().ok())
        .ok_or_else(|| AppError::Validation("Invalid status.".to_owned()))?;

    state
        .store()
        .set_order_status(order_id, status)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Order not found.".to_owned()),
            other => AppError::Database(other),
        })?;

    Ok(Json(
        json!({ "detail": format!("Order status updated to {status}.") }),
    ))
}
