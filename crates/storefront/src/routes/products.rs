//! Product route handlers.
//!
//! Listing and detail are public; create/update/delete require staff.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use clementine_core::{CategoryId, ProductId};

use crate::db::{NewProduct, PriceOrdering, ProductQuery, ProductUpdate};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Product;
use crate::state::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Product wire representation.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: Option<CategoryId>,
    pub image_url: Option<String>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category_id,
            image_url: product.image_url,
        }
    }
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<CategoryId>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

/// Create product request body.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: Option<CategoryId>,
    pub image_url: Option<String>,
}

/// Update product request body. Absent fields keep their current values.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<CategoryId>,
    pub image_url: Option<String>,
}

// =============================================================================
// Public Handlers
// =============================================================================

/// List products, with optional category filter, name/description search,
/// and price ordering (`ordering=-price` for descending).
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProductResponse>>> {
    let product_query = ProductQuery {
        category: query.category,
        search: query.search.filter(|s| !s.is_empty()),
        ordering: PriceOrdering::parse(query.ordering.as_deref()),
    };

    let products = state.store().list_products(&product_query).await?;

    Ok(Json(
        products.into_iter().map(ProductResponse::from).collect(),
    ))
}

/// Product detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductResponse>> {
    let product = state
        .store()
        .product_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Not found.".to_owned()))?;

    Ok(Json(product.into()))
}

// =============================================================================
// Admin Handlers
// =============================================================================

/// Create a product.
#[instrument(skip(state, payload), fields(name = %payload.name))]
pub async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let product = state
        .store()
        .create_product(NewProduct {
            name: payload.name,
            description: payload.description,
            price: payload.price,
            category_id: payload.category,
            image_url: payload.image_url,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// Update a product. PUT and PATCH both take partial bodies.
#[instrument(skip(state, payload))]
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>> {
    let product = state
        .store()
        .update_product(
            id,
            ProductUpdate {
                name: payload.name,
                description: payload.description,
                price: payload.price,
                category_id: payload.category,
                image_url: payload.image_url,
            },
        )
        .await?;

    Ok(Json(product.into()))
}

/// Delete a product.
#[instrument(skip(state))]
pub async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    state.store().delete_product(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
