//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                   - Liveness check
//! GET    /health/ready             - Readiness check (store ping)
//!
//! # Auth
//! POST   /auth/register            - Create account
//! POST   /auth/login               - Obtain refresh/access token pair
//! POST   /auth/token/refresh       - Exchange refresh token for access token
//!
//! # Catalog
//! GET    /products                 - Product listing (?category, ?search, ?ordering)
//! GET    /products/{id}            - Product detail
//! POST   /products/create          - Create product (admin)
//! PUT    /products/{id}/update     - Update product (admin, partial)
//! PATCH  /products/{id}/update     - Update product (admin, partial)
//! DELETE /products/{id}/delete     - Delete product (admin)
//! GET    /categories               - Category listing
//! POST   /categories               - Create category
//!
//! # Cart (requires auth)
//! GET    /cart                     - View cart with totals
//! POST   /cart/add                 - Add item to the caller's cart
//! DELETE /cart/remove/{item_id}    - Remove item from the caller's cart
//! POST   /checkout                 - Place an order from the cart
//!
//! # Orders
//! GET    /orders                   - Caller's order history
//! GET    /orders/manage/{order_id} - Order detail (admin)
//! PUT    /orders/manage/{order_id} - Update order status (admin)
//! ```
//!
//! Trailing-slash variants of every path work too; `main` wraps the router
//! in `NormalizePathLayer::trim_trailing_slash`.

pub mod auth;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/token/refresh", post(auth::refresh))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/create", post(products::create))
        .route("/{id}", get(products::show))
        .route(
            "/{id}/update",
            put(products::update).patch(products::update),
        )
        .route("/{id}/delete", delete(products::destroy))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove/{item_id}", delete(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/", get(orders::index)).route(
        "/manage/{order_id}",
        get(orders::show_managed).put(orders::update_status),
    )
}

/// Create the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .route(
            "/categories",
            get(categories::index).post(categories::create),
        )
        .nest("/cart", cart_routes())
        .route("/checkout", post(cart::checkout))
        .nest("/orders", order_routes())
        .with_state(state)
}

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}

/// Readiness probe; verifies the store answers.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.store().ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::error!("readiness check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "not ready")
        }
    }
}
