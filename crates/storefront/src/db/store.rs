//! Store trait abstracting over persistence backends.

use async_trait::async_trait;
use rust_decimal::Decimal;

use clementine_core::{CartId, CartItemId, CategoryId, Email, OrderId, OrderStatus, ProductId, UserId};

use super::{CheckoutError, RepositoryError};
use crate::models::{Cart, CartLine, Category, Order, Product, User};

/// Data for creating a user. The password arrives already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    pub password_hash: String,
    pub is_customer: bool,
    pub is_admin: bool,
}

/// Data for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
}

/// Partial product update. `None` fields keep their current values.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    pub image_url: Option<String>,
}

/// Price sort direction for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceOrdering {
    #[default]
    Ascending,
    Descending,
}

impl PriceOrdering {
    /// Parse the `ordering` query parameter.
    ///
    /// Only `-price` selects descending; anything else (including absence)
    /// sorts ascending.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("-price") => Self::Descending,
            _ => Self::Ascending,
        }
    }
}

/// Filters for the product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Exact category filter.
    pub category: Option<CategoryId>,
    /// Case-insensitive substring match over name and description.
    pub search: Option<String>,
    /// Price ordering.
    pub ordering: PriceOrdering,
}

/// Core trait for storefront persistence.
///
/// Two implementations share this behavioral contract: `PostgresStore` for
/// production and `MemoryStore` for tests. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Check backend connectivity.
    async fn ping(&self) -> Result<(), RepositoryError>;

    // =========================================================================
    // Users
    // =========================================================================

    /// Create a user.
    ///
    /// Fails with `Conflict` if the username is already taken.
    async fn create_user(&self, new_user: NewUser) -> Result<User, RepositoryError>;

    /// Get a user by ID.
    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Get a user and their password hash by username.
    async fn user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List all categories.
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Create a category.
    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError>;

    /// List products matching the query, sorted by price.
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError>;

    /// Get a product by ID.
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Create a product.
    async fn create_product(&self, new_product: NewProduct) -> Result<Product, RepositoryError>;

    /// Apply a partial update to a product and refresh its `updated_at`.
    ///
    /// Fails with `NotFound` if the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError>;

    /// Delete a product.
    ///
    /// Fails with `NotFound` if the product does not exist.
    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError>;

    // =========================================================================
    // Cart
    // =========================================================================

    /// Get the user's cart, creating it on first access. Idempotent.
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError>;

    /// Add a product to a cart.
    ///
    /// If the product is already in the cart, its quantity is increased by
    /// `quantity` in a single atomic upsert; concurrent adds must not lose
    /// updates.
    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError>;

    /// Remove an item from a cart.
    ///
    /// The item must belong to the given cart; fails with `NotFound`
    /// otherwise, so one user cannot remove items from another user's cart.
    async fn remove_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<(), RepositoryError>;

    /// List cart lines joined with current product name and price.
    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an order from the cart's current contents.
    ///
    /// Runs as a single atomic operation: read the cart lines, compute the
    /// total at current prices, insert the order with its line snapshot, and
    /// clear the cart items. Fails with `EmptyCart` (and changes nothing) if
    /// the cart has no items, so two concurrent checkouts of one cart produce
    /// exactly one order.
    async fn checkout(
        &self,
        user_id: UserId,
        cart_id: CartId,
        shipping_address: &str,
    ) -> Result<Order, CheckoutError>;

    /// List a user's orders with their snapshot lines, oldest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Get an order by ID with its snapshot lines.
    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Overwrite an order's status.
    ///
    /// Any current-to-target pair is allowed; enumeration membership is
    /// checked at the API layer. Fails with `NotFound` if the order does
    /// not exist.
    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError>;
}
