//! In-memory store for tests and local development.
//!
//! All state lives behind a single [`tokio::sync::RwLock`], so every write
//! operation is atomic. Checkout in particular holds the write lock for its
//! whole read-compute-write cycle, which gives the same exactly-one-order
//! guarantee the Postgres implementation gets from its transaction.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use clementine_core::{CartId, CartItemId, CategoryId, OrderId, OrderStatus, ProductId, UserId};

use super::store::{NewProduct, NewUser, PriceOrdering, ProductQuery, ProductUpdate, Store};
use super::{CheckoutError, RepositoryError};
use crate::models::{Cart, CartLine, Category, Order, OrderLine, Product, User};

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone)]
struct CartItemRecord {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: i32,
}

#[derive(Debug)]
struct Inner {
    next_user_id: i32,
    next_category_id: i32,
    next_product_id: i32,
    next_cart_id: i32,
    next_cart_item_id: i32,
    next_order_id: i32,
    users: Vec<UserRecord>,
    categories: Vec<Category>,
    products: Vec<Product>,
    carts: Vec<Cart>,
    cart_items: Vec<CartItemRecord>,
    orders: Vec<Order>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            next_user_id: 1,
            next_category_id: 1,
            next_product_id: 1,
            next_cart_id: 1,
            next_cart_item_id: 1,
            next_order_id: 1,
            users: Vec::new(),
            categories: Vec::new(),
            products: Vec::new(),
            carts: Vec::new(),
            cart_items: Vec::new(),
            orders: Vec::new(),
        }
    }
}

impl Inner {
    fn lines_for_cart(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        self.cart_items
            .iter()
            .filter(|item| item.cart_id == cart_id)
            .map(|item| {
                let product = self
                    .products
                    .iter()
                    .find(|p| p.id == item.product_id)
                    .ok_or_else(|| {
                        RepositoryError::DataCorruption(format!(
                            "cart item {} references missing product {}",
                            item.id, item.product_id
                        ))
                    })?;

                Ok(CartLine {
                    item_id: item.id,
                    product_id: item.product_id,
                    product_name: product.name.clone(),
                    quantity: item.quantity,
                    unit_price: product.price,
                })
            })
            .collect()
    }
}

/// Store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let mut inner = self.inner.write().await;

        if inner.users.iter().any(|r| r.user.username == new_user.username) {
            return Err(RepositoryError::Conflict("username already exists".to_owned()));
        }

        let id = UserId::new(inner.next_user_id);
        inner.next_user_id += 1;

        let now = Utc::now();
        let user = User {
            id,
            username: new_user.username,
            email: new_user.email,
            is_customer: new_user.is_customer,
            is_admin: new_user.is_admin,
            created_at: now,
            updated_at: now,
        };

        inner.users.push(UserRecord {
            user: user.clone(),
            password_hash: new_user.password_hash,
        });

        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone()))
    }

    async fn user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|r| r.user.username == username)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.categories.clone())
    }

    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let mut inner = self.inner.write().await;

        let id = CategoryId::new(inner.next_category_id);
        inner.next_category_id += 1;

        let category = Category {
            id,
            name: name.to_owned(),
        };
        inner.categories.push(category.clone());

        Ok(category)
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let inner = self.inner.read().await;

        let needle = query.search.as_ref().map(|s| s.to_lowercase());
        let mut products: Vec<Product> = inner
            .products
            .iter()
            .filter(|p| query.category.is_none_or(|c| p.category_id == Some(c)))
            .filter(|p| {
                needle.as_ref().is_none_or(|n| {
                    p.name.to_lowercase().contains(n) || p.description.to_lowercase().contains(n)
                })
            })
            .cloned()
            .collect();

        products.sort_by(|a, b| match query.ordering {
            PriceOrdering::Ascending => a
                .price
                .cmp(&b.price)
                .then_with(|| a.id.as_i32().cmp(&b.id.as_i32())),
            PriceOrdering::Descending => b
                .price
                .cmp(&a.price)
                .then_with(|| a.id.as_i32().cmp(&b.id.as_i32())),
        });

        Ok(products)
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.products.iter().find(|p| p.id == id).cloned())
    }

    async fn create_product(&self, new_product: NewProduct) -> Result<Product, RepositoryError> {
        let mut inner = self.inner.write().await;

        let id = ProductId::new(inner.next_product_id);
        inner.next_product_id += 1;

        let now = Utc::now();
        let product = Product {
            id,
            name: new_product.name,
            description: new_product.description,
            price: new_product.price,
            category_id: new_product.category_id,
            image_url: new_product.image_url,
            created_at: now,
            updated_at: now,
        };
        inner.products.push(product.clone());

        Ok(product)
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let mut inner = self.inner.write().await;

        let product = inner
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;

        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(category_id) = update.category_id {
            product.category_id = Some(category_id);
        }
        if let Some(image_url) = update.image_url {
            product.image_url = Some(image_url);
        }
        product.updated_at = Utc::now();

        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;

        let before = inner.products.len();
        inner.products.retain(|p| p.id != id);
        if inner.products.len() == before {
            return Err(RepositoryError::NotFound);
        }

        // Mirror the database cascade: cart lines vanish with the product,
        // order lines keep their snapshot but lose the link
        inner.cart_items.retain(|item| item.product_id != id);
        for order in &mut inner.orders {
            for line in &mut order.lines {
                if line.product_id == Some(id) {
                    line.product_id = None;
                }
            }
        }

        Ok(())
    }

    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut inner = self.inner.write().await;

        if let Some(cart) = inner.carts.iter().find(|c| c.user_id == user_id) {
            return Ok(cart.clone());
        }

        let id = CartId::new(inner.next_cart_id);
        inner.next_cart_id += 1;

        let cart = Cart {
            id,
            user_id,
            created_at: Utc::now(),
        };
        inner.carts.push(cart.clone());

        Ok(cart)
    }

    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;

        if !inner.carts.iter().any(|c| c.id == cart_id) {
            return Err(RepositoryError::NotFound);
        }
        if !inner.products.iter().any(|p| p.id == product_id) {
            return Err(RepositoryError::NotFound);
        }

        if let Some(item) = inner
            .cart_items
            .iter_mut()
            .find(|item| item.cart_id == cart_id && item.product_id == product_id)
        {
            item.quantity += quantity;
            return Ok(());
        }

        let id = CartItemId::new(inner.next_cart_item_id);
        inner.next_cart_item_id += 1;

        inner.cart_items.push(CartItemRecord {
            id,
            cart_id,
            product_id,
            quantity,
        });

        Ok(())
    }

    async fn remove_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;

        let before = inner.cart_items.len();
        inner
            .cart_items
            .retain(|item| !(item.id == item_id && item.cart_id == cart_id));
        if inner.cart_items.len() == before {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let inner = self.inner.read().await;
        inner.lines_for_cart(cart_id)
    }

    async fn checkout(
        &self,
        user_id: UserId,
        cart_id: CartId,
        shipping_address: &str,
    ) -> Result<Order, CheckoutError> {
        let mut inner = self.inner.write().await;

        if !inner.carts.iter().any(|c| c.id == cart_id) {
            return Err(RepositoryError::NotFound.into());
        }

        let cart_lines = inner.lines_for_cart(cart_id)?;
        if cart_lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let total_cost: Decimal = cart_lines.iter().map(CartLine::total_price).sum();

        let id = OrderId::new(inner.next_order_id);
        inner.next_order_id += 1;

        let lines = cart_lines
            .into_iter()
            .map(|line| OrderLine {
                product_id: Some(line.product_id),
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
            })
            .collect();

        let order = Order {
            id,
            user_id,
            cart_id,
            shipping_address: shipping_address.to_owned(),
            total_cost,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            lines,
        };

        inner.orders.push(order.clone());
        inner.cart_items.retain(|item| item.cart_id != cart_id);

        Ok(order)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;

        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepositoryError::NotFound)?;
        order.status = status;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use clementine_core::Email;

    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_owned(),
            email: Email::parse(&format!("{username}@example.com")).unwrap(),
            password_hash: "hash".to_owned(),
            is_customer: true,
            is_admin: false,
        }
    }

    fn new_product(name: &str, price: Decimal, category_id: Option<CategoryId>) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            description: format!("{name} description"),
            price,
            category_id,
            image_url: None,
        }
    }

    async fn seeded_cart(store: &MemoryStore) -> (UserId, CartId, ProductId) {
        let user = store.create_user(new_user("alice")).await.unwrap();
        let product = store
            .create_product(new_product("Mug", Decimal::new(12_50, 2), None))
            .await
            .unwrap();
        let cart = store.get_or_create_cart(user.id).await.unwrap();
        (user.id, cart.id, product.id)
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("alice")).await.unwrap();

        let err = store.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_or_create_cart_is_idempotent() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("alice")).await.unwrap();

        let first = store.get_or_create_cart(user.id).await.unwrap();
        let second = store.get_or_create_cart(user.id).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_add_cart_item_merges_quantity() {
        let store = MemoryStore::new();
        let (_, cart_id, product_id) = seeded_cart(&store).await;

        store.add_cart_item(cart_id, product_id, 2).await.unwrap();
        store.add_cart_item(cart_id, product_id, 3).await.unwrap();

        let lines = store.cart_lines(cart_id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[0].total_price(), Decimal::new(62_50, 2));
    }

    #[tokio::test]
    async fn test_remove_cart_item_is_scoped_to_cart() {
        let store = MemoryStore::new();
        let (_, cart_id, product_id) = seeded_cart(&store).await;
        store.add_cart_item(cart_id, product_id, 1).await.unwrap();
        let item_id = store.cart_lines(cart_id).await.unwrap()[0].item_id;

        let other = store.create_user(new_user("bob")).await.unwrap();
        let other_cart = store.get_or_create_cart(other.id).await.unwrap();

        let err = store
            .remove_cart_item(other_cart.id, item_id)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
        assert_eq!(store.cart_lines(cart_id).await.unwrap().len(), 1);

        store.remove_cart_item(cart_id, item_id).await.unwrap();
        assert!(store.cart_lines(cart_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_snapshots_prices() {
        let store = MemoryStore::new();
        let (user_id, cart_id, product_id) = seeded_cart(&store).await;
        store.add_cart_item(cart_id, product_id, 2).await.unwrap();

        let order = store.checkout(user_id, cart_id, "1 Main St").await.unwrap();
        assert_eq!(order.total_cost, Decimal::new(25_00, 2));
        assert_eq!(order.status, OrderStatus::Pending);

        // Later price changes must not touch the placed order
        let update = ProductUpdate {
            price: Some(Decimal::new(99_99, 2)),
            ..ProductUpdate::default()
        };
        store.update_product(product_id, update).await.unwrap();

        let stored = store.order_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.total_cost, Decimal::new(25_00, 2));
        assert_eq!(stored.lines[0].unit_price, Decimal::new(12_50, 2));
        assert_eq!(stored.lines[0].product_name, "Mug");
    }

    #[tokio::test]
    async fn test_checkout_clears_cart_but_keeps_it() {
        let store = MemoryStore::new();
        let (user_id, cart_id, product_id) = seeded_cart(&store).await;
        store.add_cart_item(cart_id, product_id, 1).await.unwrap();

        store.checkout(user_id, cart_id, "1 Main St").await.unwrap();

        assert!(store.cart_lines(cart_id).await.unwrap().is_empty());
        let cart = store.get_or_create_cart(user_id).await.unwrap();
        assert_eq!(cart.id, cart_id);

        let err = store
            .checkout(user_id, cart_id, "1 Main St")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[tokio::test]
    async fn test_concurrent_checkout_places_one_order() {
        let store = Arc::new(MemoryStore::new());
        let (user_id, cart_id, product_id) = seeded_cart(&store).await;
        store.add_cart_item(cart_id, product_id, 1).await.unwrap();

        let first = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.checkout(user_id, cart_id, "1 Main St").await })
        };
        let second = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.checkout(user_id, cart_id, "1 Main St").await })
        };

        let (first, second) = tokio::join!(first, second);
        let results = [first.unwrap(), second.unwrap()];

        let placed = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(placed, 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(CheckoutError::EmptyCart))));
        assert_eq!(store.orders_for_user(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_product_keeps_unset_fields() {
        let store = MemoryStore::new();
        let product = store
            .create_product(new_product("Mug", Decimal::new(12_50, 2), None))
            .await
            .unwrap();

        let update = ProductUpdate {
            name: Some("Tall Mug".to_owned()),
            ..ProductUpdate::default()
        };
        let updated = store.update_product(product.id, update).await.unwrap();

        assert_eq!(updated.name, "Tall Mug");
        assert_eq!(updated.description, "Mug description");
        assert_eq!(updated.price, Decimal::new(12_50, 2));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_product() {
        let store = MemoryStore::new();
        let missing = ProductId::new(99);

        let err = store
            .update_product(missing, ProductUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));

        let err = store.delete_product(missing).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_product_cascades_to_cart_and_unlinks_orders() {
        let store = MemoryStore::new();
        let (user_id, cart_id, product_id) = seeded_cart(&store).await;
        store.add_cart_item(cart_id, product_id, 1).await.unwrap();
        let order = store.checkout(user_id, cart_id, "1 Main St").await.unwrap();

        store.add_cart_item(cart_id, product_id, 2).await.unwrap();
        store.delete_product(product_id).await.unwrap();

        assert!(store.cart_lines(cart_id).await.unwrap().is_empty());

        let stored = store.order_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.lines[0].product_id, None);
        assert_eq!(stored.lines[0].product_name, "Mug");
    }

    #[tokio::test]
    async fn test_list_products_filters_and_orders() {
        let store = MemoryStore::new();
        let category = store.create_category("Kitchen").await.unwrap();

        store
            .create_product(new_product("Mug", Decimal::new(12_50, 2), Some(category.id)))
            .await
            .unwrap();
        store
            .create_product(new_product("Kettle", Decimal::new(45_00, 2), Some(category.id)))
            .await
            .unwrap();
        store
            .create_product(new_product("Poster", Decimal::new(8_00, 2), None))
            .await
            .unwrap();

        let all = store.list_products(&ProductQuery::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Poster", "Mug", "Kettle"]);

        let descending = store
            .list_products(&ProductQuery {
                ordering: PriceOrdering::Descending,
                ..ProductQuery::default()
            })
            .await
            .unwrap();
        let names: Vec<&str> = descending.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Kettle", "Mug", "Poster"]);

        let in_category = store
            .list_products(&ProductQuery {
                category: Some(category.id),
                ..ProductQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(in_category.len(), 2);

        let searched = store
            .list_products(&ProductQuery {
                search: Some("KET".to_owned()),
                ..ProductQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].name, "Kettle");
    }

    #[tokio::test]
    async fn test_set_order_status() {
        let store = MemoryStore::new();
        let (user_id, cart_id, product_id) = seeded_cart(&store).await;
        store.add_cart_item(cart_id, product_id, 1).await.unwrap();
        let order = store.checkout(user_id, cart_id, "1 Main St").await.unwrap();

        store
            .set_order_status(order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        let stored = store.order_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Shipped);

        let err = store
            .set_order_status(OrderId::new(99), OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
