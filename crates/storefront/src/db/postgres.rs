//! `PostgreSQL` store implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use clementine_core::{CartId, CartItemId, Email, OrderId, OrderStatus, ProductId, UserId};

use super::store::{NewProduct, NewUser, PriceOrdering, ProductQuery, ProductUpdate, Store};
use super::{CheckoutError, RepositoryError};
use crate::models::{Cart, CartLine, Category, Order, OrderLine, Product, User};

/// Store backed by `PostgreSQL` via sqlx.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_user(row: &PgRow) -> Result<User, RepositoryError> {
        let email_raw: String = row.try_get("email")?;
        let email = Email::parse(&email_raw).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email,
            is_customer: row.try_get("is_customer")?,
            is_admin: row.try_get("is_admin")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_category(row: PgRow) -> Result<Category, RepositoryError> {
        Ok(Category {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product, RepositoryError> {
        Ok(Product {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            category_id: row.try_get("category_id")?,
            image_url: row.try_get("image_url")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_cart(row: PgRow) -> Result<Cart, RepositoryError> {
        Ok(Cart {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_cart_line(row: PgRow) -> Result<CartLine, RepositoryError> {
        Ok(CartLine {
            item_id: row.try_get("item_id")?,
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
        })
    }

    fn row_to_order_line(row: &PgRow) -> Result<OrderLine, RepositoryError> {
        Ok(OrderLine {
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
        })
    }

    fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order, RepositoryError> {
        let status_raw: String = row.try_get("status")?;
        let status = status_raw
            .parse::<OrderStatus>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Order {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            cart_id: row.try_get("cart_id")?,
            shipping_address: row.try_get("shipping_address")?,
            total_cost: row.try_get("total_cost")?,
            status,
            created_at: row.try_get("created_at")?,
            lines,
        })
    }

    /// Fetch cart lines with any executor, so checkout can reuse the query
    /// inside its transaction.
    async fn fetch_cart_lines<'e, E>(
        executor: E,
        cart_id: CartId,
    ) -> Result<Vec<CartLine>, RepositoryError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query(
            r#"
            SELECT ci.id AS item_id, ci.product_id, p.name AS product_name, ci.quantity,
                   p.price AS unit_price
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id ASC
            "#,
        )
        .bind(cart_id)
        .fetch_all(executor)
        .await?;

        rows.into_iter().map(Self::row_to_cart_line).collect()
    }

    async fn fetch_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, product_name, quantity, unit_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_order_line).collect()
    }
}

/// Escape `LIKE` wildcards in a user-supplied search term.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl Store for PostgresStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, is_customer, is_admin)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, is_customer, is_admin, created_at, updated_at
            "#,
        )
        .bind(&new_user.username)
        .bind(new_user.email.as_str())
        .bind(&new_user.password_hash)
        .bind(new_user.is_customer)
        .bind(new_user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("username already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Self::row_to_user(&row)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, is_customer, is_admin, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, is_customer, is_admin, created_at, updated_at,
                   password_hash
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let password_hash: String = row.try_get("password_hash")?;
        let user = Self::row_to_user(&row)?;
        Ok(Some((user, password_hash)))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_category).collect()
    }

    async fn create_category(&self, name: &str) -> Result<Category, RepositoryError> {
        let row = sqlx::query("INSERT INTO categories (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Self::row_to_category(row)
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "SELECT id, name, description, price, category_id, image_url, created_at, updated_at \
             FROM products WHERE 1 = 1",
        );

        if let Some(category) = query.category {
            builder.push(" AND category_id = ");
            builder.push_bind(category);
        }

        if let Some(search) = &query.search {
            let pattern = format!("%{}%", escape_like(search));
            builder.push(" AND (name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR description ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        // Secondary id sort keeps equal-price orderings stable
        builder.push(match query.ordering {
            PriceOrdering::Ascending => " ORDER BY price ASC, id ASC",
            PriceOrdering::Descending => " ORDER BY price DESC, id ASC",
        });

        let rows = builder.build().fetch_all(&self.pool).await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price, category_id, image_url, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn create_product(&self, new_product: NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, description, price, category_id, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, price, category_id, image_url, created_at, updated_at
            "#,
        )
        .bind(&new_product.name)
        .bind(&new_product.description)
        .bind(new_product.price)
        .bind(new_product.category_id)
        .bind(&new_product.image_url)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                category_id = COALESCE($5, category_id),
                image_url = COALESCE($6, image_url),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, price, category_id, image_url, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&update.name)
        .bind(&update.description)
        .bind(update.price)
        .bind(update.category_id)
        .bind(&update.image_url)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT id, user_id, created_at FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Self::row_to_cart(row)
    }

    async fn add_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            "#,
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // Product deleted between the existence check and the insert
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(())
    }

    async fn remove_cart_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND cart_id = $2")
            .bind(item_id)
            .bind(cart_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        Self::fetch_cart_lines(&self.pool, cart_id).await
    }

    async fn checkout(
        &self,
        user_id: UserId,
        cart_id: CartId,
        shipping_address: &str,
    ) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await?;

        // Serialize concurrent checkouts of the same cart
        sqlx::query("SELECT id FROM carts WHERE id = $1 FOR UPDATE")
            .bind(cart_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let cart_lines = Self::fetch_cart_lines(&mut *tx, cart_id).await?;
        if cart_lines.is_empty() {
            // Dropping the transaction rolls back; no order row is created
            return Err(CheckoutError::EmptyCart);
        }

        let total_cost: Decimal = cart_lines.iter().map(CartLine::total_price).sum();

        let order_row = sqlx::query(
            r#"
            INSERT INTO orders (user_id, cart_id, shipping_address, total_cost, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at
            "#,
        )
        .bind(user_id)
        .bind(cart_id)
        .bind(shipping_address)
        .bind(total_cost)
        .bind(OrderStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let order_id: OrderId = order_row.try_get("id").map_err(RepositoryError::from)?;

        let mut lines = Vec::with_capacity(cart_lines.len());
        for line in cart_lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;

            lines.push(OrderLine {
                product_id: Some(line.product_id),
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            user_id,
            cart_id,
            shipping_address: shipping_address.to_owned(),
            total_cost,
            status: OrderStatus::Pending,
            created_at: order_row.try_get("created_at").map_err(RepositoryError::from)?,
            lines,
        })
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let order_rows = sqlx::query(
            r#"
            SELECT id, user_id, cart_id, shipping_address, total_cost, status, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if order_rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = order_rows
            .iter()
            .map(|row| row.try_get::<OrderId, _>("id").map(|id| id.as_i32()))
            .collect::<Result<_, sqlx::Error>>()?;

        let line_rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines_by_order: HashMap<i32, Vec<OrderLine>> = HashMap::new();
        for row in &line_rows {
            let order_id: i32 = row.try_get("order_id")?;
            lines_by_order
                .entry(order_id)
                .or_default()
                .push(Self::row_to_order_line(row)?);
        }

        let mut orders = Vec::with_capacity(order_rows.len());
        for row in &order_rows {
            let id: OrderId = row.try_get("id")?;
            let lines = lines_by_order.remove(&id.as_i32()).unwrap_or_default();
            orders.push(Self::row_to_order(row, lines)?);
        }

        Ok(orders)
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, cart_id, shipping_address, total_cost, status, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines = self.fetch_order_lines(id).await?;
        Ok(Some(Self::row_to_order(&row, lines)?))
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
