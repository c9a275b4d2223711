//! Demo catalog seeding.
//!
//! Inserts a small set of categories and products for local development.
//! Skips entirely when the catalog already has products.
//!
//! # Usage
//!
//! ```bash
//! clem-cli seed
//! ```

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use super::database_url;

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Demo products per category: (name, description, price in cents).
const DEMO_CATALOG: &[(&str, &[(&str, &str, i64)])] = &[
    (
        "Kitchen",
        &[
            ("Enamel Kettle", "Stovetop kettle, 1.5 litres", 29_99),
            ("Stoneware Mug", "Dishwasher-safe 350 ml mug", 9_99),
            ("Walnut Serving Board", "End-grain walnut, 40x25 cm", 44_50),
        ],
    ),
    (
        "Wall Art",
        &[
            ("Harbor Print", "A3 giclee print on matte paper", 18_00),
            ("Linen Wall Hanging", "Hand-woven, natural dye", 62_00),
        ],
    ),
    (
        "Stationery",
        &[(
            "Dot Grid Notebook",
            "A5, 160 pages, lay-flat binding",
            12_75,
        )],
    ),
];

/// Load the demo catalog.
///
/// # Errors
///
/// Returns `SeedError` if the database URL is unset or a query fails.
pub async fn demo_catalog() -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let database_url = database_url().ok_or(SeedError::MissingEnvVar("SHOP_DATABASE_URL"))?;

    info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    let product_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
        .fetch_one(&pool)
        .await?;

    if product_count > 0 {
        info!("Catalog already has {product_count} products, skipping seed");
        return Ok(());
    }

    let mut inserted = 0;
    for (category_name, products) in DEMO_CATALOG {
        let category_id =
            sqlx::query_scalar::<_, i32>("INSERT INTO categories (name) VALUES ($1) RETURNING id")
                .bind(category_name)
                .fetch_one(&pool)
                .await?;

        for (name, description, price_cents) in *products {
            sqlx::query(
                r"
                INSERT INTO products (name, description, price, category_id)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(name)
            .bind(description)
            .bind(Decimal::new(*price_cents, 2))
            .bind(category_id)
            .execute(&pool)
            .await?;
            inserted += 1;
        }

        info!(
            "Seeded category {category_name} with {} products",
            products.len()
        );
    }

    info!("Demo catalog loaded: {inserted} products");
    Ok(())
}
