//! Staff account management commands.
//!
//! # Usage
//!
//! ```bash
//! clem-cli admin create -u root -e root@example.com -p <password>
//! ```
//!
//! # Environment Variables
//!
//! - `SHOP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use clementine_core::{Email, EmailError};
use clementine_storefront::services::auth::{self, AuthError};

use super::database_url;

/// Errors that can occur during staff account operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password validation or hashing failure.
    #[error("{0}")]
    Password(#[from] AuthError),

    /// User already exists.
    #[error("A user already exists with username: {0}")]
    UserExists(String),
}

/// Create a staff account.
///
/// The account gets both role flags, so it can shop as a customer and
/// manage the catalog and orders.
///
/// # Errors
///
/// Returns `AdminError` if validation fails, the username is taken, or the
/// database is unreachable.
pub async fn create_staff(username: &str, email: &str, password: &str) -> Result<i32, AdminError> {
    dotenvy::dotenv().ok();

    let email = Email::parse(email)?;
    auth::validate_password(password)?;
    let password_hash = auth::hash_password(password)?;

    let database_url = database_url().ok_or(AdminError::MissingEnvVar("SHOP_DATABASE_URL"))?;

    info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    info!("Creating staff account: {username} ({})", email.as_str());

    // Check if the username is already taken
    let existing = sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(&pool)
        .await?;

    if existing.is_some() {
        return Err(AdminError::UserExists(username.to_owned()));
    }

    let user_id = sqlx::query_scalar::<_, i32>(
        r"
        INSERT INTO users (username, email, password_hash, is_customer, is_admin)
        VALUES ($1, $2, $3, TRUE, TRUE)
        RETURNING id
        ",
    )
    .bind(username)
    .bind(email.as_str())
    .bind(&password_hash)
    .fetch_one(&pool)
    .await?;

    info!("Staff account created! ID: {user_id}, Username: {username}");

    Ok(user_id)
}
