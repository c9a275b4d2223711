//! Integration tests for Clementine.
//!
//! The tests in this crate run against a live storefront server backed by a
//! real PostgreSQL database, so they are `#[ignore]`d by default and skipped
//! on a plain `cargo test`.
//!
//! # Running Tests
//!
//! ```bash
//! # Apply migrations to the test database
//! cargo run -p clementine-cli -- migrate
//!
//! # Start the storefront in another shell
//! cargo run -p clementine-storefront
//!
//! # Run the ignored tests against it
//! cargo test -p clementine-integration-tests -- --ignored
//! ```
//!
//! The tests target `http://localhost:8000` unless `SHOP_BASE_URL` is set.
//! Every test registers its own throwaway accounts and products, so the suite
//! can run against a database that already holds data.
