//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - User registration, login, and JWT issuance

pub mod auth;
