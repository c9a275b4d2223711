//! HTTP middleware stack for storefront.
//!
//! Authentication is extractor-based rather than a layer: handlers opt in by
//! taking [`CurrentUser`] or [`RequireAdmin`] as an argument. The router-wide
//! layers (tracing, CORS, trailing-slash normalization, Sentry) are assembled
//! in `main`.

pub mod auth;

pub use auth::{AuthRejection, CurrentUser, RequireAdmin};
