//! Shared helpers for the storefront API tests.
//!
//! Tests drive the full router backed by the in-memory store, so every
//! request passes through routing, extractors, and handlers exactly as it
//! would in production, with no database involved.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use clementine_storefront::config::ShopConfig;
use clementine_storefront::db::MemoryStore;
use clementine_storefront::routes;
use clementine_storefront::state::AppState;

/// Password used for every test account.
pub const PASSWORD: &str = "s3cretpass";

/// Configuration that never connects anywhere.
pub fn test_config() -> ShopConfig {
    ShopConfig {
        database_url: SecretString::from("postgres://localhost/clementine_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 8000,
        jwt_secret: SecretString::from("api-test-jwt-secret-0123456789-abcdefghij"),
        access_token_ttl_secs: 3600,
        refresh_token_ttl_secs: 86400,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Build the application router over a fresh in-memory store.
pub fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    routes::router(AppState::new(test_config(), store))
}

/// Send one request and return the status plus the parsed JSON body.
///
/// Empty bodies (e.g. 204 responses) come back as `Value::Null`.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("failed to build request");

    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is not JSON")
    };

    (status, body)
}

/// Register an account. Email and password are derived from the username.
pub async fn register(app: &Router, username: &str, is_admin: bool) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": PASSWORD,
            "password2": PASSWORD,
            "is_admin": is_admin,
        })),
    )
    .await
}

/// Log in and return the access token.
pub async fn login_token(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": username, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access"]
        .as_str()
        .expect("login response has no access token")
        .to_string()
}

/// Register a customer account and return its access token.
pub async fn customer_token(app: &Router, username: &str) -> String {
    let (status, _) = register(app, username, false).await;
    assert_eq!(status, StatusCode::CREATED);
    login_token(app, username).await
}

/// Register the staff account and return its access token.
pub async fn admin_token(app: &Router) -> String {
    let (status, _) = register(app, "admin", true).await;
    assert_eq!(status, StatusCode::CREATED);
    login_token(app, "admin").await
}

/// Create a product as staff and return its id.
pub async fn create_product(
    app: &Router,
    token: &str,
    name: &str,
    price: &str,
    category: Option<i64>,
) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/products/create",
        Some(token),
        Some(json!({
            "name": name,
            "description": format!("{name} description"),
            "price": price,
            "category": category,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().expect("created product has no id")
}

/// Create a category and return its id.
pub async fn create_category(app: &Router, name: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/categories",
        None,
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().expect("created category has no id")
}
