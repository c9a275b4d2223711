//! HTTP tests for health, registration, and the JWT endpoints.
//!
//! Run with: `cargo test -p clementine-storefront --test auth_api`

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use tower::ServiceExt;

use common::{app, customer_token, register, send};

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(String::from_utf8(body.to_vec()).expect("utf8"), "ok");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/ready")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(String::from_utf8(body.to_vec()).expect("utf8"), "ready");
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_creates_customer() {
    let app = app();

    let (status, body) = register(&app, "alice", false).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["is_customer"], true);
    assert_eq!(body["is_admin"], false);
}

#[tokio::test]
async fn test_register_role_flags_default() {
    let app = app();

    // No role flags at all makes a plain customer account
    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": "bob",
            "email": "bob@example.com",
            "password": "s3cretpass",
            "password2": "s3cretpass",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_customer"], true);
    assert_eq!(body["is_admin"], false);
}

#[tokio::test]
async fn test_register_admin_account() {
    let app = app();

    let (status, body) = register(&app, "root", true).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_admin"], true);
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let app = app();

    let (status, _) = register(&app, "alice", false).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = register(&app, "alice", false).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "A user with that username already exists.");
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = app();

    // Mismatched confirmation
    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": "carol",
            "email": "carol@example.com",
            "password": "s3cretpass",
            "password2": "different99",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Passwords do not match.");

    // Too short
    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": "carol",
            "email": "carol@example.com",
            "password": "2short!",
            "password2": "2short!",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "This password is too short. It must contain at least 8 characters."
    );

    // Not an email
    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": "carol",
            "email": "not-an-address",
            "password": "s3cretpass",
            "password2": "s3cretpass",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Enter a valid email address.");

    // Blank username
    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": "   ",
            "email": "carol@example.com",
            "password": "s3cretpass",
            "password2": "s3cretpass",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "This field may not be blank.");
}

// ============================================================================
// Login & Token Refresh
// ============================================================================

#[tokio::test]
async fn test_login_returns_token_pair() {
    let app = app();
    register(&app, "alice", false).await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "s3cretpass" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let refresh = body["refresh"].as_str().expect("refresh token");
    let access = body["access"].as_str().expect("access token");
    assert!(!refresh.is_empty());
    assert!(!access.is_empty());
    assert_ne!(refresh, access);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = app();
    register(&app, "alice", false).await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["detail"],
        "No active account found with the given credentials"
    );

    // Unknown usernames fail the same way
    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "nobody", "password": "s3cretpass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["detail"],
        "No active account found with the given credentials"
    );
}

#[tokio::test]
async fn test_refresh_exchanges_token() {
    let app = app();
    register(&app, "alice", false).await;

    let (_, pair) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "s3cretpass" })),
    )
    .await;
    let refresh = pair["refresh"].as_str().expect("refresh token");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/token/refresh",
        None,
        Some(json!({ "refresh": refresh })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_refresh_rejects_non_refresh_tokens() {
    let app = app();
    let access = customer_token(&app, "alice").await;

    // An access token cannot be exchanged for another access token
    let (status, body) = send(
        &app,
        "POST",
        "/auth/token/refresh",
        None,
        Some(json!({ "refresh": access })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Token is invalid or expired");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/token/refresh",
        None,
        Some(json!({ "refresh": "not-a-jwt" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Token is invalid or expired");
}

// ============================================================================
// Request Authentication
// ============================================================================

#[tokio::test]
async fn test_protected_routes_require_credentials() {
    let app = app();

    let (status, body) = send(&app, "GET", "/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["detail"],
        "Authentication credentials were not provided."
    );

    // A non-Bearer scheme counts as no credentials
    let request = Request::builder()
        .uri("/cart")
        .header(header::AUTHORIZATION, "Token abc123")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/cart", Some("garbage.token.here"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Given token not valid for any token type");
}

#[tokio::test]
async fn test_refresh_token_cannot_authenticate_requests() {
    let app = app();
    register(&app, "alice", false).await;

    let (_, pair) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "s3cretpass" })),
    )
    .await;
    let refresh = pair["refresh"].as_str().expect("refresh token");

    let (status, body) = send(&app, "GET", "/cart", Some(refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Given token not valid for any token type");
}
