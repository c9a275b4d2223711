//! Authentication route handlers.
//!
//! Registration plus the JWT obtain/refresh pair endpoints.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use clementine_core::Email;

use crate::error::{AppError, Result};
use crate::services::auth::{AuthService, TokenPair};
use crate::state::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Registration request body.
///
/// The role flags are optional; a plain registration creates a customer.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    #[serde(default = "default_is_customer")]
    pub is_customer: bool,
    #[serde(default)]
    pub is_admin: bool,
}

const fn default_is_customer() -> bool {
    true
}

/// Registration response body.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub username: String,
    pub email: Email,
    pub is_customer: bool,
    pub is_admin: bool,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Refresh request body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Refresh response body.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a new account.
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    if payload.username.trim().is_empty() {
        return Err(AppError::Validation(
            "This field may not be blank.".to_owned(),
        ));
    }

    let service = AuthService::new(state.store(), state.config());
    let user = service
        .register(
            &payload.username,
            &payload.email,
            &payload.password,
            &payload.password2,
            payload.is_customer,
            payload.is_admin,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            username: user.username,
            email: user.email,
            is_customer: user.is_customer,
            is_admin: user.is_admin,
        }),
    ))
}

/// Obtain a refresh/access token pair for username + password.
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>> {
    let service = AuthService::new(state.store(), state.config());
    let (_, pair) = service.login(&payload.username, &payload.password).await?;

    Ok(Json(pair))
}

/// Exchange a refresh token for a new access token.
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>> {
    let service = AuthService::new(state.store(), state.config());
    let access = service.refresh(&payload.refresh)?;

    Ok(Json(RefreshResponse { access }))
}
