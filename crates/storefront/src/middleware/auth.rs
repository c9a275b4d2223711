//! Authentication middleware and extractors.
//!
//! Route handlers opt into authentication by taking [`CurrentUser`] or
//! [`RequireAdmin`] as an argument. Both resolve the bearer token to a live
//! user row, so a deleted user's still-valid token is rejected.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::set_sentry_user;
use crate::models::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Extractor that requires a valid access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     CurrentUser(user): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct CurrentUser(pub User);

/// Extractor that additionally requires staff privileges.
pub struct RequireAdmin(pub User);

/// Error returned when authentication or authorization fails.
pub enum AuthRejection {
    /// No usable Authorization header on the request.
    MissingCredentials,
    /// Bearer token present but expired, malformed, or orphaned.
    InvalidToken,
    /// Authenticated, but the user is not staff.
    PermissionDenied,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided.",
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Given token not valid for any token type",
            ),
            Self::PermissionDenied => (
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action.",
            ),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Pull the bearer token out of the Authorization header.
///
/// A header with a different scheme counts as no credentials at all.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthRejection::MissingCredentials)?;

        let service = AuthService::new(state.store(), state.config());
        let user = service
            .user_from_access_token(token)
            .await
            .map_err(|_| AuthRejection::InvalidToken)?;

        set_sentry_user(&user.id, Some(&user.username));

        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_staff() {
            return Err(AuthRejection::PermissionDenied);
        }

        Ok(Self(user))
    }
}
