//! Authentication service.
//!
//! Provides password registration and login plus the JWT pair used by the
//! API: a short-lived access token and a longer-lived refresh token.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use clementine_core::{Email, UserId};

use crate::config::ShopConfig;
use crate::db::{NewUser, RepositoryError, Store};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Kind of JWT issued by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Claims carried by both token kinds.
///
/// `token_type` distinguishes access from refresh tokens so one can never be
/// used in place of the other.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub username: String,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

/// Token pair returned on login.
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Authentication service.
///
/// Handles user registration, login, and token issuance/verification.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    config: &'a ShopConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, config: &'a ShopConfig) -> Self {
        Self { store, config }
    }

    // =========================================================================
    // Registration & Login
    // =========================================================================

    /// Register a new account.
    ///
    /// The role flags come from the request; `is_admin` makes the account
    /// staff, since staff is derived from the admin flag.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::PasswordMismatch` if the two passwords differ.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UsernameTaken` if the username is already registered.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        password2: &str,
        is_customer: bool,
        is_admin: bool,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        if password != password2 {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .store
            .create_user(NewUser {
                username: username.to_owned(),
                email,
                password_hash,
                is_customer,
                is_admin,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UsernameTaken,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    /// Login with username and password, returning the user and a fresh
    /// token pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is
    /// wrong. Unknown usernames and bad passwords are indistinguishable.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        let (user, password_hash) = self
            .store
            .user_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let pair = self.issue_token_pair(&user)?;
        Ok((user, pair))
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Issue a refresh/access pair for a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue_token_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            refresh: self.issue_token(user.id, &user.username, TokenKind::Refresh)?,
            access: self.issue_token(user.id, &user.username, TokenKind::Access)?,
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// No database lookup happens here; a deleted user's refresh token mints
    /// access tokens that then fail at request authentication.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenInvalid` if the token is expired, malformed,
    /// or not a refresh token.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let claims = self.verify_token(refresh_token, TokenKind::Refresh)?;
        self.issue_token(claims.sub, &claims.username, TokenKind::Access)
    }

    /// Resolve an access token to its user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenInvalid` if the token is expired, malformed,
    /// or not an access token.
    /// Returns `AuthError::UserNotFound` if the user has since been deleted.
    pub async fn user_from_access_token(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.verify_token(token, TokenKind::Access)?;

        self.store
            .user_by_id(claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    fn issue_token(
        &self,
        user_id: UserId,
        username: &str,
        kind: TokenKind,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.config.access_token_ttl_secs,
            TokenKind::Refresh => self.config.refresh_token_ttl_secs,
        };

        let claims = Claims {
            sub: user_id,
            username: username.to_owned(),
            token_type: kind.as_str().to_owned(),
            iat: now,
            exp: now + ttl,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.expose_secret().as_bytes()),
        )
        .map_err(|_| AuthError::TokenEncoding)
    }

    fn verify_token(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.expose_secret().as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AuthError::TokenInvalid)?;

        if data.claims.token_type != kind.as_str() {
            return Err(AuthError::TokenInvalid);
        }

        Ok(data.claims)
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `WeakPassword` with the user-facing message if the password is
/// shorter than [`MIN_PASSWORD_LENGTH`].
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
