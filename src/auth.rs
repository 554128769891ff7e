use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::AppError,
    models::{Role, User},
    repository::RepositoryState,
};

pub const NO_TOKEN: &str = "Not authorized, no token";
pub const TOKEN_FAILED: &str = "Not authorized, token failed";
pub const ADMIN_ONLY: &str = "Not authorized. Only for administrators.";

/// Claims
///
/// The payload signed into every bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the `users.id` of the token holder.
    pub sub: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: usize,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: usize,
}

/// generate_token
///
/// Issues an HS256 token for `user_id`, valid for `config.jwt_expiry_days`.
pub fn generate_token(user_id: i64, config: &AppConfig) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = TimeDelta::try_days(config.jwt_expiry_days)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .and_then(|expires| usize::try_from(expires.timestamp()).ok())
        .ok_or_else(|| {
            AppError::Internal(format!(
                "token expiry of {} days is out of range",
                config.jwt_expiry_days
            ))
        })?;
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp() as usize,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// decode_token
///
/// Verifies signature and expiry and returns the claims.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
}

/// hash_password
///
/// Argon2id with a random salt; returns the PHC string stored in `users.password`.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// verify_password
///
/// `Ok(false)` for a wrong password, `Err` only if the stored hash is unreadable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("stored password hash is invalid: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(format!("password verification failed: {e}"))),
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub role: Role,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
            role: user.role,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Reuse an identity already resolved by the auth layer (request extensions).
/// 2. Otherwise extract the `Bearer` token, decode it, and re-read the user row so a
///    deleted or demoted account loses access immediately.
///
/// Rejection: 401 with a JSON message.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::unauthorized(NO_TOKEN))?;

        let claims = decode_token(token, &config.jwt_secret).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                _ => tracing::debug!(error = %e, "rejected invalid token"),
            }
            AppError::unauthorized(TOKEN_FAILED)
        })?;

        let user = repo
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized(TOKEN_FAILED))?;

        Ok(AuthUser::from(user))
    }
}

/// AdminUser
///
/// An `AuthUser` whose `is_admin` flag is set.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!(user_id = user.id, "non-admin attempted an admin route");
            return Err(AppError::unauthorized(ADMIN_ONLY));
        }
        Ok(AdminUser(user))
    }
}
