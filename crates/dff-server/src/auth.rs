//! Password hashing and session tokens for inventory page users.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sessions last a season; the inventory page has no refresh flow.
const TOKEN_LIFETIME_DAYS: i64 = 90;

const BCRYPT_COST: u32 = 10;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token signing failed: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("invalid or expired token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Signs an HS256 token for `user_id`.
///
/// # Errors
///
/// Returns [`AuthError::Sign`] if encoding fails.
pub fn sign_token(user_id: i64, secret: &str) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AuthError::Sign)
}

/// Verifies signature and expiry and returns the claims.
///
/// # Errors
///
/// Returns [`AuthError::InvalidToken`] for a bad signature, malformed token,
/// or expired token.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(AuthError::InvalidToken)
}

/// # Errors
///
/// Returns [`AuthError::Hash`] if bcrypt fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

/// # Errors
///
/// Returns [`AuthError::Hash`] if `hash` is not a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    Ok(bcrypt::verify(password, hash)?)
}
