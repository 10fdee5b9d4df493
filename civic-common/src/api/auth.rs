//! Password hashing and signed access tokens
//!
//! # Passwords
//!
//! Stored as Argon2id PHC strings (`$argon2id$v=19$...`). The salt is part of
//! the string, so the `users` table keeps a single `password_hash` column.
//!
//! # Access tokens
//!
//! `"{user_id}.{expires_at}.{signature}"` where `expires_at` is Unix seconds
//! and `signature` is the hex HMAC-SHA256 of `"{user_id}.{expires_at}"` keyed
//! with the signing secret. The secret is a non-zero random i64 kept in the
//! `settings` table under `token_signing_secret`, generated on first use.
//!
//! # Pure Functions
//!
//! Apart from the secret loader, everything here is framework-free; the HTTP
//! service wraps these in axum extractors.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;

/// Settings key holding the token signing secret
pub const SIGNING_SECRET_KEY: &str = "token_signing_secret";

// ========================================
// Error Types
// ========================================

/// Authentication error types
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// Token does not have three dot-separated parts with numeric ids
    MalformedToken,

    /// Signature does not match the calculated value
    InvalidSignature,

    /// Token expiry is in the past
    Expired { expired_at: i64, now: i64 },

    /// Database error loading the signing secret
    DatabaseError(String),

    /// Password could not be hashed
    Hashing(String),

    /// Signing key rejected by the MAC
    Signing(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MalformedToken => write!(f, "Malformed token"),
            AuthError::InvalidSignature => write!(f, "Invalid token signature"),
            AuthError::Expired { expired_at, now } => {
                write!(f, "Token expired {}s ago", now - expired_at)
            }
            AuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
            AuthError::Hashing(err) => write!(f, "Password hashing failed: {}", err),
            AuthError::Signing(err) => write!(f, "Token signing failed: {}", err),
        }
    }
}

impl std::error::Error for AuthError {}

// ========================================
// Signing Secret Management
// ========================================

/// Load the token signing secret, creating it on first use
#[cfg(feature = "sqlx")]
pub async fn load_signing_secret(db: &SqlitePool) -> Result<i64, AuthError> {
    let result: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(SIGNING_SECRET_KEY)
        .fetch_optional(db)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    match result {
        Some((value,)) => value
            .parse::<i64>()
            .map_err(|e| AuthError::DatabaseError(format!("Invalid i64: {}", e))),
        None => initialize_signing_secret(db).await,
    }
}

/// Generate and store a new non-zero signing secret
///
/// Replacing the secret invalidates every outstanding token.
#[cfg(feature = "sqlx")]
pub async fn initialize_signing_secret(db: &SqlitePool) -> Result<i64, AuthError> {
    let mut rng = rand::thread_rng();
    let secret: i64 = loop {
        let val = rng.gen::<i64>();
        if val != 0 {
            break val;
        }
    };

    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(SIGNING_SECRET_KEY)
        .bind(secret.to_string())
        .execute(db)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    tracing::info!("Generated new token signing secret");
    Ok(secret)
}

// ========================================
// Password Hashing
// ========================================

/// Hash a password into an Argon2id PHC string with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a password against a stored PHC string
///
/// An unparseable stored hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// ========================================
// Access Tokens
// ========================================

fn token_mac(payload: &str, secret: i64) -> Result<HmacSha256, AuthError> {
    let mut mac = HmacSha256::new_from_slice(&secret.to_be_bytes())
        .map_err(|e| AuthError::Signing(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(mac)
}

/// Issue a token for `user_id` valid for `ttl_minutes`
///
/// Oversized lifetimes saturate at the largest representable expiry.
///
/// # Examples
///
/// ```
/// use civic_common::api::auth::{issue_token, verify_token};
///
/// let token = issue_token(42, 30, 123456789).unwrap();
/// assert_eq!(verify_token(&token, 123456789).unwrap(), 42);
/// assert!(verify_token(&token, 987654321).is_err());
/// ```
pub fn issue_token(user_id: i64, ttl_minutes: i64, secret: i64) -> Result<String, AuthError> {
    let expires_at = Utc::now()
        .timestamp()
        .saturating_add(ttl_minutes.saturating_mul(60));
    issue_token_until(user_id, expires_at, secret)
}

/// Issue a token with an explicit expiry (Unix seconds)
pub fn issue_token_until(user_id: i64, expires_at: i64, secret: i64) -> Result<String, AuthError> {
    let payload = format!("{}.{}", user_id, expires_at);
    let signature = hex::encode(token_mac(&payload, secret)?.finalize().into_bytes());
    Ok(format!("{}.{}", payload, signature))
}

/// Verify a token against the current time and return its user id
pub fn verify_token(token: &str, secret: i64) -> Result<i64, AuthError> {
    verify_token_at(token, secret, Utc::now().timestamp())
}

/// Verify a token against `now` (Unix seconds) and return its user id
pub fn verify_token_at(token: &str, secret: i64, now: i64) -> Result<i64, AuthError> {
    let mut parts = token.splitn(3, '.');
    let (Some(user_part), Some(expiry_part), Some(signature)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::MalformedToken);
    };

    let user_id: i64 = user_part.parse().map_err(|_| AuthError::MalformedToken)?;
    let expires_at: i64 = expiry_part.parse().map_err(|_| AuthError::MalformedToken)?;
    let provided = hex::decode(signature).map_err(|_| AuthError::InvalidSignature)?;

    // Constant-time comparison
    token_mac(&format!("{}.{}", user_id, expires_at), secret)?
        .verify_slice(&provided)
        .map_err(|_| AuthError::InvalidSignature)?;

    if now > expires_at {
        return Err(AuthError::Expired {
            expired_at: expires_at,
            now,
        });
    }

    Ok(user_id)
}

// ========================================
// Tests
// ========================================
