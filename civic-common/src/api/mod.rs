//! API module for shared HTTP API functionality
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Database operations (via sqlx)
//! - Shared types
//!
//! The HTTP service wraps these with axum extractors and middleware.

pub mod auth;

pub use auth::{hash_password, issue_token, verify_password, verify_token, AuthError};

#[cfg(feature = "sqlx")]
pub use auth::load_signing_secret;
