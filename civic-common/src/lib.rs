//! # Civic Common Library
//!
//! Shared code for the civic issue reporting service including:
//! - Keyword classifier that routes issues to departments
//! - Database schema, models and shared queries
//! - Password hashing and access tokens
//! - Configuration loading
//! - SMS notification composition

pub mod api;
pub mod classifier;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
#[cfg(feature = "sqlx")]
pub mod notifications;

pub use classifier::{
    CategorySuggestion, ClassificationResult, DepartmentProfile, DepartmentRecord, IssueClassifier,
};
pub use error::{Error, Result};
