//! HTTP API handlers for civic-api

pub mod admin;
pub mod auth;
pub mod health;
pub mod issues;
pub mod users;

pub use admin::admin_routes;
pub use auth::{auth_routes, AdminUser, CurrentUser};
pub use health::health_routes;
pub use issues::issue_routes;
pub use users::user_routes;
