//! Health check and welcome endpoints

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

pub const SERVICE_NAME: &str = "Civic Issue API";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
    pub version: String,
    pub health: String,
}

/// GET /
pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: format!("Welcome to {}", SERVICE_NAME),
        version: env!("CARGO_PKG_VERSION").to_string(),
        health: "/api/health".to_string(),
    })
}

/// GET /api/health
///
/// Does not touch the database and needs no authentication.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/api/health", get(health_check))
}
