//! civic-api library - HTTP service for civic issue reporting
//!
//! Citizens register, report issues with photos, video or audio, and follow
//! their progress. New issues are routed to a department by the keyword
//! classifier in `civic_common::classifier`; administrators review the
//! uncertain ones and assign field workers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use civic_common::notifications::Notifier;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;

pub use error::{ApiError, ApiResult};

/// Upper bound for a whole request body (multipart issue submissions)
pub const MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Secret used to sign and verify access tokens
    pub signing_secret: i64,
    /// Lifetime of newly issued access tokens
    pub token_ttl_minutes: i64,
    /// Directory holding uploaded media
    pub uploads_dir: PathBuf,
    /// Browser origins allowed by CORS
    pub allowed_origins: Vec<String>,
    pub notifier: Arc<Notifier>,
}

impl AppState {
    pub fn new(db: SqlitePool, signing_secret: i64, uploads_dir: PathBuf, notifier: Notifier) -> Self {
        Self {
            db,
            signing_secret,
            token_ttl_minutes: 30,
            uploads_dir,
            allowed_origins: Vec::new(),
            notifier: Arc::new(notifier),
        }
    }

    pub fn with_token_ttl(mut self, minutes: i64) -> Self {
        self.token_ttl_minutes = minutes;
        self
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}

/// Build application router
///
/// Authentication is enforced per handler through the `CurrentUser` and
/// `AdminUser` extractors; health, issue browsing and suggestions are public.
pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.uploads_dir);
    let cors = cors_layer(&state.allowed_origins);

    Router::new()
        .merge(api::health_routes())
        .nest("/api/auth", api::auth_routes())
        .nest("/api/users", api::user_routes())
        .nest("/api/issues", api::issue_routes())
        .nest("/api/admin", api::admin_routes())
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
