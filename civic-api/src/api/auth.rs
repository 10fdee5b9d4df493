//! Registration, login and request authentication
//!
//! Access tokens are issued by `civic_common::api::auth` and sent back as
//! `Authorization: Bearer <token>`. Handlers opt in to authentication by
//! taking a [`CurrentUser`] or [`AdminUser`] argument.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::{header::AUTHORIZATION, request::Parts},
    routing::post,
    Form, Json, Router,
};
use civic_common::api::auth::{hash_password, issue_token, verify_password, verify_token};
use civic_common::db::users::{get_user, get_user_by_email, get_user_by_mobile, insert_user, NewUser};
use civic_common::db::User;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{ApiError, ApiResult, AppState};

/// Country prefix every mobile number must carry
pub const MOBILE_PREFIX: &str = "+91";

/// Length of `+91` followed by ten digits
pub const MOBILE_LENGTH: usize = 13;

pub const MIN_PASSWORD_LENGTH: usize = 6;

const INVALID_LOGIN: &str = "Incorrect mobile number or password";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub mobile_number: String,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub password: String,
}

/// OAuth2-style password form; `username` carries the mobile number
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct MobileLoginQuery {
    pub mobile_number: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Treat blank optional text as absent
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn validate_mobile(mobile: &str) -> ApiResult<()> {
    if !mobile.starts_with(MOBILE_PREFIX) || mobile.chars().count() != MOBILE_LENGTH {
        return Err(ApiError::BadRequest(
            "Mobile number must start with +91 and be 13 characters long".to_string(),
        ));
    }
    Ok(())
}

/// Argon2 is CPU-bound; run it off the async workers
async fn hash_off_thread(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("Hashing task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(e.to_string()))
}

async fn verify_off_thread(password: String, stored_hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::Internal(format!("Verification task failed: {}", e)))
}

fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<Json<User>> {
    let mobile_number = request.mobile_number.trim().to_string();
    validate_mobile(&mobile_number)?;
    validate_password(&request.password)?;

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }

    if get_user_by_mobile(&state.db, &mobile_number).await?.is_some() {
        return Err(ApiError::BadRequest("Mobile number already registered".to_string()));
    }

    let email = non_blank(request.email);
    if let Some(email) = &email {
        if get_user_by_email(&state.db, email).await?.is_some() {
            return Err(ApiError::BadRequest("Email already registered".to_string()));
        }
    }

    let new_user = NewUser {
        mobile_number,
        name,
        email,
        address: non_blank(request.address),
        is_admin: false,
        password_hash: hash_off_thread(request.password).await?,
    };

    let user = insert_user(&state.db, &new_user).await?;
    info!("Registered user {} ({})", user.id, user.mobile_number);
    Ok(Json(user))
}

/// Check credentials and issue a token
async fn authenticate(state: &AppState, mobile_number: &str, password: &str) -> ApiResult<TokenResponse> {
    let user = get_user_by_mobile(&state.db, mobile_number.trim())
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_LOGIN.to_string()))?;

    if !verify_off_thread(password.to_string(), user.password_hash.clone()).await? {
        return Err(ApiError::Unauthorized(INVALID_LOGIN.to_string()));
    }

    let access_token = issue_token(user.id, state.token_ttl_minutes, state.signing_secret)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    debug!("Issued token for user {}", user.id);
    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    })
}

/// POST /api/auth/login (form encoded)
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> ApiResult<Json<TokenResponse>> {
    authenticate(&state, &form.username, &form.password).await.map(Json)
}

/// POST /api/auth/login/mobile?mobile_number=&password=
pub async fn login_mobile(
    State(state): State<AppState>,
    Query(query): Query<MobileLoginQuery>,
) -> ApiResult<Json<TokenResponse>> {
    authenticate(&state, &query.mobile_number, &query.password).await.map(Json)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/login/mobile", post(login_mobile))
}

// ============================================================================
// Extractors
// ============================================================================

/// Authenticated, active user
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Authenticated administrator
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn credentials_error() -> ApiError {
    ApiError::Unauthorized("Could not validate credentials".to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(credentials_error)?;

        let user_id = verify_token(token, state.signing_secret).map_err(|e| {
            debug!("Rejected token: {}", e);
            credentials_error()
        })?;

        let user = get_user(&state.db, user_id).await?.ok_or_else(credentials_error)?;
        if !user.is_active {
            return Err(ApiError::BadRequest("Inactive user".to_string()));
        }

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(ApiError::Forbidden("Not enough permissions".to_string()));
        }
        Ok(AdminUser(user))
    }
}
