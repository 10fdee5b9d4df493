//! User profile endpoints

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use civic_common::db::users::{get_user, get_user_by_email, list_users, update_profile, ProfileChanges};
use civic_common::db::User;
use serde::Deserialize;

use super::auth::{non_blank, AdminUser, CurrentUser};
use crate::pagination::{PageParams, DEFAULT_USER_LIMIT};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// GET /api/users/me
pub async fn read_me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

/// PUT /api/users/me
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    let changes = ProfileChanges {
        name: non_blank(update.name),
        email: non_blank(update.email),
        address: update.address,
    };

    if let Some(email) = &changes.email {
        if let Some(owner) = get_user_by_email(&state.db, email).await? {
            if owner.id != user.id {
                return Err(ApiError::BadRequest("Email already registered".to_string()));
            }
        }
    }

    let updated = update_profile(&state.db, &user, &changes).await?;
    Ok(Json(updated))
}

/// GET /api/users (admin)
pub async fn read_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<PageParams>,
) -> ApiResult<Json<Vec<User>>> {
    let window = page.window(DEFAULT_USER_LIMIT);
    let users = list_users(&state.db, window.offset, window.limit).await?;
    Ok(Json(users))
}

/// GET /api/users/:id (admin)
pub async fn read_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<User>> {
    get_user(&state.db, user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(read_users))
        .route("/me", get(read_me).put(update_me))
        .route("/:id", get(read_user))
}
