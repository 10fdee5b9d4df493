//! Issue reporting endpoints
//!
//! Submissions arrive as multipart forms with optional media attachments.
//! Each new issue is routed by a classifier loaded from the current
//! department table, so keyword edits take effect on the next submission.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use civic_common::classifier::{CategorySuggestion, IssueClassifier, DEFAULT_SUGGESTION_LIMIT};
use civic_common::db::departments::get_department;
use civic_common::db::users::get_user;
use civic_common::db::workers::get_worker;
use civic_common::db::{Issue, IssueMedia, IssuePriority, IssueStatus, MediaKind};
use civic_common::notifications::{IssueEvent, IssueSummary};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use super::auth::{non_blank, AdminUser, CurrentUser};
use crate::db::issues::{
    count_issues, delete_issue, get_issue, insert_issue, list_issues, list_issues_by_user, record_vote,
    save_issue,
};
use crate::db::media::{get_media, insert_media};
use crate::db::{IssueChanges, IssueFilter, NewIssue, NewMedia, VoteKind};
use crate::pagination::{PageParams, DEFAULT_LIMIT};
use crate::{ApiError, ApiResult, AppState};

/// Content types accepted for attachments
pub const ALLOWED_MIME_TYPES: [&str; 6] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "video/mp4",
    "audio/mpeg",
    "audio/wav",
];

/// Per-file attachment limit
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

pub const MIN_TITLE_LENGTH: usize = 5;
pub const MIN_DESCRIPTION_LENGTH: usize = 10;

/// Category recorded when the classifier picks no department
pub const GENERAL_CATEGORY: &str = "general";

/// Directory segment used in stored media paths
const UPLOADS_PREFIX: &str = "uploads";

#[derive(Debug)]
struct UploadedFile {
    filename: String,
    mime_type: String,
    bytes: Bytes,
}

/// Parsed multipart submission
#[derive(Debug, Default)]
struct IssueSubmission {
    title: String,
    description: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    address: Option<String>,
    files: Vec<UploadedFile>,
}

#[derive(Debug, Deserialize)]
pub struct IssueListQuery {
    pub status: Option<IssueStatus>,
    pub department_id: Option<i64>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct IssueListResponse {
    pub issues: Vec<Issue>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Debug, Deserialize)]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    pub worker_id: Option<i64>,
    pub department_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub vote_type: String,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    pub text: String,
    pub limit: Option<usize>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Parse an optional numeric form field; blank means absent
fn parse_coordinate(name: &str, value: &str) -> ApiResult<Option<f64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ApiError::BadRequest(format!("{} must be a number", name)))
}

async fn read_submission(multipart: &mut Multipart) -> ApiResult<IssueSubmission> {
    let mut submission = IssueSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => submission.title = field.text().await.map_err(multipart_error)?,
            "description" => submission.description = field.text().await.map_err(multipart_error)?,
            "latitude" => {
                let text = field.text().await.map_err(multipart_error)?;
                submission.latitude = parse_coordinate("latitude", &text)?;
            }
            "longitude" => {
                let text = field.text().await.map_err(multipart_error)?;
                submission.longitude = parse_coordinate("longitude", &text)?;
            }
            "address" => {
                let text = field.text().await.map_err(multipart_error)?;
                submission.address = non_blank(Some(text));
            }
            "files" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                // Browsers send an empty part when no file was chosen
                if filename.is_empty() {
                    continue;
                }

                let mime_type = field.content_type().unwrap_or_default().to_string();
                if !ALLOWED_MIME_TYPES.contains(&mime_type.as_str()) {
                    return Err(ApiError::BadRequest(format!(
                        "File type {} not allowed",
                        if mime_type.is_empty() { "unknown" } else { mime_type.as_str() }
                    )));
                }

                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.len() > MAX_FILE_BYTES {
                    return Err(ApiError::PayloadTooLarge(format!(
                        "File {} exceeds the 10 MB limit",
                        filename
                    )));
                }

                submission.files.push(UploadedFile {
                    filename,
                    mime_type,
                    bytes,
                });
            }
            other => warn!("Ignoring unexpected form field: {}", other),
        }
    }

    submission.title = submission.title.trim().to_string();
    submission.description = submission.description.trim().to_string();

    if submission.title.chars().count() < MIN_TITLE_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Title must be at least {} characters long",
            MIN_TITLE_LENGTH
        )));
    }
    if submission.description.chars().count() < MIN_DESCRIPTION_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Description must be at least {} characters long",
            MIN_DESCRIPTION_LENGTH
        )));
    }

    Ok(submission)
}

/// `{issue_id}_{uuid}{.ext}`, keeping the client's extension
fn stored_file_name(issue_id: i64, original: &str) -> String {
    let extension = std::path::Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();
    format!("{}_{}{}", issue_id, Uuid::new_v4(), extension)
}

/// Location on disk of a stored media file
///
/// Only the final path component of the recorded path is used, so a record
/// can never point outside the upload directory.
fn media_disk_path(state: &AppState, media: &IssueMedia) -> Option<PathBuf> {
    std::path::Path::new(&media.file_path)
        .file_name()
        .map(|name| state.uploads_dir.join(name))
}

/// Insert the issue and its media in one transaction
///
/// Every file written to disk is pushed onto `written` before its row is
/// inserted. Nothing is visible to readers until the commit; on error the
/// transaction rolls back when dropped and the caller removes `written`.
async fn store_submission(
    state: &AppState,
    new_issue: &NewIssue,
    files: Vec<UploadedFile>,
    written: &mut Vec<PathBuf>,
) -> ApiResult<i64> {
    let mut tx = state.db.begin().await?;
    let issue_id = insert_issue(&mut *tx, new_issue).await?;

    if !files.is_empty() {
        tokio::fs::create_dir_all(&state.uploads_dir).await?;
    }
    for file in files {
        let stored_name = stored_file_name(issue_id, &file.filename);
        let disk_path = state.uploads_dir.join(&stored_name);
        tokio::fs::write(&disk_path, &file.bytes).await?;
        written.push(disk_path);

        let media = NewMedia {
            issue_id,
            file_path: format!("{}/{}", UPLOADS_PREFIX, stored_name),
            kind: MediaKind::from_mime(&file.mime_type),
            mime_type: file.mime_type,
            file_size: file.bytes.len() as i64,
            original_filename: file.filename,
        };
        insert_media(&mut *tx, &media).await?;
    }

    tx.commit().await?;
    Ok(issue_id)
}

async fn remove_written_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove orphaned upload {}: {}", path.display(), e);
        }
    }
}

fn summary(issue: &Issue) -> IssueSummary {
    IssueSummary {
        id: issue.id,
        title: issue.title.clone(),
        status: issue.status,
        needs_manual_review: issue.needs_manual_review,
    }
}

async fn load_issue(state: &AppState, issue_id: i64) -> ApiResult<Issue> {
    get_issue(&state.db, issue_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Issue not found".to_string()))
}

/// POST /api/issues (multipart)
pub async fn create_issue(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Json<Issue>> {
    let submission = read_submission(&mut multipart).await?;

    let classifier = IssueClassifier::load(&state.db).await?;
    let result = classifier.classify(&submission.title, &submission.description);
    let category = result
        .department_id
        .and_then(|id| classifier.profiles().find(|p| p.id == id))
        .map(|profile| profile.name.clone())
        .unwrap_or_else(|| GENERAL_CATEGORY.to_string());

    let new_issue = NewIssue {
        title: submission.title,
        description: submission.description,
        category,
        latitude: submission.latitude,
        longitude: submission.longitude,
        address: submission.address,
        user_id: user.id,
        department_id: result.department_id,
        ai_confidence: result.confidence,
        needs_manual_review: result.needs_review,
    };
    let mut written = Vec::new();
    let issue_id = match store_submission(&state, &new_issue, submission.files, &mut written).await {
        Ok(issue_id) => issue_id,
        Err(e) => {
            remove_written_files(&written).await;
            return Err(e);
        }
    };

    let issue = load_issue(&state, issue_id).await?;
    info!(
        "Issue {} created by user {}: department={:?} confidence={:.3} review={}",
        issue.id, user.id, issue.department_id, issue.ai_confidence, issue.needs_manual_review
    );

    state.notifier.dispatch(&IssueEvent::Created {
        issue: summary(&issue),
        citizen_phone: user.mobile_number.clone(),
    });

    Ok(Json(issue))
}

/// GET /api/issues
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<IssueListQuery>,
    Query(page): Query<PageParams>,
) -> ApiResult<Json<IssueListResponse>> {
    let filter = IssueFilter {
        status: query.status,
        department_id: query.department_id,
        user_id: query.user_id,
    };
    let window = page.window(DEFAULT_LIMIT);

    let total = count_issues(&state.db, &filter).await?;
    let issues = list_issues(&state.db, &filter, window.offset, window.limit).await?;

    Ok(Json(IssueListResponse {
        issues,
        total,
        page: window.page,
        per_page: window.limit,
    }))
}

/// GET /api/issues/my
pub async fn my_issues(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Issue>>> {
    Ok(Json(list_issues_by_user(&state.db, user.id).await?))
}

/// GET /api/issues/:id
pub async fn read_issue(State(state): State<AppState>, Path(issue_id): Path<i64>) -> ApiResult<Json<Issue>> {
    load_issue(&state, issue_id).await.map(Json)
}

/// PUT /api/issues/:id (owner or admin)
pub async fn update_issue(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(issue_id): Path<i64>,
    Json(update): Json<IssueUpdate>,
) -> ApiResult<Json<Issue>> {
    let issue = load_issue(&state, issue_id).await?;
    if !user.is_admin && issue.user_id != user.id {
        return Err(ApiError::Forbidden("Not enough permissions".to_string()));
    }

    if let Some(worker_id) = update.worker_id {
        if get_worker(&state.db, worker_id).await?.is_none() {
            return Err(ApiError::NotFound("Worker not found".to_string()));
        }
    }
    if let Some(department_id) = update.department_id {
        if get_department(&state.db, department_id).await?.is_none() {
            return Err(ApiError::NotFound("Department not found".to_string()));
        }
    }

    let changes = IssueChanges {
        title: update.title,
        description: update.description,
        status: update.status,
        priority: update.priority,
        worker_id: update.worker_id,
        department_id: update.department_id,
    };
    let updated = changes.apply_to(&issue, chrono::Utc::now());
    save_issue(&state.db, &updated).await?;

    if updated.status != issue.status {
        info!("Issue {} status {} -> {}", issue.id, issue.status, updated.status);
        if let Some(owner) = get_user(&state.db, updated.user_id).await? {
            state.notifier.dispatch(&IssueEvent::StatusUpdated {
                issue: summary(&updated),
                citizen_phone: owner.mobile_number,
            });
        }
    }

    Ok(Json(updated))
}

/// POST /api/issues/:id/vote
pub async fn vote(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(issue_id): Path<i64>,
    Json(request): Json<VoteRequest>,
) -> ApiResult<Json<Value>> {
    let kind = match request.vote_type.as_str() {
        "up" => VoteKind::Up,
        "down" => VoteKind::Down,
        _ => {
            return Err(ApiError::BadRequest(
                "vote_type must be \"up\" or \"down\"".to_string(),
            ))
        }
    };

    let (upvotes, downvotes) = record_vote(&state.db, issue_id, kind)
        .await?
        .ok_or_else(|| ApiError::NotFound("Issue not found".to_string()))?;

    Ok(Json(json!({
        "message": "Vote recorded",
        "upvotes": upvotes,
        "downvotes": downvotes,
    })))
}

/// GET /api/issues/:id/media/:media_id
pub async fn read_media(
    State(state): State<AppState>,
    Path((issue_id, media_id)): Path<(i64, i64)>,
) -> ApiResult<Response> {
    let media = get_media(&state.db, issue_id, media_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Media not found".to_string()))?;

    let path = media_disk_path(&state, &media)
        .filter(|path| path.is_file())
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;

    let bytes = tokio::fs::read(&path).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        media.original_filename.replace(['"', '\\'], "_")
    );

    Ok((
        [
            (header::CONTENT_TYPE, media.mime_type.clone()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// DELETE /api/issues/:id (admin)
pub async fn remove_issue(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(issue_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let issue = load_issue(&state, issue_id).await?;

    for media in &issue.media {
        let Some(path) = media_disk_path(&state, media) else {
            continue;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }

    delete_issue(&state.db, issue_id).await?;
    info!("Issue {} deleted by admin {}", issue_id, admin.id);

    Ok(Json(json!({ "message": "Issue deleted successfully" })))
}

/// GET /api/issues/suggestions?text=&limit=
///
/// Ranked departments for draft text; advisory only, nothing is stored.
pub async fn suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> ApiResult<Json<Vec<CategorySuggestion>>> {
    let classifier = IssueClassifier::load(&state.db).await?;
    let limit = query.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);
    Ok(Json(classifier.suggest(&query.text, limit)))
}

pub fn issue_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create_issue))
        .route("/my", get(my_issues))
        .route("/suggestions", get(suggestions))
        .route("/:id", get(read_issue).put(update_issue).delete(remove_issue))
        .route("/:id/vote", post(vote))
        .route("/:id/media/:media_id", get(read_media))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_file_name_keeps_extension() {
        let name = stored_file_name(7, "photo.JPG");
        assert!(name.starts_with("7_"));
        assert!(name.ends_with(".JPG"));

        let bare = stored_file_name(7, "recording");
        assert!(!bare.contains('.'));
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("latitude", " 12.97 ").unwrap(), Some(12.97));
        assert_eq!(parse_coordinate("latitude", "").unwrap(), None);
        assert!(parse_coordinate("latitude", "north").is_err());
    }

    #[test]
    fn test_allowed_types() {
        assert!(ALLOWED_MIME_TYPES.contains(&"audio/wav"));
        assert!(!ALLOWED_MIME_TYPES.contains(&"application/pdf"));
    }
}
