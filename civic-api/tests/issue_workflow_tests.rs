//! Integration tests for issue submission, triage and administration
//!
//! Multipart bodies are assembled by hand; uploads land in a temporary
//! directory that is removed when the test ends.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use civic_api::{build_router, AppState};
use civic_common::db::seed::{SAMPLE_ADMIN_MOBILE, SAMPLE_CITIZEN_MOBILE};
use civic_common::db::{init_memory_database, seed_sample_data};
use civic_common::notifications::Notifier;
use serde_json::{json, Value};
use std::path::PathBuf;
use tempfile::TempDir;
use tower::util::ServiceExt;

const SECRET: i64 = 99_001;
const BOUNDARY: &str = "civic-test-boundary";

struct TestApp {
    router: axum::Router,
    uploads: TempDir,
}

async fn setup_app() -> TestApp {
    let uploads = TempDir::new().expect("Should create temp dir");
    let uploads_dir = uploads.path().to_path_buf();
    setup_app_with_uploads(uploads, uploads_dir).await
}

async fn setup_app_with_uploads(uploads: TempDir, uploads_dir: PathBuf) -> TestApp {
    let pool = init_memory_database().await.expect("Should create database");
    seed_sample_data(&pool).await.expect("Should seed");

    let state = AppState::new(
        pool,
        SECRET,
        uploads_dir,
        Notifier::logging(false, SAMPLE_ADMIN_MOBILE),
    );
    TestApp {
        router: build_router(state),
        uploads,
    }
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

async fn login(app: &TestApp, mobile: &str, password: &str) -> String {
    let uri = format!(
        "/api/auth/login/mobile?mobile_number={}&password={}",
        mobile.replace('+', "%2B"),
        password
    );
    let request = Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

fn authed(method: &str, uri: &str, token: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
}

/// One part of a multipart form
struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

fn text(name: &str, value: &str) -> Part {
    Part {
        name: name.to_string(),
        filename: None,
        content_type: None,
        data: value.as_bytes().to_vec(),
    }
}

fn file(name: &str, filename: &str, content_type: &str, data: &[u8]) -> Part {
    Part {
        name: name.to_string(),
        filename: Some(filename.to_string()),
        content_type: Some(content_type.to_string()),
        data: data.to_vec(),
    }
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match &part.filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.name, filename
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        if let Some(content_type) = &part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn submit_issue(app: &TestApp, token: &str, parts: &[Part]) -> (StatusCode, Value) {
    let request = authed("POST", "/api/issues", token)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    send(app, request).await
}

async fn submit_text_issue(app: &TestApp, token: &str, title: &str, description: &str) -> Value {
    let (status, body) = submit_issue(
        app,
        token,
        &[
            text("title", title),
            text("description", description),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
    body
}

// =============================================================================
// Submission and classification
// =============================================================================

#[tokio::test]
async fn test_submission_is_classified() {
    let app = setup_app().await;
    let token = login(&app, SAMPLE_CITIZEN_MOBILE, "citizen123").await;

    // Water: water, pipe, leak, supply = 4 of 9 keywords
    let issue = submit_text_issue(
        &app,
        &token,
        "  Water pipe leak  ",
        "The main supply is wasting water near the school",
    )
    .await;

    assert_eq!(issue["title"], "Water pipe leak");
    assert_eq!(issue["category"], "Water Department");
    assert_eq!(issue["department_id"], 1);
    assert_eq!(issue["status"], "pending");
    assert_eq!(issue["priority"], "medium");
    assert_eq!(issue["needs_manual_review"], false);
    let confidence = issue["ai_confidence"].as_f64().unwrap();
    assert!((confidence - 4.0 / 9.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_unmatched_submission_needs_review() {
    let app = setup_app().await;
    let token = login(&app, SAMPLE_CITIZEN_MOBILE, "citizen123").await;

    let issue = submit_text_issue(&app, &token, "Stray dogs", "Several stray dogs near the park gate").await;
    assert_eq!(issue["category"], "general");
    assert!(issue["department_id"].is_null());
    assert_eq!(issue["ai_confidence"], 0.0);
    assert_eq!(issue["needs_manual_review"], true);

    let admin = login(&app, SAMPLE_ADMIN_MOBILE, "admin123").await;
    let (status, pending) = send(&app, authed("GET", "/api/admin/issues/pending", &admin).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["id"], issue["id"]);
}

#[tokio::test]
async fn test_submission_validation() {
    let app = setup_app().await;
    let token = login(&app, SAMPLE_CITIZEN_MOBILE, "citizen123").await;

    let (status, body) = submit_issue(
        &app,
        &token,
        &[
            text("title", "Hole"),
            text("description", "A very deep pothole on the road"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Title must be at least 5 characters long");

    let (status, body) = submit_issue(
        &app,
        &token,
        &[
            text("title", "Pothole on road"),
            text("description", "  deep    "),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Description must be at least 10 characters long");

    let (status, body) = submit_issue(
        &app,
        &token,
        &[
            text("title", "Pothole on road"),
            text("description", "A very deep pothole on the road"),
            file("files", "report.pdf", "application/pdf", b"%PDF-1.4"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "File type application/pdf not allowed");

    // Nothing was stored by the rejected submissions
    let (_, list) = send(&app, Request::builder().uri("/api/issues").body(Body::empty()).unwrap()).await;
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn test_submission_requires_login() {
    let app = setup_app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/issues")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(&[text("title", "Pothole on road")])))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Media
// =============================================================================

#[tokio::test]
async fn test_media_upload_download_and_delete() {
    let app = setup_app().await;
    let token = login(&app, SAMPLE_CITIZEN_MOBILE, "citizen123").await;
    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-bytes";

    let (status, issue) = submit_issue(
        &app,
        &token,
        &[
            text("title", "Garbage dump"),
            text("description", "Garbage and waste piling up by the bus stop"),
            text("latitude", "12.9716"),
            text("longitude", "77.5946"),
            text("address", "MG Road"),
            file("files", "dump.png", "image/png", png),
            // Empty file input is skipped
            file("files", "", "application/octet-stream", b""),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", issue);
    assert_eq!(issue["latitude"], 12.9716);
    assert_eq!(issue["address"], "MG Road");

    let media = issue["media"].as_array().unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0]["file_type"], "image");
    assert_eq!(media[0]["file_size"], png.len());
    assert_eq!(media[0]["original_filename"], "dump.png");

    let issue_id = issue["id"].as_i64().unwrap();
    let media_id = media[0]["id"].as_i64().unwrap();
    let stored = media[0]["file_path"].as_str().unwrap();
    let stored_name = stored.rsplit('/').next().unwrap();
    assert!(stored_name.starts_with(&format!("{}_", issue_id)));
    assert!(stored_name.ends_with(".png"));
    assert!(app.uploads.path().join(stored_name).exists());

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/issues/{}/media/{}", issue_id, media_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("dump.png"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], png);

    // Also reachable through the static mount
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/uploads/{}", stored_name))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = send(
        &app,
        Request::builder()
            .uri(format!("/api/issues/{}/media/{}", issue_id + 1, media_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Media not found");

    // Citizens cannot delete
    let (status, _) = send(
        &app,
        authed("DELETE", &format!("/api/issues/{}", issue_id), &token)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = login(&app, SAMPLE_ADMIN_MOBILE, "admin123").await;
    let (status, body) = send(
        &app,
        authed("DELETE", &format!("/api/issues/{}", issue_id), &admin)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Issue deleted successfully");
    assert!(!app.uploads.path().join(stored_name).exists());

    let (status, body) = send(
        &app,
        Request::builder()
            .uri(format!("/api/issues/{}", issue_id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Issue not found");
}

#[tokio::test]
async fn test_failed_media_write_leaves_no_issue() {
    // Upload path is a regular file, so creating the directory fails
    let uploads = TempDir::new().expect("Should create temp dir");
    let blocked = uploads.path().join("uploads");
    std::fs::write(&blocked, b"occupied").unwrap();
    let app = setup_app_with_uploads(uploads, blocked.clone()).await;
    let token = login(&app, SAMPLE_CITIZEN_MOBILE, "citizen123").await;

    let (status, _) = submit_issue(
        &app,
        &token,
        &[
            text("title", "Water pipe leak"),
            text("description", "Water pouring from a broken pipe"),
            file("files", "leak.jpg", "image/jpeg", b"\xFF\xD8\xFFjpeg"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, body) = send(&app, Request::builder().uri("/api/issues").body(Body::empty()).unwrap()).await;
    assert_eq!(body["total"], 0);
    let (_, mine) = send(&app, authed("GET", "/api/issues/my", &token).body(Body::empty()).unwrap()).await;
    assert!(mine.as_array().unwrap().is_empty());
    assert_eq!(std::fs::read(&blocked).unwrap(), b"occupied");

    // Text-only submissions never touch the upload path
    let issue = submit_text_issue(&app, &token, "Water pipe leak", "Water pouring from a broken pipe").await;
    assert_eq!(issue["id"], 1);
}

#[tokio::test]
async fn test_missing_media_file_reports_file_not_found() {
    let app = setup_app().await;
    let token = login(&app, SAMPLE_CITIZEN_MOBILE, "citizen123").await;

    let (status, issue) = submit_issue(
        &app,
        &token,
        &[
            text("title", "Noise complaint"),
            text("description", "Loud construction noise every night"),
            file("files", "noise.wav", "audio/wav", b"RIFF----WAVE"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(issue["media"][0]["file_type"], "audio");

    let stored = issue["media"][0]["file_path"].as_str().unwrap();
    std::fs::remove_file(app.uploads.path().join(stored.rsplit('/').next().unwrap())).unwrap();

    let (status, body) = send(
        &app,
        Request::builder()
            .uri(format!("/api/issues/{}/media/{}", issue["id"], issue["media"][0]["id"]))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "File not found");
}

// =============================================================================
// Listing, updates and votes
// =============================================================================

#[tokio::test]
async fn test_list_filters_and_paging() {
    let app = setup_app().await;
    let token = login(&app, SAMPLE_CITIZEN_MOBILE, "citizen123").await;

    submit_text_issue(&app, &token, "Pothole on road", "Big pothole causing traffic jams").await;
    submit_text_issue(&app, &token, "Streetlight out", "The streetlight on the pole is broken").await;
    submit_text_issue(&app, &token, "Another pothole", "Second pothole on the same road").await;

    let (_, body) = send(&app, Request::builder().uri("/api/issues?skip=2&limit=2").body(Body::empty()).unwrap()).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 2);
    assert_eq!(body["per_page"], 2);
    assert_eq!(body["issues"].as_array().unwrap().len(), 1);

    // Roads & Transportation is department 3
    let (_, body) = send(&app, Request::builder().uri("/api/issues?department_id=3").body(Body::empty()).unwrap()).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 20);

    // Filters and paging read from the same query string
    let (_, body) = send(
        &app,
        Request::builder().uri("/api/issues?department_id=3&skip=1&limit=1").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["page"], 2);
    assert_eq!(body["issues"].as_array().unwrap().len(), 1);
    assert_eq!(body["issues"][0]["department_id"], 3);

    let (_, body) = send(&app, Request::builder().uri("/api/issues?status=resolved").body(Body::empty()).unwrap()).await;
    assert_eq!(body["total"], 0);

    let (status, mine) = send(&app, authed("GET", "/api/issues/my", &token).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_update_permissions_and_resolution() {
    let app = setup_app().await;
    let citizen = login(&app, SAMPLE_CITIZEN_MOBILE, "citizen123").await;
    let issue = submit_text_issue(&app, &citizen, "Overflowing dustbin", "Dustbin overflowing with garbage").await;
    let uri = format!("/api/issues/{}", issue["id"]);

    // A second citizen may not edit someone else's issue
    let register = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"mobile_number": "+919800000042", "name": "Other", "password": "other123"}).to_string(),
        ))
        .unwrap();
    assert_eq!(send(&app, register).await.0, StatusCode::OK);
    let other = login(&app, "+919800000042", "other123").await;

    let update = |token: &str, body: Value| {
        authed("PUT", &uri, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let (status, _) = send(&app, update(&other, json!({"title": "Hijacked title"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, update(&citizen, json!({"priority": "high"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["priority"], "high");
    assert_eq!(body["title"], "Overflowing dustbin");
    assert!(body["resolved_at"].is_null());

    let admin = login(&app, SAMPLE_ADMIN_MOBILE, "admin123").await;
    let (status, body) = send(&app, update(&admin, json!({"status": "resolved"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "resolved");
    let resolved_at = body["resolved_at"].clone();
    assert!(resolved_at.is_string());

    // Resolving again keeps the first timestamp
    let (_, body) = send(&app, update(&admin, json!({"status": "resolved"}))).await;
    assert_eq!(body["resolved_at"], resolved_at);

    let (status, body) = send(&app, update(&admin, json!({"worker_id": 999}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Worker not found");
}

#[tokio::test]
async fn test_voting() {
    let app = setup_app().await;
    let token = login(&app, SAMPLE_CITIZEN_MOBILE, "citizen123").await;
    let issue = submit_text_issue(&app, &token, "Broken footpath", "Footpath tiles broken near the market").await;
    let uri = format!("/api/issues/{}/vote", issue["id"]);

    let vote = |vote_type: &str| {
        authed("POST", &uri, &token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "vote_type": vote_type }).to_string()))
            .unwrap()
    };

    let (status, body) = send(&app, vote("up")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Vote recorded");
    assert_eq!(body["upvotes"], 1);

    let (_, body) = send(&app, vote("down")).await;
    assert_eq!(body["upvotes"], 1);
    assert_eq!(body["downvotes"], 1);

    let (status, _) = send(&app, vote("sideways")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Suggestions
// =============================================================================

#[tokio::test]
async fn test_suggestions_ranked_and_limited() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/api/issues/suggestions?text=water%20leak%20and%20power%20outage%20near%20the%20pole")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let suggestions = body.as_array().unwrap();
    assert_eq!(suggestions.len(), 2);
    // Electricity: power, outage, pole = 3/8; Water: water, leak = 2/9
    assert_eq!(suggestions[0]["department_name"], "Electricity Department");
    assert_eq!(suggestions[1]["department_name"], "Water Department");
    assert_eq!(
        suggestions[0]["matched_keywords"],
        json!(["power", "outage", "pole"])
    );

    let (_, body) = send(
        &app,
        Request::builder()
            .uri("/api/issues/suggestions?text=water%20power&limit=1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

// =============================================================================
// Administration
// =============================================================================

#[tokio::test]
async fn test_assignment_and_dashboard() {
    let app = setup_app().await;
    let citizen = login(&app, SAMPLE_CITIZEN_MOBILE, "citizen123").await;
    let admin = login(&app, SAMPLE_ADMIN_MOBILE, "admin123").await;

    let issue = submit_text_issue(&app, &citizen, "Stray cattle", "Cattle blocking the lane every morning").await;
    assert_eq!(issue["needs_manual_review"], true);

    // Citizens cannot reach admin routes
    let (status, _) = send(&app, authed("GET", "/api/admin/dashboard", &citizen).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, workers) = send(
        &app,
        authed("GET", "/api/admin/workers?department_id=5", &admin)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(workers.as_array().unwrap().len(), 1);
    let worker_id = workers[0]["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        authed(
            "POST",
            &format!("/api/admin/issues/{}/assign/{}", issue["id"], worker_id),
            &admin,
        )
        .body(Body::empty())
        .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Issue assigned successfully");
    assert_eq!(body["issue"]["status"], "assigned");
    assert_eq!(body["issue"]["worker_id"], worker_id);
    assert_eq!(body["issue"]["department_id"], 5);
    assert_eq!(body["issue"]["needs_manual_review"], false);

    let (status, body) = send(
        &app,
        authed("POST", &format!("/api/admin/issues/{}/assign/999", issue["id"]), &admin)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Worker not found");

    let (status, dashboard) = send(&app, authed("GET", "/api/admin/dashboard", &admin).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["issue_stats"]["total"], 1);
    assert_eq!(dashboard["issue_stats"]["pending"], 0);
    assert_eq!(dashboard["department_stats"].as_array().unwrap().len(), 5);
    assert_eq!(dashboard["recent_issues"][0]["id"], issue["id"]);
    assert_eq!(dashboard["user_stats"]["total_citizens"], 1);
    assert_eq!(dashboard["user_stats"]["total_workers"], 5);

    let (status, departments) = send(&app, authed("GET", "/api/admin/departments", &admin).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(departments.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_trends() {
    let app = setup_app().await;
    let citizen = login(&app, SAMPLE_CITIZEN_MOBILE, "citizen123").await;
    let admin = login(&app, SAMPLE_ADMIN_MOBILE, "admin123").await;

    let (_, trends) = send(&app, authed("GET", "/api/admin/analytics/trends", &admin).body(Body::empty()).unwrap()).await;
    assert_eq!(trends["average_resolution_days"], 0.0);
    assert!(trends["status_distribution"].as_array().unwrap().is_empty());

    let issue = submit_text_issue(&app, &citizen, "Fire hazard", "Exposed wire sparks near the market").await;
    let request = authed("PUT", &format!("/api/issues/{}", issue["id"]), &admin)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"status": "resolved"}).to_string()))
        .unwrap();
    assert_eq!(send(&app, request).await.0, StatusCode::OK);

    let (status, trends) = send(&app, authed("GET", "/api/admin/analytics/trends", &admin).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trends["status_distribution"], json!([{"status": "resolved", "count": 1}]));
    assert!(trends["average_resolution_days"].as_f64().unwrap() >= 0.0);
    assert_eq!(trends["department_distribution"].as_array().unwrap().len(), 5);
}
