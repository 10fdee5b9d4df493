//! Administrator endpoints: triage, assignment and statistics

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use civic_common::db::departments::{get_department, list_departments};
use civic_common::db::users::{count_citizens, get_user};
use civic_common::db::workers::{count_workers, get_worker, list_workers};
use civic_common::db::{Department, Issue, IssueStatus, Worker};
use civic_common::notifications::{IssueEvent, IssueSummary};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::auth::AdminUser;
use crate::db::issues::{
    assign_worker, count_by_department, count_by_status, get_issue, list_pending_review, recent_issues,
    resolution_times,
};
use crate::{ApiError, ApiResult, AppState};

/// Number of issues shown in the dashboard's recent list
pub const RECENT_ISSUE_COUNT: i64 = 5;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Serialize)]
pub struct IssueStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub resolved: i64,
}

#[derive(Debug, Serialize)]
pub struct DepartmentCount {
    pub department: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: IssueStatus,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct RecentIssue {
    pub id: i64,
    pub title: String,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub total_citizens: i64,
    pub total_workers: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub issue_stats: IssueStats,
    pub department_stats: Vec<DepartmentCount>,
    pub recent_issues: Vec<RecentIssue>,
    pub user_stats: UserStats,
}

#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub message: String,
    pub issue: Issue,
}

#[derive(Debug, Deserialize)]
pub struct WorkerQuery {
    pub department_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    pub status_distribution: Vec<StatusCount>,
    pub department_distribution: Vec<DepartmentCount>,
    pub average_resolution_days: f64,
}

fn department_counts(rows: Vec<(String, i64)>) -> Vec<DepartmentCount> {
    rows.into_iter()
        .map(|(department, count)| DepartmentCount { department, count })
        .collect()
}

/// Mean of `resolved_at - created_at` in fractional days; 0 when empty
pub fn average_resolution_days(times: &[(DateTime<Utc>, DateTime<Utc>)]) -> f64 {
    if times.is_empty() {
        return 0.0;
    }
    let total_seconds: i64 = times
        .iter()
        .map(|(created, resolved)| (*resolved - *created).num_seconds())
        .sum();
    total_seconds as f64 / SECONDS_PER_DAY / times.len() as f64
}

/// GET /api/admin/dashboard
pub async fn dashboard(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<DashboardResponse>> {
    let by_status = count_by_status(&state.db).await?;
    let count_of = |status: IssueStatus| {
        by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };

    let issue_stats = IssueStats {
        total: by_status.iter().map(|(_, n)| n).sum(),
        pending: count_of(IssueStatus::Pending),
        in_progress: count_of(IssueStatus::InProgress),
        resolved: count_of(IssueStatus::Resolved),
    };

    let recent = recent_issues(&state.db, RECENT_ISSUE_COUNT)
        .await?
        .into_iter()
        .map(|issue| RecentIssue {
            id: issue.id,
            title: issue.title,
            status: issue.status,
            created_at: issue.created_at,
            user_id: issue.user_id,
        })
        .collect();

    Ok(Json(DashboardResponse {
        issue_stats,
        department_stats: department_counts(count_by_department(&state.db).await?),
        recent_issues: recent,
        user_stats: UserStats {
            total_citizens: count_citizens(&state.db).await?,
            total_workers: count_workers(&state.db).await?,
        },
    }))
}

/// GET /api/admin/issues/pending
pub async fn pending_issues(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<Issue>>> {
    Ok(Json(list_pending_review(&state.db).await?))
}

/// POST /api/admin/issues/:issue_id/assign/:worker_id
pub async fn assign_issue(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path((issue_id, worker_id)): Path<(i64, i64)>,
) -> ApiResult<Json<AssignmentResponse>> {
    if get_issue(&state.db, issue_id).await?.is_none() {
        return Err(ApiError::NotFound("Issue not found".to_string()));
    }
    let worker = get_worker(&state.db, worker_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Worker not found".to_string()))?;

    assign_worker(&state.db, issue_id, &worker).await?;
    let issue = get_issue(&state.db, issue_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Issue not found".to_string()))?;
    info!(
        "Issue {} assigned to worker {} by admin {}",
        issue_id, worker.id, admin.id
    );

    if let Some(citizen) = get_user(&state.db, issue.user_id).await? {
        let department_name = get_department(&state.db, worker.department_id)
            .await?
            .map(|d| d.name)
            .unwrap_or_default();

        state.notifier.dispatch(&IssueEvent::Assigned {
            issue: IssueSummary {
                id: issue.id,
                title: issue.title.clone(),
                status: issue.status,
                needs_manual_review: issue.needs_manual_review,
            },
            citizen_phone: citizen.mobile_number,
            citizen_address: issue.address.clone().or(citizen.address),
            department_name,
            worker_name: worker.name.clone(),
            worker_phone: worker.mobile_number.clone(),
        });
    }

    Ok(Json(AssignmentResponse {
        message: "Issue assigned successfully".to_string(),
        issue,
    }))
}

/// GET /api/admin/departments
pub async fn departments(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<Department>>> {
    Ok(Json(list_departments(&state.db).await?))
}

/// GET /api/admin/workers?department_id=
pub async fn workers(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<WorkerQuery>,
) -> ApiResult<Json<Vec<Worker>>> {
    Ok(Json(list_workers(&state.db, query.department_id).await?))
}

/// GET /api/admin/analytics/trends
pub async fn trends(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<TrendsResponse>> {
    let status_distribution = count_by_status(&state.db)
        .await?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();

    let times = resolution_times(&state.db).await?;

    Ok(Json(TrendsResponse {
        status_distribution,
        department_distribution: department_counts(count_by_department(&state.db).await?),
        average_resolution_days: average_resolution_days(&times),
    }))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/issues/pending", get(pending_issues))
        .route("/issues/:issue_id/assign/:worker_id", post(assign_issue))
        .route("/departments", get(departments))
        .route("/workers", get(workers))
        .route("/analytics/trends", get(trends))
}
