//! Issue persistence
//!
//! Issues are read together with their media. Status and priority are stored
//! as their wire strings and parsed on the way out.

use chrono::{DateTime, Utc};
use civic_common::db::{Issue, IssuePriority, IssueStatus, Worker};
use civic_common::Result;
use sqlx::{sqlite::SqliteRow, Executor, QueryBuilder, Row, Sqlite, SqlitePool};

use super::media::list_media;

/// Fields for a newly submitted issue
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub category: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub user_id: i64,
    pub department_id: Option<i64>,
    pub ai_confidence: f64,
    pub needs_manual_review: bool,
}

/// Optional list filters; `None` matches everything
#[derive(Debug, Clone, Copy, Default)]
pub struct IssueFilter {
    pub status: Option<IssueStatus>,
    pub department_id: Option<i64>,
    pub user_id: Option<i64>,
}

/// Editable issue fields; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default)]
pub struct IssueChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    pub worker_id: Option<i64>,
    pub department_id: Option<i64>,
}

impl IssueChanges {
    /// Merge the changes over an existing issue
    ///
    /// `resolved_at` is stamped with `now` the first time the issue moves to
    /// resolved and is never overwritten afterwards.
    pub fn apply_to(&self, issue: &Issue, now: DateTime<Utc>) -> Issue {
        let mut updated = Issue {
            title: self.title.clone().unwrap_or_else(|| issue.title.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| issue.description.clone()),
            status: self.status.unwrap_or(issue.status),
            priority: self.priority.unwrap_or(issue.priority),
            worker_id: self.worker_id.or(issue.worker_id),
            department_id: self.department_id.or(issue.department_id),
            updated_at: Some(now),
            ..issue.clone()
        };

        if self.status == Some(IssueStatus::Resolved) && updated.resolved_at.is_none() {
            updated.resolved_at = Some(now);
        }
        updated
    }
}

/// Up or down vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Up,
    Down,
}

fn issue_from_row(row: &SqliteRow) -> Result<Issue> {
    let status: String = row.try_get("status")?;
    let priority: String = row.try_get("priority")?;

    Ok(Issue {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        status: status.parse()?,
        priority: priority.parse()?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        address: row.try_get("address")?,
        user_id: row.try_get("user_id")?,
        department_id: row.try_get("department_id")?,
        worker_id: row.try_get("worker_id")?,
        ai_confidence: row.try_get("ai_confidence")?,
        needs_manual_review: row.try_get("needs_manual_review")?,
        upvotes: row.try_get("upvotes")?,
        downvotes: row.try_get("downvotes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        resolved_at: row.try_get("resolved_at")?,
        media: Vec::new(),
    })
}

/// Map rows to issues and load each issue's media
async fn issues_with_media(pool: &SqlitePool, rows: &[SqliteRow]) -> Result<Vec<Issue>> {
    let mut issues = Vec::with_capacity(rows.len());
    for row in rows {
        let mut issue = issue_from_row(row)?;
        issue.media = list_media(pool, issue.id).await?;
        issues.push(issue);
    }
    Ok(issues)
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &IssueFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(department_id) = filter.department_id {
        builder.push(" AND department_id = ").push_bind(department_id);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
}

/// Insert a new pending issue and return its id
/// Accepts a pool or an open transaction
pub async fn insert_issue<'e, E>(executor: E, issue: &NewIssue) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO issues (title, description, category, latitude, longitude, address,
                            user_id, department_id, ai_confidence, needs_manual_review, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&issue.title)
    .bind(&issue.description)
    .bind(&issue.category)
    .bind(issue.latitude)
    .bind(issue.longitude)
    .bind(&issue.address)
    .bind(issue.user_id)
    .bind(issue.department_id)
    .bind(issue.ai_confidence)
    .bind(issue.needs_manual_review)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn get_issue(pool: &SqlitePool, id: i64) -> Result<Option<Issue>> {
    let row = sqlx::query("SELECT * FROM issues WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let mut issue = issue_from_row(&row)?;
            issue.media = list_media(pool, issue.id).await?;
            Ok(Some(issue))
        }
        None => Ok(None),
    }
}

/// One page of issues matching `filter`, in id order
pub async fn list_issues(
    pool: &SqlitePool,
    filter: &IssueFilter,
    offset: i64,
    limit: i64,
) -> Result<Vec<Issue>> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM issues");
    push_filter(&mut builder, filter);
    builder
        .push(" ORDER BY id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = builder.build().fetch_all(pool).await?;
    issues_with_media(pool, &rows).await
}

/// Number of issues matching `filter`, ignoring paging
pub async fn count_issues(pool: &SqlitePool, filter: &IssueFilter) -> Result<i64> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM issues");
    push_filter(&mut builder, filter);

    let count: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(count)
}

/// Every issue reported by one user
pub async fn list_issues_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Issue>> {
    let rows = sqlx::query("SELECT * FROM issues WHERE user_id = ? ORDER BY id")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    issues_with_media(pool, &rows).await
}

/// Issues awaiting manual review, newest first
pub async fn list_pending_review(pool: &SqlitePool) -> Result<Vec<Issue>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM issues
        WHERE needs_manual_review = 1 AND status = 'pending'
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    issues_with_media(pool, &rows).await
}

/// Most recently created issues, without media
pub async fn recent_issues(pool: &SqlitePool, limit: i64) -> Result<Vec<Issue>> {
    let rows = sqlx::query("SELECT * FROM issues ORDER BY created_at DESC, id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(issue_from_row).collect()
}

/// Persist every editable column of `issue`
pub async fn save_issue(pool: &SqlitePool, issue: &Issue) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE issues
        SET title = ?, description = ?, status = ?, priority = ?, worker_id = ?,
            department_id = ?, needs_manual_review = ?, updated_at = ?, resolved_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&issue.title)
    .bind(&issue.description)
    .bind(issue.status.as_str())
    .bind(issue.priority.as_str())
    .bind(issue.worker_id)
    .bind(issue.department_id)
    .bind(issue.needs_manual_review)
    .bind(issue.updated_at)
    .bind(issue.resolved_at)
    .bind(issue.id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Hand an issue to a worker and that worker's department
pub async fn assign_worker(pool: &SqlitePool, issue_id: i64, worker: &Worker) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE issues
        SET worker_id = ?, department_id = ?, status = 'assigned',
            needs_manual_review = 0, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(worker.id)
    .bind(worker.department_id)
    .bind(Utc::now())
    .bind(issue_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Increment a vote counter; returns the new `(upvotes, downvotes)`
pub async fn record_vote(pool: &SqlitePool, issue_id: i64, vote: VoteKind) -> Result<Option<(i64, i64)>> {
    let sql = match vote {
        VoteKind::Up => "UPDATE issues SET upvotes = upvotes + 1 WHERE id = ?",
        VoteKind::Down => "UPDATE issues SET downvotes = downvotes + 1 WHERE id = ?",
    };

    let result = sqlx::query(sql).bind(issue_id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let counts: (i64, i64) = sqlx::query_as("SELECT upvotes, downvotes FROM issues WHERE id = ?")
        .bind(issue_id)
        .fetch_one(pool)
        .await?;
    Ok(Some(counts))
}

/// Delete an issue; its media rows cascade
pub async fn delete_issue(pool: &SqlitePool, issue_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM issues WHERE id = ?")
        .bind(issue_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// `(status, count)` for every status that has at least one issue
pub async fn count_by_status(pool: &SqlitePool) -> Result<Vec<(IssueStatus, i64)>> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM issues GROUP BY status ORDER BY status")
            .fetch_all(pool)
            .await?;

    rows.into_iter()
        .map(|(status, count)| Ok((status.parse::<IssueStatus>()?, count)))
        .collect()
}

/// `(department name, issue count)` for every department, including empty ones
pub async fn count_by_department(pool: &SqlitePool) -> Result<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT d.name, COUNT(i.id)
        FROM departments d
        LEFT JOIN issues i ON i.department_id = d.id
        GROUP BY d.id, d.name
        ORDER BY d.id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// `(created_at, resolved_at)` of every resolved issue with a resolution time
pub async fn resolution_times(pool: &SqlitePool) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>> {
    let rows: Vec<(DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT created_at, resolved_at FROM issues
        WHERE status = 'resolved' AND resolved_at IS NOT NULL
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
