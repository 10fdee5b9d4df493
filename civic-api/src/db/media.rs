//! Issue media records

use chrono::Utc;
use civic_common::db::{IssueMedia, MediaKind};
use civic_common::Result;
use sqlx::{sqlite::SqliteRow, Executor, Row, Sqlite, SqlitePool};

/// Metadata for a file already written to the upload directory
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub issue_id: i64,
    pub file_path: String,
    pub kind: MediaKind,
    pub mime_type: String,
    pub file_size: i64,
    pub original_filename: String,
}

fn media_from_row(row: &SqliteRow) -> Result<IssueMedia> {
    Ok(IssueMedia {
        id: row.try_get("id")?,
        issue_id: row.try_get("issue_id")?,
        file_path: row.try_get("file_path")?,
        file_type: row.try_get("file_type")?,
        mime_type: row.try_get("mime_type")?,
        file_size: row.try_get("file_size")?,
        original_filename: row.try_get("original_filename")?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn insert_media<'e, E>(executor: E, media: &NewMedia) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO issue_media (issue_id, file_path, file_type, mime_type, file_size,
                                 original_filename, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(media.issue_id)
    .bind(&media.file_path)
    .bind(media.kind.as_str())
    .bind(&media.mime_type)
    .bind(media.file_size)
    .bind(&media.original_filename)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Media attached to one issue, oldest first
pub async fn list_media(pool: &SqlitePool, issue_id: i64) -> Result<Vec<IssueMedia>> {
    let rows = sqlx::query("SELECT * FROM issue_media WHERE issue_id = ? ORDER BY id")
        .bind(issue_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(media_from_row).collect()
}

/// Look up a media record, requiring it to belong to `issue_id`
pub async fn get_media(pool: &SqlitePool, issue_id: i64, media_id: i64) -> Result<Option<IssueMedia>> {
    let row = sqlx::query("SELECT * FROM issue_media WHERE id = ? AND issue_id = ?")
        .bind(media_id)
        .bind(issue_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(media_from_row).transpose()
}
