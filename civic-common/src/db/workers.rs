//! Field worker database operations

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::db::models::Worker;
use crate::Result;

/// Fields for a new worker
#[derive(Debug, Clone, Default)]
pub struct NewWorker {
    pub name: String,
    pub employee_id: String,
    pub mobile_number: String,
    pub email: Option<String>,
    pub department_id: i64,
    pub specialization: Option<String>,
}

fn worker_from_row(row: &SqliteRow) -> Result<Worker> {
    Ok(Worker {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        employee_id: row.try_get("employee_id")?,
        mobile_number: row.try_get("mobile_number")?,
        email: row.try_get("email")?,
        department_id: row.try_get("department_id")?,
        specialization: row.try_get("specialization")?,
        is_available: row.try_get("is_available")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a worker and return its id
pub async fn insert_worker(pool: &SqlitePool, worker: &NewWorker) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO workers (name, employee_id, mobile_number, email, department_id, specialization, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&worker.name)
    .bind(&worker.employee_id)
    .bind(&worker.mobile_number)
    .bind(&worker.email)
    .bind(worker.department_id)
    .bind(&worker.specialization)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Load worker by id
pub async fn get_worker(pool: &SqlitePool, id: i64) -> Result<Option<Worker>> {
    let row = sqlx::query("SELECT * FROM workers WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(worker_from_row).transpose()
}

/// All workers, optionally limited to one department
pub async fn list_workers(pool: &SqlitePool, department_id: Option<i64>) -> Result<Vec<Worker>> {
    let rows = match department_id {
        Some(department_id) => {
            sqlx::query("SELECT * FROM workers WHERE department_id = ? ORDER BY id")
                .bind(department_id)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query("SELECT * FROM workers ORDER BY id")
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(worker_from_row).collect()
}

/// Total number of workers
pub async fn count_workers(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workers")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
