//! Department database operations
//!
//! Departments are the routing targets of the issue classifier.

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::classifier::DepartmentRecord;
use crate::db::models::Department;
use crate::Result;

/// Fields for a new department
#[derive(Debug, Clone, Default)]
pub struct NewDepartment {
    pub name: String,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

fn department_from_row(row: &SqliteRow) -> Result<Department> {
    Ok(Department {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        keywords: row.try_get("keywords")?,
        contact_email: row.try_get("contact_email")?,
        contact_phone: row.try_get("contact_phone")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a department and return its id
pub async fn insert_department(pool: &SqlitePool, department: &NewDepartment) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO departments (name, description, keywords, contact_email, contact_phone, is_active, created_at)
        VALUES (?, ?, ?, ?, ?, 1, ?)
        "#,
    )
    .bind(&department.name)
    .bind(&department.description)
    .bind(&department.keywords)
    .bind(&department.contact_email)
    .bind(&department.contact_phone)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// All departments, ordered by id
pub async fn list_departments(pool: &SqlitePool) -> Result<Vec<Department>> {
    let rows = sqlx::query("SELECT * FROM departments ORDER BY id")
        .fetch_all(pool)
        .await?;

    rows.iter().map(department_from_row).collect()
}

/// Load department by id
pub async fn get_department(pool: &SqlitePool, id: i64) -> Result<Option<Department>> {
    let row = sqlx::query("SELECT * FROM departments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(department_from_row).transpose()
}

/// Snapshot of active departments for classifier construction
pub async fn list_active_department_records(pool: &SqlitePool) -> Result<Vec<DepartmentRecord>> {
    let rows = sqlx::query(
        "SELECT id, name, keywords, is_active FROM departments WHERE is_active = 1 ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(DepartmentRecord {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                keywords: row.try_get("keywords")?,
                is_active: row.try_get("is_active")?,
            })
        })
        .collect()
}

/// Activate or deactivate a department
pub async fn set_department_active(pool: &SqlitePool, id: i64, active: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE departments SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(active)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
