//! User database operations

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::db::models::User;
use crate::Result;

/// Fields for a new user; `password_hash` is an Argon2 PHC string
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub mobile_number: String,
    pub name: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_admin: bool,
    pub password_hash: String,
}

/// Profile fields a user may change; `None` leaves the stored value untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl ProfileChanges {
    /// Merge the changes over an existing user
    pub fn apply_to(&self, user: &User) -> User {
        User {
            name: self.name.clone().unwrap_or_else(|| user.name.clone()),
            email: self.email.clone().or_else(|| user.email.clone()),
            address: self.address.clone().or_else(|| user.address.clone()),
            ..user.clone()
        }
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        mobile_number: row.try_get("mobile_number")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        is_active: row.try_get("is_active")?,
        is_admin: row.try_get("is_admin")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Insert a user and return the stored record
pub async fn insert_user(pool: &SqlitePool, user: &NewUser) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (mobile_number, name, email, address, is_active, is_admin,
                           password_hash, created_at)
        VALUES (?, ?, ?, ?, 1, ?, ?, ?)
        "#,
    )
    .bind(&user.mobile_number)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.address)
    .bind(user.is_admin)
    .bind(&user.password_hash)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    get_user(pool, id)
        .await?
        .ok_or_else(|| crate::Error::Internal(format!("User {} vanished after insert", id)))
}

/// Load user by id
pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Load user by mobile number (the login identifier)
pub async fn get_user_by_mobile(pool: &SqlitePool, mobile_number: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE mobile_number = ?")
        .bind(mobile_number)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Load user by email
pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Page of users ordered by id
pub async fn list_users(pool: &SqlitePool, skip: i64, limit: i64) -> Result<Vec<User>> {
    let rows = sqlx::query("SELECT * FROM users ORDER BY id LIMIT ? OFFSET ?")
        .bind(limit)
        .bind(skip)
        .fetch_all(pool)
        .await?;

    rows.iter().map(user_from_row).collect()
}

/// Persist merged profile fields and return the updated user
pub async fn update_profile(pool: &SqlitePool, user: &User, changes: &ProfileChanges) -> Result<User> {
    let merged = changes.apply_to(user);

    sqlx::query("UPDATE users SET name = ?, email = ?, address = ?, updated_at = ? WHERE id = ?")
        .bind(&merged.name)
        .bind(&merged.email)
        .bind(&merged.address)
        .bind(Utc::now())
        .bind(merged.id)
        .execute(pool)
        .await?;

    Ok(merged)
}

/// Number of non-admin users
pub async fn count_citizens(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_admin = 0")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;

    fn citizen() -> NewUser {
        NewUser {
            mobile_number: "+919888888888".to_string(),
            name: "Test Citizen".to_string(),
            email: Some("citizen@example.com".to_string()),
            password_hash: "$argon2id$placeholder".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let pool = init_memory_database().await.unwrap();
        let user = insert_user(&pool, &citizen()).await.unwrap();

        assert!(user.is_active);
        assert!(!user.is_admin);

        let by_mobile = get_user_by_mobile(&pool, "+919888888888").await.unwrap().unwrap();
        assert_eq!(by_mobile.id, user.id);

        let by_email = get_user_by_email(&pool, "citizen@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(get_user_by_mobile(&pool, "+910000000000").await.unwrap().is_none());
        assert_eq!(count_citizens(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_mobile_rejected() {
        let pool = init_memory_database().await.unwrap();
        insert_user(&pool, &citizen()).await.unwrap();

        let mut duplicate = citizen();
        duplicate.email = None;
        assert!(insert_user(&pool, &duplicate).await.is_err());
    }

    #[tokio::test]
    async fn test_update_profile_merges_fields() {
        let pool = init_memory_database().await.unwrap();
        let user = insert_user(&pool, &citizen()).await.unwrap();

        let changes = ProfileChanges {
            address: Some("12 Market Road".to_string()),
            ..Default::default()
        };
        let updated = update_profile(&pool, &user, &changes).await.unwrap();

        assert_eq!(updated.name, "Test Citizen");
        assert_eq!(updated.email.as_deref(), Some("citizen@example.com"));
        assert_eq!(updated.address.as_deref(), Some("12 Market Road"));

        let stored = get_user(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(stored.address.as_deref(), Some("12 Market Road"));
    }
}
