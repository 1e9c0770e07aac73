//! User persistence: insert and lookups.

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::store::StoreError;
use crate::types::user::{Role, User};

/// Row returned from DB (username is stored lowercase).
#[derive(FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

fn user_row_to_user(row: UserRow) -> Result<User, StoreError> {
    let role = row
        .role
        .parse::<Role>()
        .map_err(|e| StoreError::Corrupt(format!("user {}: {}", row.id, e)))?;
    Ok(User {
        id: row.id,
        username: row.username,
        email: row.email,
        password_hash: row.password_hash,
        role,
    })
}

pub async fn get_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, StoreError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, password_hash, role FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(user_row_to_user).transpose()
}

/// Get a user by username (lowercase).
pub async fn get_user_by_username(
    pool: &PgPool,
    username_lowercase: &str,
) -> Result<Option<User>, StoreError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, password_hash, role FROM users WHERE username = $1",
    )
    .bind(username_lowercase)
    .fetch_optional(pool)
    .await?;
    row.map(user_row_to_user).transpose()
}

/// Insert a user. Username must already be lowercase.
pub async fn insert_user(pool: &PgPool, user: &User) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, role) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            StoreError::Duplicate(format!("username {}", user.username))
        }
        other => StoreError::Database(other),
    })?;
    Ok(())
}
