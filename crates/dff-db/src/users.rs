//! Database operations for `users` (inventory page logins).

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    /// bcrypt hash; never the plain password.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Inserts a user and returns its id.
///
/// # Errors
///
/// Returns [`DbError::Conflict`] if the username is taken, or
/// [`DbError::Sqlx`] for any other failure.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
) -> Result<i64, DbError> {
    let result = sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING id",
    )
    .bind(username)
    .bind(password_hash)
    .fetch_one(pool)
    .await;

    match result {
        Ok(id) => Ok(id),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(DbError::Conflict(
            format!("username {username:?} is already registered"),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Looks up a user by exact username.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserRow>, DbError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
