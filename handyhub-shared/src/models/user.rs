/// User model and database operations
///
/// Users are keyed by the opaque id issued by the external identity provider.
/// The local row is created or patched on every identity sync and never re-inserted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id              TEXT PRIMARY KEY NOT NULL,
///     email           TEXT NOT NULL COLLATE NOCASE,
///     name            TEXT NOT NULL,
///     role            TEXT NOT NULL DEFAULT 'homeowner',
///     avatar_url      TEXT,
///     phone_number    TEXT,
///     phone_verified  BOOLEAN NOT NULL DEFAULT FALSE,
///     is_active       BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at      TEXT NOT NULL,
///     updated_at      TEXT NOT NULL,
///     CONSTRAINT users_email_key UNIQUE (email),
///     CONSTRAINT users_role_valid CHECK (role IN ('homeowner', 'worker', 'admin'))
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use handyhub_shared::models::user::{SyncUser, User, UserRole};
/// use handyhub_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::upsert(&pool, &SyncUser {
///     id: "user_2a9".to_string(),
///     email: "dana@example.com".to_string(),
///     name: "Dana".to_string(),
///     role: UserRole::Homeowner,
///     phone_number: None,
///     avatar_url: None,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "DANA@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteExecutor;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::utc_now;

/// Marketplace role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Books work (default for new users)
    #[default]
    Homeowner,

    /// Offers services and owns a worker profile
    Worker,

    /// Curates the service catalog
    Admin,
}

impl UserRole {
    /// Converts role to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Homeowner => "homeowner",
            UserRole::Worker => "worker",
            UserRole::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "homeowner" => Ok(UserRole::Homeowner),
            "worker" => Ok(UserRole::Worker),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Local user record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Identity-provider user id
    pub id: String,

    /// Email address, unique case-insensitively
    pub email: String,

    /// Display name
    pub name: String,

    pub role: UserRole,

    pub avatar_url: Option<String>,

    pub phone_number: Option<String>,

    pub phone_verified: bool,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Identity payload reconciled into the users table
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncUser {
    /// Identity-provider user id
    #[validate(length(min = 1, max = 255, message = "id must not be empty"))]
    pub id: String,

    #[validate(email(message = "email must be a valid address"))]
    pub email: String,

    #[validate(length(min = 1, max = 255, message = "name must not be empty"))]
    pub name: String,

    #[serde(default)]
    pub role: UserRole,

    /// Kept unchanged on an existing user when None
    pub phone_number: Option<String>,

    /// Kept unchanged on an existing user when None
    pub avatar_url: Option<String>,
}

impl User {
    /// Inserts the user, or patches the existing row with the same id
    ///
    /// A homeowner may be promoted to worker or admin by a later sync; other roles are
    /// never changed (there is no demotion). Optional contact fields left as None keep
    /// their stored values.
    ///
    /// # Errors
    ///
    /// A unique violation on `users.email` if another user already owns the email.
    pub async fn upsert<'e, E>(executor: E, data: &SyncUser) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = utc_now();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, role, avatar_url, phone_number, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (id) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                role = CASE WHEN users.role = 'homeowner' THEN excluded.role ELSE users.role END,
                avatar_url = COALESCE(excluded.avatar_url, users.avatar_url),
                phone_number = COALESCE(excluded.phone_number, users.phone_number),
                updated_at = excluded.updated_at
            RETURNING id, email, name, role, avatar_url, phone_number, phone_verified,
                      is_active, created_at, updated_at
            "#,
        )
        .bind(&data.id)
        .bind(&data.email)
        .bind(&data.name)
        .bind(data.role)
        .bind(&data.avatar_url)
        .bind(&data.phone_number)
        .bind(now)
        .fetch_all(executor)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(user)
    }

    /// Finds a user by id
    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, role, avatar_url, phone_number, phone_verified,
                   is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, role, avatar_url, phone_number, phone_verified,
                   is_active, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Looks up only the role, used to build a caller context
    pub async fn find_role<'e, E>(executor: E, id: &str) -> Result<Option<UserRole>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let role: Option<UserRole> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(role)
    }

    /// Deletes a user; profile, offerings, bookings, chats and messages cascade
    ///
    /// Returns true if a row was deleted.
    pub async fn delete<'e, E>(executor: E, id: &str) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts total number of users
    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(executor)
            .await?;

        Ok(count)
    }
}
