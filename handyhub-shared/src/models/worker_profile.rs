/// Worker profile model
///
/// A profile shares its primary key with the owning user, so a user can never have
/// more than one. Profiles are provisioned with zeroed stats on the first worker sync.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE worker_profiles (
///     id                TEXT PRIMARY KEY NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     bio               TEXT NOT NULL DEFAULT '',
///     experience_years  INTEGER NOT NULL DEFAULT 0,
///     service_radius    INTEGER NOT NULL DEFAULT 0,
///     location          TEXT NOT NULL DEFAULT '',
///     hourly_rate       INTEGER NOT NULL DEFAULT 0,
///     created_at        TEXT NOT NULL,
///     updated_at        TEXT NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteExecutor;
use validator::Validate;

use super::utc_now;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkerProfile {
    /// Same value as the owning user's id
    pub id: String,

    pub bio: String,

    pub experience_years: i64,

    /// Radius served, in kilometres
    pub service_radius: i64,

    pub location: String,

    /// Hourly rate in minor currency units
    pub hourly_rate: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Partial profile update; None leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateWorkerProfile {
    #[validate(length(max = 2000))]
    pub bio: Option<String>,

    #[validate(range(min = 0, max = 80))]
    pub experience_years: Option<i64>,

    #[validate(range(min = 0))]
    pub service_radius: Option<i64>,

    #[validate(length(max = 255))]
    pub location: Option<String>,

    #[validate(range(min = 0))]
    pub hourly_rate: Option<i64>,
}

impl WorkerProfile {
    /// Inserts an empty profile unless one already exists
    ///
    /// Returns true if this call created the profile.
    pub async fn create_default<'e, E>(executor: E, user_id: &str) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = utc_now();

        let result = sqlx::query(
            r#"
            INSERT INTO worker_profiles (id, created_at, updated_at)
            VALUES ($1, $2, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let profile = sqlx::query_as::<_, WorkerProfile>(
            r#"
            SELECT id, bio, experience_years, service_radius, location, hourly_rate,
                   created_at, updated_at
            FROM worker_profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(profile)
    }

    pub async fn exists<'e, E>(executor: E, id: &str) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM worker_profiles WHERE id = $1)")
                .bind(id)
                .fetch_one(executor)
                .await?;

        Ok(exists)
    }

    /// Applies a partial update, returning None if the profile does not exist
    pub async fn update<'e, E>(
        executor: E,
        id: &str,
        data: &UpdateWorkerProfile,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let profile = sqlx::query_as::<_, WorkerProfile>(
            r#"
            UPDATE worker_profiles
            SET bio = COALESCE($2, bio),
                experience_years = COALESCE($3, experience_years),
                service_radius = COALESCE($4, service_radius),
                location = COALESCE($5, location),
                hourly_rate = COALESCE($6, hourly_rate),
                updated_at = $7
            WHERE id = $1
            RETURNING id, bio, experience_years, service_radius, location, hourly_rate,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&data.bio)
        .bind(data.experience_years)
        .bind(data.service_radius)
        .bind(&data.location)
        .bind(data.hourly_rate)
        .bind(utc_now())
        .fetch_all(executor)
        .await?
        .into_iter()
        .next();

        Ok(profile)
    }

    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM worker_profiles")
            .fetch_one(executor)
            .await?;

        Ok(count)
    }
}
