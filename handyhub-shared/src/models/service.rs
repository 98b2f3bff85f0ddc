/// Service catalog model
///
/// The catalog is global. Names are unique, which makes the name the natural key for
/// seeding (`upsert_by_name`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE services (
///     id           BLOB PRIMARY KEY NOT NULL,
///     name         TEXT NOT NULL,
///     description  TEXT,
///     created_at   TEXT NOT NULL,
///     updated_at   TEXT NOT NULL,
///     CONSTRAINT services_name_key UNIQUE (name)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteExecutor;
use uuid::Uuid;

use super::utc_now;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: Uuid,

    /// Unique display name (e.g. "Plumbing")
    pub name: String,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateService {
    pub name: String,
    pub description: Option<String>,
}

/// Partial service update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateService {
    /// New name
    pub name: Option<String>,

    /// New description (use Some(None) to clear)
    pub description: Option<Option<String>>,
}

impl Service {
    /// Creates a service
    ///
    /// # Errors
    ///
    /// A unique violation if the name is taken.
    pub async fn create<'e, E>(executor: E, data: &CreateService) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = utc_now();

        let service = sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.description)
        .bind(now)
        .fetch_all(executor)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(service)
    }

    /// Inserts the service, or refreshes the description of the one with the same name
    pub async fn upsert_by_name<'e, E>(executor: E, data: &CreateService) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = utc_now();

        let service = sqlx::query_as::<_, Service>(
            r#"
            INSERT INTO services (id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (name) DO UPDATE SET
                description = excluded.description,
                updated_at = excluded.updated_at
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.description)
        .bind(now)
        .fetch_all(executor)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(service)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let service = sqlx::query_as::<_, Service>(
            "SELECT id, name, description, created_at, updated_at FROM services WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(service)
    }

    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let services = sqlx::query_as::<_, Service>(
            "SELECT id, name, description, created_at, updated_at FROM services ORDER BY name ASC",
        )
        .fetch_all(executor)
        .await?;

        Ok(services)
    }

    /// Applies a partial update, returning None if the service does not exist
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: &UpdateService,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let (set_description, description) = match &data.description {
            Some(description) => (true, description.clone()),
            None => (false, None),
        };

        let service = sqlx::query_as::<_, Service>(
            r#"
            UPDATE services
            SET name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                updated_at = $5
            WHERE id = $1
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(set_description)
        .bind(description)
        .bind(utc_now())
        .fetch_all(executor)
        .await?
        .into_iter()
        .next();

        Ok(service)
    }

    /// Deletes a service, returning the deleted row
    ///
    /// # Errors
    ///
    /// A foreign key violation while any offering still references the service.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let service = sqlx::query_as::<_, Service>(
            r#"
            DELETE FROM services
            WHERE id = $1
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_all(executor)
        .await?
        .into_iter()
        .next();

        Ok(service)
    }
}
