/// Worker service offering model
///
/// An offering is a (worker, service, price range) triple. Each worker has at most one
/// offering per service; prices are integer minor currency units.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE worker_services (
///     id          BLOB PRIMARY KEY NOT NULL,
///     worker_id   TEXT NOT NULL REFERENCES worker_profiles(id) ON DELETE CASCADE,
///     service_id  BLOB NOT NULL REFERENCES services(id) ON DELETE RESTRICT,
///     price_min   INTEGER NOT NULL,
///     price_max   INTEGER NOT NULL,
///     created_at  TEXT NOT NULL,
///     updated_at  TEXT NOT NULL,
///     CONSTRAINT price_positive CHECK (price_min >= 0 AND price_max >= 0),
///     CONSTRAINT price_range_valid CHECK (price_max >= price_min),
///     CONSTRAINT worker_services_worker_service_key UNIQUE (worker_id, service_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteExecutor;
use uuid::Uuid;

use super::utc_now;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Offering {
    pub id: Uuid,

    pub worker_id: String,

    pub service_id: Uuid,

    pub price_min: i64,

    pub price_max: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Public listing row: one worker offering one service
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkerListing {
    pub offering_id: Uuid,
    pub worker_id: String,
    pub worker_name: String,
    pub avatar_url: Option<String>,
    pub bio: String,
    pub hourly_rate: i64,
    pub price_min: i64,
    pub price_max: i64,
    pub service_name: String,
}

impl Offering {
    /// Inserts a new offering
    ///
    /// # Errors
    ///
    /// A unique violation if the worker already offers this service, a check violation
    /// if the price range is invalid.
    pub async fn insert<'e, E>(
        executor: E,
        worker_id: &str,
        service_id: Uuid,
        price_min: i64,
        price_max: i64,
    ) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = utc_now();

        let offering = sqlx::query_as::<_, Offering>(
            r#"
            INSERT INTO worker_services (id, worker_id, service_id, price_min, price_max,
                                         created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING id, worker_id, service_id, price_min, price_max, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(worker_id)
        .bind(service_id)
        .bind(price_min)
        .bind(price_max)
        .bind(now)
        .fetch_all(executor)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(offering)
    }

    /// Updates the price range of the worker's existing offering for a service
    pub async fn update_prices_by_pair<'e, E>(
        executor: E,
        worker_id: &str,
        service_id: Uuid,
        price_min: i64,
        price_max: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let offering = sqlx::query_as::<_, Offering>(
            r#"
            UPDATE worker_services
            SET price_min = $3,
                price_max = $4,
                updated_at = $5
            WHERE worker_id = $1 AND service_id = $2
            RETURNING id, worker_id, service_id, price_min, price_max, created_at, updated_at
            "#,
        )
        .bind(worker_id)
        .bind(service_id)
        .bind(price_min)
        .bind(price_max)
        .bind(utc_now())
        .fetch_all(executor)
        .await?
        .into_iter()
        .next();

        Ok(offering)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let offering = sqlx::query_as::<_, Offering>(
            r#"
            SELECT id, worker_id, service_id, price_min, price_max, created_at, updated_at
            FROM worker_services
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(offering)
    }

    pub async fn list_by_worker<'e, E>(executor: E, worker_id: &str) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let offerings = sqlx::query_as::<_, Offering>(
            r#"
            SELECT id, worker_id, service_id, price_min, price_max, created_at, updated_at
            FROM worker_services
            WHERE worker_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(worker_id)
        .fetch_all(executor)
        .await?;

        Ok(offerings)
    }

    /// Public listing of every worker offering a service, cheapest first
    pub async fn list_workers_for_service<'e, E>(
        executor: E,
        service_id: Uuid,
    ) -> Result<Vec<WorkerListing>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let listings = sqlx::query_as::<_, WorkerListing>(
            r#"
            SELECT ws.id AS offering_id,
                   ws.worker_id AS worker_id,
                   u.name AS worker_name,
                   u.avatar_url AS avatar_url,
                   wp.bio AS bio,
                   wp.hourly_rate AS hourly_rate,
                   ws.price_min AS price_min,
                   ws.price_max AS price_max,
                   s.name AS service_name
            FROM worker_services ws
            JOIN worker_profiles wp ON wp.id = ws.worker_id
            JOIN users u ON u.id = wp.id
            JOIN services s ON s.id = ws.service_id
            WHERE ws.service_id = $1
            ORDER BY ws.price_min ASC, u.name ASC
            "#,
        )
        .bind(service_id)
        .fetch_all(executor)
        .await?;

        Ok(listings)
    }

    /// Counts offerings for a (worker, service) pair; at most one by construction
    pub async fn count_by_pair<'e, E>(
        executor: E,
        worker_id: &str,
        service_id: Uuid,
    ) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM worker_services WHERE worker_id = $1 AND service_id = $2",
        )
        .bind(worker_id)
        .bind(service_id)
        .fetch_one(executor)
        .await?;

        Ok(count)
    }
}
