/// Review model
///
/// Reviews belong to a booking and are deleted with it. A booking carries at most one
/// review (`reviews_booking_key`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE reviews (
///     id            BLOB PRIMARY KEY NOT NULL,
///     booking_id    BLOB NOT NULL REFERENCES bookings(id) ON DELETE CASCADE,
///     homeowner_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     rating        INTEGER NOT NULL,
///     comment       TEXT NOT NULL DEFAULT '',
///     created_at    TEXT NOT NULL,
///     CONSTRAINT reviews_rating_range CHECK (rating BETWEEN 1 AND 5),
///     CONSTRAINT reviews_booking_key UNIQUE (booking_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteExecutor;
use uuid::Uuid;
use validator::Validate;

use super::utc_now;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub homeowner_id: String,

    /// 1 to 5 stars
    pub rating: i64,

    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewReview {
    pub booking_id: Uuid,

    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: i64,

    #[validate(length(max = 4000))]
    #[serde(default)]
    pub comment: String,
}

impl Review {
    /// Inserts a review
    ///
    /// # Errors
    ///
    /// A unique violation on `reviews.booking_id` if the booking was already reviewed.
    pub async fn create<'e, E>(
        executor: E,
        homeowner_id: &str,
        data: &NewReview,
    ) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, booking_id, homeowner_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, booking_id, homeowner_id, rating, comment, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.booking_id)
        .bind(homeowner_id)
        .bind(data.rating)
        .bind(&data.comment)
        .bind(utc_now())
        .fetch_all(executor)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(review)
    }

    pub async fn list_by_booking<'e, E>(executor: E, booking_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, booking_id, homeowner_id, rating, comment, created_at
            FROM reviews
            WHERE booking_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(booking_id)
        .fetch_all(executor)
        .await?;

        Ok(reviews)
    }

    /// Reviews of every booking made against the worker's offerings, newest first
    pub async fn list_by_worker<'e, E>(executor: E, worker_id: &str) -> Result<Vec<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT r.id, r.booking_id, r.homeowner_id, r.rating, r.comment, r.created_at
            FROM reviews r
            JOIN bookings b ON b.id = r.booking_id
            JOIN worker_services ws ON ws.id = b.worker_service_id
            WHERE ws.worker_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(worker_id)
        .fetch_all(executor)
        .await?;

        Ok(reviews)
    }
}
