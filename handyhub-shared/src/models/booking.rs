/// Booking model and status state machine
///
/// A booking ties a homeowner to one worker offering. The assigned worker is never
/// stored on the booking; it is resolved by joining through the offering.
///
/// # State Machine
///
/// ```text
/// pending → confirmed → completed
/// pending → cancelled
/// confirmed → cancelled
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE bookings (
///     id                  BLOB PRIMARY KEY NOT NULL,
///     homeowner_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     worker_service_id   BLOB NOT NULL REFERENCES worker_services(id) ON DELETE RESTRICT,
///     status              TEXT NOT NULL DEFAULT 'pending',
///     scheduled_date      TEXT NOT NULL,
///     scheduled_time      TEXT NOT NULL,
///     address             TEXT NOT NULL,
///     agreed_price        INTEGER,
///     is_price_confirmed  BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at          TEXT NOT NULL,
///     updated_at          TEXT NOT NULL
/// );
/// ```

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteExecutor;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::utc_now;

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Requested by the homeowner, awaiting the worker
    Pending,

    /// Accepted by the worker; the price is confirmed
    Confirmed,

    /// Called off by either side
    Cancelled,

    /// Work finished
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Checks if no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    /// Checks if transition to target status is valid
    pub fn can_transition_to(&self, target: BookingStatus) -> bool {
        match (self, target) {
            (BookingStatus::Pending, BookingStatus::Confirmed) => true,
            (BookingStatus::Pending, BookingStatus::Cancelled) => true,

            (BookingStatus::Confirmed, BookingStatus::Completed) => true,
            (BookingStatus::Confirmed, BookingStatus::Cancelled) => true,

            _ => false,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" | "canceled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(format!("Unknown booking status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,

    pub homeowner_id: String,

    /// Offering being booked; the worker is reached through it
    pub worker_service_id: Uuid,

    pub status: BookingStatus,

    pub scheduled_date: NaiveDate,

    pub scheduled_time: NaiveTime,

    pub address: String,

    /// Agreed price in minor currency units
    pub agreed_price: Option<i64>,

    /// Set once the worker confirms
    pub is_price_confirmed: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a booking
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBooking {
    pub worker_service_id: Uuid,

    pub scheduled_date: NaiveDate,

    pub scheduled_time: NaiveTime,

    #[validate(length(min = 1, max = 500, message = "address must not be empty"))]
    pub address: String,

    #[validate(range(min = 0, message = "agreed price must not be negative"))]
    pub agreed_price: Option<i64>,
}

/// Who may act on a booking, resolved through its offering
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BookingAssignment {
    pub booking_id: Uuid,
    pub homeowner_id: String,
    pub worker_id: String,
    pub status: BookingStatus,
}

/// Booking joined with its offering, service, worker and homeowner
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookingView {
    pub id: Uuid,
    pub status: BookingStatus,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub address: String,
    pub agreed_price: Option<i64>,
    pub is_price_confirmed: bool,
    pub offering_id: Uuid,
    pub service_id: Uuid,
    pub service_name: String,
    pub price_min: i64,
    pub price_max: i64,
    pub worker_id: String,
    pub worker_name: String,
    pub homeowner_id: String,
    pub homeowner_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const VIEW_SELECT: &str = r#"
    SELECT b.id AS id,
           b.status AS status,
           b.scheduled_date AS scheduled_date,
           b.scheduled_time AS scheduled_time,
           b.address AS address,
           b.agreed_price AS agreed_price,
           b.is_price_confirmed AS is_price_confirmed,
           ws.id AS offering_id,
           s.id AS service_id,
           s.name AS service_name,
           ws.price_min AS price_min,
           ws.price_max AS price_max,
           ws.worker_id AS worker_id,
           wu.name AS worker_name,
           b.homeowner_id AS homeowner_id,
           hu.name AS homeowner_name,
           b.created_at AS created_at,
           b.updated_at AS updated_at
    FROM bookings b
    JOIN worker_services ws ON ws.id = b.worker_service_id
    JOIN services s ON s.id = ws.service_id
    JOIN users wu ON wu.id = ws.worker_id
    JOIN users hu ON hu.id = b.homeowner_id
"#;

impl Booking {
    /// Creates a booking in pending status
    ///
    /// # Errors
    ///
    /// A foreign key violation if the homeowner or offering does not exist.
    pub async fn create<'e, E>(
        executor: E,
        homeowner_id: &str,
        data: &CreateBooking,
    ) -> Result<Self, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let now = utc_now();

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (id, homeowner_id, worker_service_id, status, scheduled_date,
                                  scheduled_time, address, agreed_price, created_at, updated_at)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $8)
            RETURNING id, homeowner_id, worker_service_id, status, scheduled_date, scheduled_time,
                      address, agreed_price, is_price_confirmed, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(homeowner_id)
        .bind(data.worker_service_id)
        .bind(data.scheduled_date)
        .bind(data.scheduled_time)
        .bind(&data.address)
        .bind(data.agreed_price)
        .bind(now)
        .fetch_all(executor)
        .await?
        .into_iter()
        .next()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(booking)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, homeowner_id, worker_service_id, status, scheduled_date, scheduled_time,
                   address, agreed_price, is_price_confirmed, created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(booking)
    }

    /// Resolves the homeowner and the assigned worker of a booking
    pub async fn find_assignment<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<BookingAssignment>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let assignment = sqlx::query_as::<_, BookingAssignment>(
            r#"
            SELECT b.id AS booking_id,
                   b.homeowner_id AS homeowner_id,
                   ws.worker_id AS worker_id,
                   b.status AS status
            FROM bookings b
            JOIN worker_services ws ON ws.id = b.worker_service_id
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(assignment)
    }

    /// Moves a booking from `from` to `to` if it is still in `from`
    ///
    /// Entering `confirmed` also sets `is_price_confirmed`. Returns None when the stored
    /// status is no longer `from` (or the booking is gone), leaving the row untouched.
    pub async fn transition<'e, E>(
        executor: E,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings
            SET status = $3,
                is_price_confirmed = (is_price_confirmed OR $4),
                updated_at = $5
            WHERE id = $1 AND status = $2
            RETURNING id, homeowner_id, worker_service_id, status, scheduled_date, scheduled_time,
                      address, agreed_price, is_price_confirmed, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(to == BookingStatus::Confirmed)
        .bind(utc_now())
        .fetch_all(executor)
        .await?
        .into_iter()
        .next();

        Ok(booking)
    }

    /// Bookings made by a homeowner, oldest first
    pub async fn list_for_homeowner<'e, E>(
        executor: E,
        homeowner_id: &str,
    ) -> Result<Vec<BookingView>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            "{} WHERE b.homeowner_id = $1 ORDER BY b.created_at ASC, b.rowid ASC",
            VIEW_SELECT
        );

        let bookings = sqlx::query_as::<_, BookingView>(&sql)
            .bind(homeowner_id)
            .fetch_all(executor)
            .await?;

        Ok(bookings)
    }

    /// Bookings against any of a worker's offerings, oldest first
    pub async fn list_for_worker<'e, E>(
        executor: E,
        worker_id: &str,
    ) -> Result<Vec<BookingView>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!(
            "{} WHERE ws.worker_id = $1 ORDER BY b.created_at ASC, b.rowid ASC",
            VIEW_SELECT
        );

        let bookings = sqlx::query_as::<_, BookingView>(&sql)
            .bind(worker_id)
            .fetch_all(executor)
            .await?;

        Ok(bookings)
    }

    pub async fn find_view<'e, E>(executor: E, id: Uuid) -> Result<Option<BookingView>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let sql = format!("{} WHERE b.id = $1", VIEW_SELECT);

        let booking = sqlx::query_as::<_, BookingView>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(booking)
    }
}
