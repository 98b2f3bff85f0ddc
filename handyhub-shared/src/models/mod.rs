/// Database models for HandyHub
///
/// Each model owns its SQL. Functions take any SQLite executor, so the same call works
/// against the pool or inside a transaction (`&mut *tx`).
///
/// Writes with a `RETURNING` clause are read with `fetch_all`. The statement then runs to
/// completion before the call returns, so an autocommit write is already visible to every
/// other pooled connection.
///
/// # Models
///
/// - `user`: users synced from the identity provider
/// - `worker_profile`: one profile per worker, sharing the user's id
/// - `service`: global service catalog
/// - `offering`: a worker's price range for one service
/// - `booking`: bookings and their status state machine
/// - `review`: homeowner reviews of completed bookings
/// - `chat`: one conversation thread per homeowner/worker pair
/// - `message`: messages inside a chat

use chrono::{DateTime, Utc};

pub mod booking;
pub mod chat;
pub mod message;
pub mod offering;
pub mod review;
pub mod service;
pub mod user;
pub mod worker_profile;

/// Current time as stored in `created_at`/`updated_at` columns
pub(crate) fn utc_now() -> DateTime<Utc> {
    Utc::now()
}
