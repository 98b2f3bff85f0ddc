/// Booking lifecycle engine
///
/// Homeowners create and cancel bookings; the worker assigned through the booked
/// offering confirms and completes them. Every status change is a compare-and-set on
/// the status read just before, so two racing changes cannot both succeed.
///
/// # State Machine
///
/// ```text
/// pending → confirmed → completed
/// pending → cancelled
/// confirmed → cancelled
/// ```
///
/// # Example
///
/// ```no_run
/// use chrono::{NaiveDate, NaiveTime};
/// use handyhub_shared::auth::CallerContext;
/// use handyhub_shared::bookings::BookingEngine;
/// use handyhub_shared::models::booking::{BookingStatus, CreateBooking};
/// use sqlx::SqlitePool;
/// use uuid::Uuid;
///
/// # async fn example(pool: SqlitePool, offering_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let engine = BookingEngine::new(pool);
///
/// let homeowner = CallerContext::homeowner("user_h1");
/// let booking = engine.create_booking(&homeowner, CreateBooking {
///     worker_service_id: offering_id,
///     scheduled_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
///     scheduled_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
///     address: "12 Elm St".to_string(),
///     agreed_price: Some(9_500),
/// }).await?;
///
/// let worker = CallerContext::worker("user_w1");
/// let confirmed = engine.update_status(&worker, booking.id, BookingStatus::Confirmed).await?;
/// assert!(confirmed.is_price_confirmed);
/// # Ok(())
/// # }
/// ```

use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::{require_ownership, require_participant};
use crate::auth::context::CallerContext;
use crate::error::{CoreError, CoreResult};
use crate::models::booking::{Booking, BookingAssignment, BookingStatus, BookingView, CreateBooking};
use crate::models::offering::Offering;

#[derive(Clone)]
pub struct BookingEngine {
    db: SqlitePool,
}

impl BookingEngine {
    pub fn new(db: SqlitePool) -> Self {
        BookingEngine { db }
    }

    /// Books an offering; the caller becomes the booking's homeowner
    ///
    /// The booking starts in `pending`. No overlap checking is done.
    ///
    /// # Errors
    ///
    /// - `ValidationFailure` for an empty address or a negative price
    /// - `NotFound` if the offering does not exist
    pub async fn create_booking(
        &self,
        caller: &CallerContext,
        data: CreateBooking,
    ) -> CoreResult<Booking> {
        let data = CreateBooking {
            address: data.address.trim().to_string(),
            ..data
        };
        data.validate()?;

        Offering::find_by_id(&self.db, data.worker_service_id)
            .await?
            .ok_or_else(|| CoreError::not_found("offering", data.worker_service_id))?;

        let booking = Booking::create(&self.db, &caller.user_id, &data).await?;

        info!(
            booking_id = %booking.id,
            homeowner_id = %booking.homeowner_id,
            offering_id = %booking.worker_service_id,
            "Booking created"
        );

        Ok(booking)
    }

    /// Cancels a booking; only the homeowner who made it may do so
    ///
    /// # Errors
    ///
    /// - `NotFound` if the booking does not exist
    /// - `Forbidden` unless the caller owns the booking
    /// - `InvalidTransition` if the booking is already completed or cancelled
    pub async fn cancel(&self, caller: &CallerContext, booking_id: Uuid) -> CoreResult<Booking> {
        let assignment = self.assignment(booking_id).await?;

        require_ownership(caller, &assignment.homeowner_id, "booking")?;

        self.apply_transition(&assignment, BookingStatus::Cancelled, caller)
            .await
    }

    /// Moves a booking on behalf of the worker assigned through its offering
    ///
    /// Entering `confirmed` also marks the price as confirmed.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the booking does not exist
    /// - `Forbidden` unless the caller is the assigned worker
    /// - `InvalidTransition` if the move is not allowed from the current status
    pub async fn update_status(
        &self,
        caller: &CallerContext,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> CoreResult<Booking> {
        let assignment = self.assignment(booking_id).await?;

        require_ownership(caller, &assignment.worker_id, "booking")?;

        self.apply_transition(&assignment, new_status, caller).await
    }

    /// Bookings made by a homeowner, oldest first
    pub async fn get_for_homeowner(&self, homeowner_id: &str) -> CoreResult<Vec<BookingView>> {
        Ok(Booking::list_for_homeowner(&self.db, homeowner_id).await?)
    }

    /// Bookings against a worker's offerings, oldest first
    pub async fn get_for_worker(&self, worker_id: &str) -> CoreResult<Vec<BookingView>> {
        Ok(Booking::list_for_worker(&self.db, worker_id).await?)
    }

    /// A single booking, visible to its homeowner and its assigned worker
    pub async fn get_booking(&self, caller: &CallerContext, booking_id: Uuid) -> CoreResult<BookingView> {
        let view = Booking::find_view(&self.db, booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("booking", booking_id))?;

        require_participant(
            caller,
            &[view.homeowner_id.as_str(), view.worker_id.as_str()],
            "booking",
        )?;

        Ok(view)
    }

    async fn assignment(&self, booking_id: Uuid) -> CoreResult<BookingAssignment> {
        Booking::find_assignment(&self.db, booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("booking", booking_id))
    }

    async fn apply_transition(
        &self,
        assignment: &BookingAssignment,
        target: BookingStatus,
        caller: &CallerContext,
    ) -> CoreResult<Booking> {
        let current = assignment.status;

        if !current.can_transition_to(target) {
            return Err(CoreError::transition(current, target));
        }

        match Booking::transition(&self.db, assignment.booking_id, current, target).await? {
            Some(booking) => {
                info!(
                    booking_id = %booking.id,
                    from = %current,
                    to = %target,
                    caller_id = %caller.user_id,
                    "Booking status changed"
                );
                Ok(booking)
            }
            None => {
                // Status moved between the read and the update
                let booking = Booking::find_by_id(&self.db, assignment.booking_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("booking", assignment.booking_id))?;

                warn!(
                    booking_id = %booking.id,
                    expected = %current,
                    actual = %booking.status,
                    to = %target,
                    "Booking status changed concurrently"
                );

                Err(CoreError::transition(booking.status, target))
            }
        }
    }
}
