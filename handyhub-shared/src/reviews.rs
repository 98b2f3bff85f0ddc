/// Reviews of completed bookings
///
/// Only the homeowner who made a booking may review it, only once, and only after the
/// worker marked it completed.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::auth::authorization::require_ownership;
use crate::auth::context::CallerContext;
use crate::error::{CoreError, CoreResult};
use crate::models::booking::{Booking, BookingStatus};
use crate::models::review::{NewReview, Review};

/// A worker's reviews with their aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerReviews {
    pub worker_id: String,
    pub reviews: Vec<Review>,

    /// None until the first review
    pub average_rating: Option<f64>,
}

impl WorkerReviews {
    fn new(worker_id: &str, reviews: Vec<Review>) -> Self {
        let average_rating = if reviews.is_empty() {
            None
        } else {
            let total: i64 = reviews.iter().map(|r| r.rating).sum();
            Some(total as f64 / reviews.len() as f64)
        };

        WorkerReviews {
            worker_id: worker_id.to_string(),
            reviews,
            average_rating,
        }
    }

    pub fn count(&self) -> usize {
        self.reviews.len()
    }
}

#[derive(Clone)]
pub struct ReviewLedger {
    db: SqlitePool,
}

impl ReviewLedger {
    pub fn new(db: SqlitePool) -> Self {
        ReviewLedger { db }
    }

    /// Records the homeowner's review of a completed booking
    ///
    /// # Errors
    ///
    /// - `ValidationFailure` if the rating is outside 1..=5
    /// - `NotFound` if the booking does not exist
    /// - `Forbidden` unless the caller made the booking
    /// - `InvalidTransition` unless the booking is completed
    /// - `ConstraintViolation` if the booking was already reviewed
    pub async fn add_review(&self, caller: &CallerContext, data: NewReview) -> CoreResult<Review> {
        let data = NewReview {
            comment: data.comment.trim().to_string(),
            ..data
        };
        data.validate()?;

        let assignment = Booking::find_assignment(&self.db, data.booking_id)
            .await?
            .ok_or_else(|| CoreError::not_found("booking", data.booking_id))?;

        require_ownership(caller, &assignment.homeowner_id, "booking")?;

        if assignment.status != BookingStatus::Completed {
            return Err(CoreError::InvalidTransition(format!(
                "booking is {}, only completed bookings can be reviewed",
                assignment.status
            )));
        }

        let review = Review::create(&self.db, &caller.user_id, &data).await?;

        info!(
            review_id = %review.id,
            booking_id = %review.booking_id,
            worker_id = %assignment.worker_id,
            rating = review.rating,
            "Review added"
        );

        Ok(review)
    }

    pub async fn reviews_for_booking(&self, booking_id: Uuid) -> CoreResult<Vec<Review>> {
        Ok(Review::list_by_booking(&self.db, booking_id).await?)
    }

    /// Every review of the worker's bookings, newest first, with the average rating
    pub async fn reviews_for_worker(&self, worker_id: &str) -> CoreResult<WorkerReviews> {
        let reviews = Review::list_by_worker(&self.db, worker_id).await?;
        Ok(WorkerReviews::new(worker_id, reviews))
    }
}
