//! Enrollment entity.
//!
//! Enrollments are logically unique per `(user, activity)`: re-enrolling
//! reactivates the existing row instead of inserting a second one, and
//! rows are never hard-deleted (`active = false` is the resting state).

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ActivityId, EnrollmentId, Timestamp, UserId};

/// A user's booking for an activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub activity_id: ActivityId,
    /// Subscription that backed the enrollment, when known.
    pub subscription_id: Option<String>,
    pub active: bool,
    pub enrolled_at: Timestamp,
}

impl Enrollment {
    pub fn new(
        id: EnrollmentId,
        user_id: UserId,
        activity_id: ActivityId,
        subscription_id: Option<String>,
    ) -> Self {
        Self {
            id,
            user_id,
            activity_id,
            subscription_id,
            active: true,
            enrolled_at: Timestamp::now(),
        }
    }

    /// Key used on unenrollment events.
    pub fn event_key(user_id: UserId, activity_id: ActivityId) -> String {
        format!("{}_{}", user_id, activity_id)
    }
}
