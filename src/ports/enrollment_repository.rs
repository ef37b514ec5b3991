//! Enrollment repository port.

use async_trait::async_trait;

use crate::domain::foundation::{ActivityId, DomainError, UserId};
use crate::domain::activities::Enrollment;

/// Persistence port for enrollments (relational store).
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Enrollment>, DomainError>;

    /// Authoritative write: reactivates the `(user, activity)` row when
    /// one exists, inserts otherwise. This is what makes the concurrent
    /// duplicate pre-check advisory rather than load-bearing.
    async fn upsert_active(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
        subscription_id: Option<String>,
    ) -> Result<Enrollment, DomainError>;

    /// Flips the row inactive; `NotFound` when no row exists.
    async fn deactivate(&self, user_id: UserId, activity_id: ActivityId)
        -> Result<(), DomainError>;

    /// Cascade helper: deactivates every enrollment of the user and
    /// returns how many rows changed.
    async fn deactivate_all_by_user(&self, user_id: UserId) -> Result<u64, DomainError>;

    async fn count_active_by_activity(&self, activity_id: ActivityId) -> Result<i64, DomainError>;
}
