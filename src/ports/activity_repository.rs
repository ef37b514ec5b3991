//! Activity repository port.

use async_trait::async_trait;

use crate::domain::foundation::{ActivityId, DomainError};
use crate::domain::activities::{Activity, ActivityRecord, NewActivity};

/// Search parameters for the public catalog.
#[derive(Debug, Clone, Default)]
pub struct ActivitySearch {
    /// Case-insensitive keyword over title and description.
    pub keyword: Option<String>,
    pub category: Option<String>,
}

/// Persistence port for activities (relational store).
///
/// Read paths go through the availability projection
/// (`capacity - count(active enrollments)`), which already excludes
/// soft-deleted activities. The projection is eventually consistent with
/// enrollment writes; strict capacity under contention would need an
/// atomic counter at write time.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn create(&self, activity: NewActivity) -> Result<Activity, DomainError>;

    /// `NotFound` for missing or soft-deleted activities.
    async fn find_by_id(&self, id: ActivityId) -> Result<ActivityRecord, DomainError>;

    async fn list(&self) -> Result<Vec<ActivityRecord>, DomainError>;

    async fn search(&self, search: &ActivitySearch) -> Result<Vec<ActivityRecord>, DomainError>;

    async fn update(&self, id: ActivityId, activity: NewActivity) -> Result<Activity, DomainError>;

    /// Soft delete: sets `deleted_at`, keeps the row.
    async fn soft_delete(&self, id: ActivityId) -> Result<(), DomainError>;
}
