//! In-memory enrollment repository.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use crate::domain::activities::Enrollment;
use crate::domain::foundation::{ActivityId, DomainError, EnrollmentId, UserId};
use crate::ports::EnrollmentRepository;

pub struct InMemoryEnrollmentRepository {
    rows: RwLock<Vec<Enrollment>>,
    next_id: AtomicI64,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryEnrollmentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Enrollment>, DomainError> {
        Ok(self
            .rows
            .read()
            .expect("enrollments lock poisoned")
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_active(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
        subscription_id: Option<String>,
    ) -> Result<Enrollment, DomainError> {
        let mut rows = self.rows.write().expect("enrollments lock poisoned");
        if let Some(row) = rows
            .iter_mut()
            .find(|e| e.user_id == user_id && e.activity_id == activity_id)
        {
            row.active = true;
            if subscription_id.is_some() {
                row.subscription_id = subscription_id;
            }
            return Ok(row.clone());
        }

        let enrollment = Enrollment::new(
            EnrollmentId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            user_id,
            activity_id,
            subscription_id,
        );
        rows.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn deactivate(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.write().expect("enrollments lock poisoned");
        let row = rows
            .iter_mut()
            .find(|e| e.user_id == user_id && e.activity_id == activity_id)
            .ok_or_else(|| DomainError::not_found("enrollment not found"))?;
        row.active = false;
        Ok(())
    }

    async fn deactivate_all_by_user(&self, user_id: UserId) -> Result<u64, DomainError> {
        let mut rows = self.rows.write().expect("enrollments lock poisoned");
        let mut count = 0;
        for row in rows.iter_mut().filter(|e| e.user_id == user_id && e.active) {
            row.active = false;
            count += 1;
        }
        Ok(count)
    }

    async fn count_active_by_activity(&self, activity_id: ActivityId) -> Result<i64, DomainError> {
        Ok(self
            .rows
            .read()
            .expect("enrollments lock poisoned")
            .iter()
            .filter(|e| e.activity_id == activity_id && e.active)
            .count() as i64)
    }
}
