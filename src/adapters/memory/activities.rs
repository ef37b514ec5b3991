//! In-memory activity repository.
//!
//! When wired with an enrollment repository it serves the same
//! availability projection the SQL view provides
//! (`capacity - count(active enrollments)`).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use crate::domain::activities::{Activity, ActivityRecord, NewActivity};
use crate::domain::foundation::{ActivityId, DomainError, Timestamp};
use crate::ports::{ActivityRepository, ActivitySearch, EnrollmentRepository};

use super::InMemoryEnrollmentRepository;

pub struct InMemoryActivityRepository {
    rows: RwLock<HashMap<i64, Activity>>,
    next_id: AtomicI64,
    enrollments: Option<Arc<InMemoryEnrollmentRepository>>,
}

impl InMemoryActivityRepository {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            enrollments: None,
        }
    }

    /// Projects availability from the given enrollment rows.
    pub fn with_enrollments(enrollments: Arc<InMemoryEnrollmentRepository>) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            enrollments: Some(enrollments),
        }
    }

    async fn active_count(&self, id: ActivityId) -> Result<i64, DomainError> {
        match &self.enrollments {
            Some(enrollments) => enrollments.count_active_by_activity(id).await,
            None => Ok(0),
        }
    }

    async fn record(&self, activity: Activity) -> Result<ActivityRecord, DomainError> {
        let taken = self.active_count(activity.id).await?;
        Ok(ActivityRecord {
            available_places: activity.capacity as i64 - taken,
            activity,
        })
    }

    fn live_rows(&self) -> Vec<Activity> {
        let mut rows: Vec<Activity> = self
            .rows
            .read()
            .expect("activities lock poisoned")
            .values()
            .filter(|a| !a.is_deleted())
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.id);
        rows
    }
}

impl Default for InMemoryActivityRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityRepository for InMemoryActivityRepository {
    async fn create(&self, input: NewActivity) -> Result<Activity, DomainError> {
        let now = Timestamp::now();
        let activity = Activity {
            id: ActivityId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            title: input.title,
            description: input.description,
            capacity: input.capacity,
            day_of_week: input.day_of_week,
            start_time: input.start_time,
            end_time: input.end_time,
            photo_url: input.photo_url,
            instructor: input.instructor,
            category: input.category,
            branch_id: input.branch_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.rows
            .write()
            .expect("activities lock poisoned")
            .insert(activity.id.as_i64(), activity.clone());
        Ok(activity)
    }

    async fn find_by_id(&self, id: ActivityId) -> Result<ActivityRecord, DomainError> {
        let activity = {
            let rows = self.rows.read().expect("activities lock poisoned");
            rows.get(&id.as_i64())
                .filter(|a| !a.is_deleted())
                .cloned()
                .ok_or_else(|| DomainError::not_found("activity not found"))?
        };
        self.record(activity).await
    }

    async fn list(&self) -> Result<Vec<ActivityRecord>, DomainError> {
        let mut records = Vec::new();
        for activity in self.live_rows() {
            records.push(self.record(activity).await?);
        }
        Ok(records)
    }

    async fn search(&self, search: &ActivitySearch) -> Result<Vec<ActivityRecord>, DomainError> {
        let keyword = search.keyword.as_deref().map(|k| k.to_lowercase());
        let mut records = Vec::new();
        for activity in self.live_rows() {
            let keyword_hit = keyword.as_deref().map_or(true, |k| {
                activity.title.to_lowercase().contains(k)
                    || activity.description.to_lowercase().contains(k)
            });
            let category_hit = search
                .category
                .as_deref()
                .map_or(true, |c| activity.category.eq_ignore_ascii_case(c));
            if keyword_hit && category_hit {
                records.push(self.record(activity).await?);
            }
        }
        Ok(records)
    }

    async fn update(&self, id: ActivityId, input: NewActivity) -> Result<Activity, DomainError> {
        // Capacity cannot drop below the places already taken.
        let taken = self.active_count(id).await?;
        if (input.capacity as i64) < taken {
            return Err(DomainError::validation(
                "cannot reduce capacity below active enrollments",
            ));
        }

        let mut rows = self.rows.write().expect("activities lock poisoned");
        let existing = rows
            .get_mut(&id.as_i64())
            .filter(|a| !a.is_deleted())
            .ok_or_else(|| DomainError::not_found("activity not found"))?;

        existing.title = input.title;
        existing.description = input.description;
        existing.capacity = input.capacity;
        existing.day_of_week = input.day_of_week;
        existing.start_time = input.start_time;
        existing.end_time = input.end_time;
        existing.photo_url = input.photo_url;
        existing.instructor = input.instructor;
        existing.category = input.category;
        existing.branch_id = input.branch_id;
        existing.updated_at = Timestamp::now();
        Ok(existing.clone())
    }

    async fn soft_delete(&self, id: ActivityId) -> Result<(), DomainError> {
        let mut rows = self.rows.write().expect("activities lock poisoned");
        let existing = rows
            .get_mut(&id.as_i64())
            .filter(|a| !a.is_deleted())
            .ok_or_else(|| DomainError::not_found("activity not found"))?;
        existing.deleted_at = Some(Timestamp::now());
        Ok(())
    }
}
