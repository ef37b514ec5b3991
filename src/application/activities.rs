//! Activity catalog service and its caching decorator.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::activities::{Activity, ActivityRecord, NewActivity};
use crate::domain::foundation::{ActivityId, DomainError, EventEnvelope};
use crate::ports::{ActivityRepository, ActivitySearch, EventPublisher};

use super::cache::TtlCache;

/// Catalog operations: CRUD, search, soft delete, change events.
pub struct ActivityService {
    activities: Arc<dyn ActivityRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl ActivityService {
    pub fn new(activities: Arc<dyn ActivityRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            activities,
            publisher,
        }
    }

    pub async fn create(&self, input: NewActivity) -> Result<Activity, DomainError> {
        let activity = self.activities.create(input).await?;
        self.publish_or_log(activity_envelope("create", &activity)).await;
        tracing::info!(activity_id = %activity.id, title = %activity.title, "activity created");
        Ok(activity)
    }

    pub async fn get(&self, id: ActivityId) -> Result<ActivityRecord, DomainError> {
        self.activities.find_by_id(id).await
    }

    pub async fn list(&self) -> Result<Vec<ActivityRecord>, DomainError> {
        self.activities.list().await
    }

    pub async fn search(&self, search: &ActivitySearch) -> Result<Vec<ActivityRecord>, DomainError> {
        self.activities.search(search).await
    }

    pub async fn update(&self, id: ActivityId, input: NewActivity) -> Result<Activity, DomainError> {
        let activity = self.activities.update(id, input).await?;
        self.publish_or_log(activity_envelope("update", &activity)).await;
        Ok(activity)
    }

    /// Soft delete; the read model stops serving the activity at once.
    pub async fn delete(&self, id: ActivityId) -> Result<(), DomainError> {
        let record = self.activities.find_by_id(id).await?;
        self.activities.soft_delete(id).await?;
        self.publish_or_log(activity_envelope("delete", &record.activity)).await;
        tracing::info!(activity_id = %id, "activity deleted");
        Ok(())
    }

    async fn publish_or_log(&self, event: EventEnvelope) {
        let key = event.routing_key();
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(routing_key = %key, error = %err, "event publish failed");
        }
    }
}

fn activity_envelope(action: &str, activity: &Activity) -> EventEnvelope {
    EventEnvelope::new(
        action,
        "activity",
        activity.id.to_string(),
        json!({
            "titulo": activity.title,
            "categoria": activity.category,
            "cupo": activity.capacity,
            "dia": activity.day_of_week.as_str(),
        }),
    )
}

/// Caching decorator over [`ActivityService`].
///
/// Only the full catalog listing is cached; point reads and searches hit
/// the store. Any mutation wipes the map.
pub struct CachedActivityService {
    inner: ActivityService,
    cache: Arc<TtlCache>,
}

const ACTIVITIES_KEY: &str = "activities:all";

/// Activities change more often than plans; entries live five minutes.
pub const ACTIVITY_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
/// Sweeper period for the activity list cache.
pub const ACTIVITY_CACHE_SWEEP: Duration = Duration::from_secs(5 * 60);

impl CachedActivityService {
    pub fn new(inner: ActivityService) -> Self {
        Self {
            inner,
            cache: Arc::new(TtlCache::new(ACTIVITY_CACHE_TTL)),
        }
    }

    pub fn cache(&self) -> Arc<TtlCache> {
        self.cache.clone()
    }

    pub async fn create(&self, input: NewActivity) -> Result<Activity, DomainError> {
        let activity = self.inner.create(input).await?;
        self.cache.clear();
        Ok(activity)
    }

    pub async fn get(&self, id: ActivityId) -> Result<ActivityRecord, DomainError> {
        self.inner.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<ActivityRecord>, DomainError> {
        if let Some(bytes) = self.cache.get(ACTIVITIES_KEY) {
            if let Ok(records) = serde_json::from_slice::<Vec<ActivityRecord>>(&bytes) {
                tracing::debug!("activity cache hit");
                return Ok(records);
            }
        }

        tracing::debug!("activity cache miss");
        let records = self.inner.list().await?;
        if let Ok(bytes) = serde_json::to_vec(&records) {
            self.cache.put(ACTIVITIES_KEY, bytes);
        }
        Ok(records)
    }

    pub async fn search(&self, search: &ActivitySearch) -> Result<Vec<ActivityRecord>, DomainError> {
        self.inner.search(search).await
    }

    pub async fn update(&self, id: ActivityId, input: NewActivity) -> Result<Activity, DomainError> {
        let activity = self.inner.update(id, input).await?;
        self.cache.clear();
        Ok(activity)
    }

    pub async fn delete(&self, id: ActivityId) -> Result<(), DomainError> {
        self.inner.delete(id).await?;
        self.cache.clear();
        Ok(())
    }
}
