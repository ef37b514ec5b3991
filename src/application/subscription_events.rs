//! Consumer for `subscription.delete` events (activity service side).
//!
//! A cancelled subscription takes all of the user's enrollments with it.
//! The event is durable and the cascade idempotent, so partial failures
//! are logged and acked; replay converges to the same end state.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope, UserId};
use crate::ports::EventHandler;

use super::enrollments::{EnrollmentService, SubscriptionDeletedPayload};

/// Routing key this handler binds.
pub const SUBSCRIPTION_CANCELLED_KEY: &str = "subscription.delete";

pub struct SubscriptionCancelledHandler {
    enrollments: Arc<EnrollmentService>,
}

impl SubscriptionCancelledHandler {
    pub fn new(enrollments: Arc<EnrollmentService>) -> Self {
        Self { enrollments }
    }
}

#[async_trait]
impl EventHandler for SubscriptionCancelledHandler {
    async fn handle(&self, envelope: EventEnvelope) -> Result<(), DomainError> {
        let payload: SubscriptionDeletedPayload = match envelope.data_as() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(
                    subscription_id = %envelope.id,
                    error = %err,
                    "subscription.delete without user_id, acking"
                );
                return Ok(());
            }
        };

        let user_id = UserId::new(payload.user_id);
        match self.enrollments.deactivate_all_by_user(user_id).await {
            Ok(count) => {
                tracing::info!(
                    user_id = %user_id,
                    subscription_id = %envelope.id,
                    count,
                    "cascade-deactivated enrollments after cancellation"
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(user_id = %user_id, error = %err, "enrollment cascade failed");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clients::LocalSubscriptionLookup;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::{
        InMemoryActivityRepository, InMemoryEnrollmentRepository, InMemoryPlanRepository,
        InMemorySubscriptionRepository,
    };
    use crate::ports::EnrollmentRepository;
    use serde_json::json;

    fn handler_with_rows() -> (SubscriptionCancelledHandler, Arc<InMemoryEnrollmentRepository>) {
        let enrollments = Arc::new(InMemoryEnrollmentRepository::new());
        let activities = Arc::new(InMemoryActivityRepository::with_enrollments(
            enrollments.clone(),
        ));
        let lookup = Arc::new(LocalSubscriptionLookup::new(
            Arc::new(InMemorySubscriptionRepository::new()),
            Arc::new(InMemoryPlanRepository::new()),
        ));
        let service = Arc::new(EnrollmentService::new(
            enrollments.clone(),
            activities,
            lookup,
            Arc::new(InMemoryEventBus::new()),
        ));
        (SubscriptionCancelledHandler::new(service), enrollments)
    }

    #[tokio::test]
    async fn cancellation_deactivates_all_user_rows() {
        let (handler, enrollments) = handler_with_rows();
        let user = UserId::new(4);
        for activity in 1..=3 {
            enrollments
                .upsert_active(user, crate::domain::foundation::ActivityId::new(activity), None)
                .await
                .unwrap();
        }

        let event = EventEnvelope::new("delete", "subscription", "sub-1", json!({"user_id": 4}));
        handler.handle(event.clone()).await.unwrap();

        let rows = enrollments.list_by_user(user).await.unwrap();
        assert!(rows.iter().all(|e| !e.active));

        // Replay converges.
        handler.handle(event).await.unwrap();
        assert!(enrollments.list_by_user(user).await.unwrap().iter().all(|e| !e.active));
    }

    #[tokio::test]
    async fn missing_user_id_is_acked() {
        let (handler, _) = handler_with_rows();
        let event = EventEnvelope::new("delete", "subscription", "sub-1", json!({}));
        assert!(handler.handle(event).await.is_ok());
    }
}
