//! Consumer for `payment.*` events (subscription service side).
//!
//! Delivery is at-least-once and unordered; the effect of every branch
//! is determined by the payload, never by how many times it arrives.
//! Events that cannot make progress by retrying (malformed payloads,
//! missing subscriptions, stale transitions) are logged and acked so
//! they do not poison the queue.

use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, EventEnvelope, SubscriptionId};
use crate::domain::payments::PaymentEvent;
use crate::ports::EventHandler;

use super::subscriptions::SubscriptionService;

/// Routing-key pattern this processor binds.
pub const PAYMENT_EVENTS_PATTERN: &str = "payment.*";

pub struct PaymentEventProcessor {
    subscriptions: Arc<SubscriptionService>,
}

impl PaymentEventProcessor {
    pub fn new(subscriptions: Arc<SubscriptionService>) -> Self {
        Self { subscriptions }
    }

    async fn on_completed(
        &self,
        id: SubscriptionId,
        event: &PaymentEvent,
    ) -> Result<(), DomainError> {
        if !event.is_completed() {
            tracing::warn!(status = %event.status, "completed event with mismatched status, acking");
            return Ok(());
        }

        match self
            .subscriptions
            .activate_from_payment(id, &event.payment_id, event.amount)
            .await
        {
            Ok(()) => Ok(()),
            // Late or missing subscription: ack instead of re-queueing.
            Err(err) if err.is_not_found() => {
                tracing::warn!(subscription_id = %id, "completed payment for unknown subscription, acking");
                Ok(())
            }
            // A terminal state absorbed a stale transition; retrying
            // cannot change the outcome.
            Err(err) if err.kind == crate::domain::foundation::ErrorKind::Conflict => {
                tracing::warn!(subscription_id = %id, error = %err, "stale completion event, acking");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn on_failed(&self, id: SubscriptionId, event: &PaymentEvent) -> Result<(), DomainError> {
        if let Err(err) = self
            .subscriptions
            .register_payment_failure(id, &event.payment_id)
            .await
        {
            // Failure bookkeeping is best-effort; never re-queue for it.
            tracing::warn!(subscription_id = %id, error = %err, "could not record payment failure");
        }
        Ok(())
    }

    async fn on_refunded(
        &self,
        id: SubscriptionId,
        event: &PaymentEvent,
    ) -> Result<(), DomainError> {
        if !event.is_refunded() {
            tracing::warn!(status = %event.status, "refunded event with mismatched status, acking");
            return Ok(());
        }

        match self
            .subscriptions
            .cancel_from_refund(id, &event.payment_id)
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                tracing::warn!(subscription_id = %id, "refund for unknown subscription, acking");
                Ok(())
            }
            Err(err) if err.kind == crate::domain::foundation::ErrorKind::Conflict => {
                tracing::warn!(subscription_id = %id, error = %err, "stale refund event, acking");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl EventHandler for PaymentEventProcessor {
    async fn handle(&self, envelope: EventEnvelope) -> Result<(), DomainError> {
        let event: PaymentEvent = match envelope.data_as() {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(action = %envelope.action, error = %err, "malformed payment event, acking");
                return Ok(());
            }
        };

        // Only subscription-backed payments concern this service.
        if event.entity_type != "subscription" {
            return Ok(());
        }

        let Ok(subscription_id) = SubscriptionId::from_str(&event.entity_id) else {
            tracing::warn!(entity_id = %event.entity_id, "payment event with bad subscription id, acking");
            return Ok(());
        };

        match envelope.action.as_str() {
            "payment.completed" => self.on_completed(subscription_id, &event).await,
            "payment.failed" => self.on_failed(subscription_id, &event).await,
            "payment.refunded" => self.on_refunded(subscription_id, &event).await,
            // Creation events carry no transition.
            "payment.created" => Ok(()),
            other => {
                tracing::debug!(action = other, "ignoring payment event");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::{InMemoryPlanRepository, InMemorySubscriptionRepository};
    use crate::application::subscriptions::{CreateSubscriptionCommand, SubscriptionService};
    use crate::domain::foundation::{EventMetadata, UserId};
    use crate::domain::plans::{AccessType, NewPlan};
    use crate::domain::subscriptions::SubscriptionState;
    use crate::ports::PlanRepository;
    use serde_json::json;

    struct Fixture {
        processor: PaymentEventProcessor,
        subscriptions: Arc<SubscriptionService>,
    }

    async fn fixture_with_pending() -> (Fixture, SubscriptionId) {
        let plans = Arc::new(InMemoryPlanRepository::new());
        let plan = NewPlan::validate("Basic", "", 5000.0, AccessType::Full, 30, vec![])
            .unwrap()
            .into_plan();
        plans.create(&plan).await.unwrap();

        let subscriptions = Arc::new(SubscriptionService::new(
            Arc::new(InMemorySubscriptionRepository::new()),
            plans,
            Arc::new(InMemoryEventBus::new()),
        ));
        let created = subscriptions
            .create(
                UserId::new(1),
                CreateSubscriptionCommand {
                    plan_id: plan.id,
                    origin_branch_id: None,
                    preferred_payment_method: None,
                    auto_renew: false,
                    notes: None,
                },
            )
            .await
            .unwrap();

        (
            Fixture {
                processor: PaymentEventProcessor::new(subscriptions.clone()),
                subscriptions,
            },
            created.id,
        )
    }

    fn payment_event(action: &str, status: &str, entity_id: &str) -> EventEnvelope {
        EventEnvelope::new(
            action,
            "payment",
            "pay-1",
            json!({
                "payment_id": "pay-1",
                "status": status,
                "entity_type": "subscription",
                "entity_id": entity_id,
                "user_id": 1,
                "amount": 5000.0,
                "currency": "ARS",
                "payment_gateway": "cash",
            }),
        )
        .with_metadata(EventMetadata::new())
    }

    #[tokio::test]
    async fn completed_payment_activates_subscription() {
        let (fx, id) = fixture_with_pending().await;
        fx.processor
            .handle(payment_event("payment.completed", "completed", &id.to_string()))
            .await
            .unwrap();

        let sub = fx.subscriptions.get(id).await.unwrap();
        assert_eq!(sub.state, SubscriptionState::Active);
        assert_eq!(sub.payment_id.as_deref(), Some("pay-1"));
    }

    #[tokio::test]
    async fn redelivered_completion_is_a_noop() {
        let (fx, id) = fixture_with_pending().await;
        let event = payment_event("payment.completed", "completed", &id.to_string());
        fx.processor.handle(event.clone()).await.unwrap();
        fx.processor.handle(event).await.unwrap();

        let sub = fx.subscriptions.get(id).await.unwrap();
        assert_eq!(sub.renewal_history.len(), 1);
    }

    #[tokio::test]
    async fn failure_after_completion_does_not_demote() {
        let (fx, id) = fixture_with_pending().await;
        fx.processor
            .handle(payment_event("payment.completed", "completed", &id.to_string()))
            .await
            .unwrap();
        fx.processor
            .handle(payment_event("payment.failed", "failed", &id.to_string()))
            .await
            .unwrap();

        let sub = fx.subscriptions.get(id).await.unwrap();
        assert_eq!(sub.state, SubscriptionState::Active);
    }

    #[tokio::test]
    async fn failed_payment_marks_pending_subscription() {
        let (fx, id) = fixture_with_pending().await;
        fx.processor
            .handle(payment_event("payment.failed", "failed", &id.to_string()))
            .await
            .unwrap();

        let sub = fx.subscriptions.get(id).await.unwrap();
        assert_eq!(sub.state, SubscriptionState::PaymentFailed);
    }

    #[tokio::test]
    async fn refund_cancels_active_subscription() {
        let (fx, id) = fixture_with_pending().await;
        fx.processor
            .handle(payment_event("payment.completed", "completed", &id.to_string()))
            .await
            .unwrap();
        fx.processor
            .handle(payment_event("payment.refunded", "refunded", &id.to_string()))
            .await
            .unwrap();

        let sub = fx.subscriptions.get(id).await.unwrap();
        assert_eq!(sub.state, SubscriptionState::Cancelled);
    }

    #[tokio::test]
    async fn unknown_subscription_is_acked_not_requeued() {
        let (fx, _) = fixture_with_pending().await;
        let missing = SubscriptionId::new();
        let result = fx
            .processor
            .handle(payment_event("payment.completed", "completed", &missing.to_string()))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn malformed_and_foreign_events_are_acked() {
        let (fx, _) = fixture_with_pending().await;

        let garbage = EventEnvelope::new("payment.completed", "payment", "x", json!({"nope": 1}));
        assert!(fx.processor.handle(garbage).await.is_ok());

        let foreign = payment_event("payment.completed", "completed", "ins-1");
        let mut data = foreign.data.clone();
        data["entity_type"] = json!("inscription");
        let foreign = EventEnvelope::new("payment.completed", "payment", "x", data);
        assert!(fx.processor.handle(foreign).await.is_ok());
    }
}
