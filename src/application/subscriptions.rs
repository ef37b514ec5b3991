//! Subscription service.
//!
//! Owns the subscription lifecycle and the plan-name enrichment on every
//! response. Payment events flow in through
//! [`super::payment_events::PaymentEventProcessor`], which calls the
//! `*_from_payment` methods here.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::domain::foundation::{
    BranchId, DomainError, EventEnvelope, PlanId, SubscriptionId, Timestamp, UserId,
};
use crate::domain::subscriptions::{Renewal, Subscription, SubscriptionState};
use crate::ports::{EventPublisher, PlanRepository, SubscriptionRepository};

/// Subscription creation input; the user id comes from the validated
/// token, never from the body.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionCommand {
    pub plan_id: PlanId,
    pub origin_branch_id: Option<BranchId>,
    pub preferred_payment_method: Option<String>,
    pub auto_renew: bool,
    pub notes: Option<String>,
}

/// Subscription response, enriched with the plan name. A deleted plan
/// yields an empty name rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub plan_name: String,
    pub origin_branch_id: Option<BranchId>,
    pub start_date: Timestamp,
    pub expiry_date: Timestamp,
    pub state: SubscriptionState,
    pub payment_id: Option<String>,
    pub auto_renew: bool,
    pub preferred_payment_method: Option<String>,
    pub notes: String,
    pub renewal_history: Vec<Renewal>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    plans: Arc<dyn PlanRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl SubscriptionService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        plans: Arc<dyn PlanRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            subscriptions,
            plans,
            publisher,
        }
    }

    /// Creates a subscription in `pending_payment`.
    ///
    /// Preconditions, in order, each with its own failure:
    /// 1. caller identity is taken from the validated token;
    /// 2. no subscription of the user is `active`;
    /// 3. no subscription of the user is `pending_payment`;
    /// 4. the plan exists and is active.
    pub async fn create(
        &self,
        user_id: UserId,
        command: CreateSubscriptionCommand,
    ) -> Result<SubscriptionResponse, DomainError> {
        if self
            .subscriptions
            .exists_in_state(user_id, SubscriptionState::Active)
            .await?
        {
            return Err(DomainError::conflict(
                "user already has an active subscription",
            ));
        }
        if self
            .subscriptions
            .exists_in_state(user_id, SubscriptionState::PendingPayment)
            .await?
        {
            return Err(DomainError::conflict(
                "user has a subscription pending payment",
            ));
        }

        let plan = self.plans.find_by_id(command.plan_id).await?;
        if !plan.active {
            return Err(DomainError::validation("plan is not active"));
        }

        let subscription = Subscription::create(
            user_id,
            &plan,
            command.origin_branch_id,
            command.preferred_payment_method,
            command.auto_renew,
            command.notes,
        );
        self.subscriptions.create(&subscription).await?;

        self.publish_or_log(subscription_envelope("create", &subscription)).await;
        tracing::info!(
            subscription_id = %subscription.id,
            user_id = %user_id,
            plan = %plan.name,
            "subscription created"
        );

        Ok(self.to_response(subscription, plan.name))
    }

    pub async fn get(&self, id: SubscriptionId) -> Result<SubscriptionResponse, DomainError> {
        let subscription = self.subscriptions.find_by_id(id).await?;
        let plan_name = self.plan_name(subscription.plan_id).await;
        Ok(self.to_response(subscription, plan_name))
    }

    /// The user's current active subscription (`state = active`, not yet
    /// expired); `NotFound` otherwise.
    pub async fn get_active_by_user(
        &self,
        user_id: UserId,
    ) -> Result<SubscriptionResponse, DomainError> {
        let subscription = self.subscriptions.find_active_by_user(user_id).await?;
        let plan_name = self.plan_name(subscription.plan_id).await;
        Ok(self.to_response(subscription, plan_name))
    }

    pub async fn list_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SubscriptionResponse>, DomainError> {
        let subscriptions = self.subscriptions.find_by_user(user_id).await?;
        let mut responses = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let plan_name = self.plan_name(subscription.plan_id).await;
            responses.push(self.to_response(subscription, plan_name));
        }
        Ok(responses)
    }

    /// Administrative state override; validated against the transition
    /// table and published as `subscription.update`.
    pub async fn update_status(
        &self,
        id: SubscriptionId,
        state: SubscriptionState,
        payment_id: Option<String>,
    ) -> Result<SubscriptionResponse, DomainError> {
        use crate::domain::foundation::StateMachine;

        let mut subscription = self.subscriptions.find_by_id(id).await?;
        subscription.state = subscription
            .state
            .transition_to(state)
            .map_err(|e| DomainError::conflict(e.to_string()))?;
        if let Some(payment_id) = payment_id.filter(|p| !p.is_empty()) {
            subscription.payment_id = Some(payment_id);
        }
        subscription.updated_at = Timestamp::now();
        self.subscriptions.update(&subscription).await?;

        self.publish_or_log(subscription_envelope("update", &subscription)).await;
        let plan_name = self.plan_name(subscription.plan_id).await;
        Ok(self.to_response(subscription, plan_name))
    }

    /// Cancels a subscription and announces it so the activity service
    /// can cascade-deactivate the user's enrollments.
    pub async fn cancel(&self, id: SubscriptionId) -> Result<(), DomainError> {
        let mut subscription = self.subscriptions.find_by_id(id).await?;
        subscription.cancel()?;
        self.subscriptions.update(&subscription).await?;

        self.publish_or_log(subscription_envelope("delete", &subscription)).await;
        tracing::info!(subscription_id = %id, "subscription cancelled");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Payment-event reactions (at-least-once, possibly out of order)
    // ------------------------------------------------------------------

    /// Activates the subscription backing a completed payment. The
    /// billing window restarts from now; already-active subscriptions
    /// absorb the event as a no-op.
    pub async fn activate_from_payment(
        &self,
        id: SubscriptionId,
        payment_id: &str,
        amount: f64,
    ) -> Result<(), DomainError> {
        let mut subscription = self.subscriptions.find_by_id(id).await?;
        if subscription.state == SubscriptionState::Active {
            return Ok(());
        }

        let duration_days = self
            .plans
            .find_by_id(subscription.plan_id)
            .await
            .ok()
            .map(|plan| plan.duration_days);

        subscription.activate(payment_id, duration_days, amount)?;
        self.subscriptions.update(&subscription).await?;

        self.publish_or_log(subscription_envelope("update", &subscription)).await;
        tracing::info!(subscription_id = %id, payment_id, "subscription activated by payment");
        Ok(())
    }

    /// Records a failed payment attempt against a pending subscription.
    pub async fn register_payment_failure(
        &self,
        id: SubscriptionId,
        payment_id: &str,
    ) -> Result<(), DomainError> {
        let mut subscription = self.subscriptions.find_by_id(id).await?;
        subscription.register_payment_failure(payment_id)?;
        self.subscriptions.update(&subscription).await?;

        self.publish_or_log(subscription_envelope("update", &subscription)).await;
        Ok(())
    }

    /// Cancels the subscription whose backing payment was refunded.
    pub async fn cancel_from_refund(
        &self,
        id: SubscriptionId,
        payment_id: &str,
    ) -> Result<(), DomainError> {
        let mut subscription = self.subscriptions.find_by_id(id).await?;
        if subscription.state == SubscriptionState::Cancelled {
            return Ok(());
        }
        subscription.cancel_by_refund(payment_id)?;
        self.subscriptions.update(&subscription).await?;

        self.publish_or_log(subscription_envelope("delete", &subscription)).await;
        tracing::info!(subscription_id = %id, payment_id, "subscription cancelled by refund");
        Ok(())
    }

    async fn plan_name(&self, plan_id: PlanId) -> String {
        match self.plans.find_by_id(plan_id).await {
            Ok(plan) => plan.name,
            Err(_) => String::new(),
        }
    }

    /// Broker failures never fail the request that caused the event;
    /// the write is already durable.
    async fn publish_or_log(&self, event: EventEnvelope) {
        let key = event.routing_key();
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(routing_key = %key, error = %err, "event publish failed");
        }
    }

    fn to_response(&self, subscription: Subscription, plan_name: String) -> SubscriptionResponse {
        SubscriptionResponse {
            id: subscription.id,
            user_id: subscription.user_id,
            plan_id: subscription.plan_id,
            plan_name,
            origin_branch_id: subscription.origin_branch_id,
            start_date: subscription.start_date,
            expiry_date: subscription.expiry_date,
            state: subscription.state,
            payment_id: subscription.payment_id,
            auto_renew: subscription.auto_renew,
            preferred_payment_method: subscription.preferred_payment_method,
            notes: subscription.notes,
            renewal_history: subscription.renewal_history,
            created_at: subscription.created_at,
            updated_at: subscription.updated_at,
        }
    }
}

fn subscription_envelope(action: &str, subscription: &Subscription) -> EventEnvelope {
    EventEnvelope::new(
        action,
        "subscription",
        subscription.id.to_string(),
        json!({
            "user_id": subscription.user_id.as_i64(),
            "plan_id": subscription.plan_id.to_string(),
            "state": subscription.state.as_str(),
            "payment_id": subscription.payment_id,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::memory::{InMemoryPlanRepository, InMemorySubscriptionRepository};
    use crate::domain::foundation::ErrorKind;
    use crate::domain::plans::{AccessType, NewPlan, Plan};

    struct Fixture {
        service: SubscriptionService,
        plans: Arc<InMemoryPlanRepository>,
        bus: Arc<InMemoryEventBus>,
    }

    async fn fixture() -> (Fixture, Plan) {
        let plans = Arc::new(InMemoryPlanRepository::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let service = SubscriptionService::new(
            Arc::new(InMemorySubscriptionRepository::new()),
            plans.clone(),
            bus.clone(),
        );

        let plan = NewPlan::validate("Basic", "", 5000.0, AccessType::Limited, 30, vec!["yoga".into()])
            .unwrap()
            .into_plan();
        plans.create(&plan).await.unwrap();

        (Fixture { service, plans, bus }, plan)
    }

    fn command(plan_id: PlanId) -> CreateSubscriptionCommand {
        CreateSubscriptionCommand {
            plan_id,
            origin_branch_id: None,
            preferred_payment_method: Some("cash".into()),
            auto_renew: false,
            notes: None,
        }
    }

    #[tokio::test]
    async fn create_starts_pending_and_enriches_plan_name() {
        let (fx, plan) = fixture().await;
        let response = fx
            .service
            .create(UserId::new(1), command(plan.id))
            .await
            .unwrap();
        assert_eq!(response.state, SubscriptionState::PendingPayment);
        assert_eq!(response.plan_name, "Basic");
        assert!(response.renewal_history.is_empty());
    }

    #[tokio::test]
    async fn second_pending_subscription_is_rejected() {
        let (fx, plan) = fixture().await;
        fx.service.create(UserId::new(1), command(plan.id)).await.unwrap();
        let err = fx
            .service
            .create(UserId::new(1), command(plan.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.message.contains("pending"));
    }

    #[tokio::test]
    async fn active_subscription_blocks_new_one() {
        let (fx, plan) = fixture().await;
        let created = fx.service.create(UserId::new(1), command(plan.id)).await.unwrap();
        fx.service
            .activate_from_payment(created.id, "pay-1", 5000.0)
            .await
            .unwrap();

        let err = fx
            .service
            .create(UserId::new(1), command(plan.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.message.contains("active"));
    }

    #[tokio::test]
    async fn inactive_plan_is_rejected() {
        let (fx, plan) = fixture().await;
        let mut inactive = plan.clone();
        inactive.active = false;
        fx.plans.update(&inactive).await.unwrap();

        let err = fx
            .service
            .create(UserId::new(1), command(plan.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn activation_makes_subscription_observable_as_active() {
        let (fx, plan) = fixture().await;
        let created = fx.service.create(UserId::new(5), command(plan.id)).await.unwrap();

        assert!(fx.service.get_active_by_user(UserId::new(5)).await.is_err());

        fx.service
            .activate_from_payment(created.id, "pay-1", 5000.0)
            .await
            .unwrap();

        let active = fx.service.get_active_by_user(UserId::new(5)).await.unwrap();
        assert_eq!(active.id, created.id);
        assert_eq!(active.state, SubscriptionState::Active);
        assert_eq!(active.payment_id.as_deref(), Some("pay-1"));
    }

    #[tokio::test]
    async fn activation_is_idempotent_under_redelivery() {
        let (fx, plan) = fixture().await;
        let created = fx.service.create(UserId::new(5), command(plan.id)).await.unwrap();
        fx.service.activate_from_payment(created.id, "pay-1", 5000.0).await.unwrap();
        fx.service.activate_from_payment(created.id, "pay-1", 5000.0).await.unwrap();

        let active = fx.service.get(created.id).await.unwrap();
        assert_eq!(active.renewal_history.len(), 1);
    }

    #[tokio::test]
    async fn cancel_publishes_delete_event_with_user_id() {
        let (fx, plan) = fixture().await;
        let created = fx.service.create(UserId::new(9), command(plan.id)).await.unwrap();
        fx.service.cancel(created.id).await.unwrap();

        let events = fx.bus.events_for_key("subscription.delete");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data["user_id"], 9);
    }

    #[tokio::test]
    async fn refund_cancellation_is_idempotent() {
        let (fx, plan) = fixture().await;
        let created = fx.service.create(UserId::new(2), command(plan.id)).await.unwrap();
        fx.service.activate_from_payment(created.id, "pay-1", 5000.0).await.unwrap();
        fx.service.cancel_from_refund(created.id, "pay-1").await.unwrap();
        fx.service.cancel_from_refund(created.id, "pay-1").await.unwrap();

        let sub = fx.service.get(created.id).await.unwrap();
        assert_eq!(sub.state, SubscriptionState::Cancelled);
    }

    #[tokio::test]
    async fn deleted_plan_enriches_with_empty_name() {
        let (fx, plan) = fixture().await;
        let created = fx.service.create(UserId::new(3), command(plan.id)).await.unwrap();
        fx.plans.delete(plan.id).await.unwrap();

        let sub = fx.service.get(created.id).await.unwrap();
        assert_eq!(sub.plan_name, "");
    }
}
