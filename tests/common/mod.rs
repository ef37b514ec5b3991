//! Shared wiring for the cross-service integration tests.
//!
//! All four services run in one process over the in-memory event bus,
//! with the same consumer bindings the deployed binaries register:
//! `payment.*` into the subscription service, `subscription.delete`
//! into the enrollment cascade.

#![allow(dead_code)]

use std::sync::Arc;

use gym_platform::adapters::clients::LocalSubscriptionLookup;
use gym_platform::adapters::events::InMemoryEventBus;
use gym_platform::adapters::gateways::{GatewayFactory, MockGatewayBehavior};
use gym_platform::adapters::memory::{
    InMemoryActivityRepository, InMemoryEnrollmentRepository, InMemoryPaymentRepository,
    InMemoryPlanRepository, InMemorySubscriptionRepository,
};
use gym_platform::application::activities::{ActivityService, CachedActivityService};
use gym_platform::application::enrollments::EnrollmentService;
use gym_platform::application::payment_events::{PaymentEventProcessor, PAYMENT_EVENTS_PATTERN};
use gym_platform::application::payments::{CreatePaymentCommand, PaymentService};
use gym_platform::application::plans::{CachedPlanService, PlanService};
use gym_platform::application::subscription_events::{
    SubscriptionCancelledHandler, SUBSCRIPTION_CANCELLED_KEY,
};
use gym_platform::application::subscriptions::{
    CreateSubscriptionCommand, SubscriptionResponse, SubscriptionService,
};
use gym_platform::domain::activities::NewActivity;
use gym_platform::domain::foundation::{ActivityId, EventMetadata, PlanId, UserId};
use gym_platform::domain::payments::{EntityType, Payment, PaymentStatus};
use gym_platform::domain::plans::{AccessType, NewPlan, Plan};
use gym_platform::ports::EventSubscriber;

pub struct World {
    pub bus: Arc<InMemoryEventBus>,
    pub plans: Arc<CachedPlanService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub payments: Arc<PaymentService>,
    pub activities: Arc<CachedActivityService>,
    pub enrollments: Arc<EnrollmentService>,
    pub enrollment_repo: Arc<InMemoryEnrollmentRepository>,
}

impl World {
    pub async fn new() -> Self {
        let bus = Arc::new(InMemoryEventBus::new());

        let plan_repo = Arc::new(InMemoryPlanRepository::new());
        let subscription_repo = Arc::new(InMemorySubscriptionRepository::new());
        let payment_repo = Arc::new(InMemoryPaymentRepository::new());
        let enrollment_repo = Arc::new(InMemoryEnrollmentRepository::new());
        let activity_repo = Arc::new(InMemoryActivityRepository::with_enrollments(
            enrollment_repo.clone(),
        ));

        let plans = Arc::new(CachedPlanService::new(PlanService::new(plan_repo.clone())));
        let subscriptions = Arc::new(SubscriptionService::new(
            subscription_repo.clone(),
            plan_repo.clone(),
            bus.clone(),
        ));
        let payments = Arc::new(PaymentService::new(
            payment_repo,
            Arc::new(GatewayFactory::for_tests(MockGatewayBehavior::Approve)),
            bus.clone(),
        ));
        let activities = Arc::new(CachedActivityService::new(ActivityService::new(
            activity_repo.clone(),
            bus.clone(),
        )));
        let enrollments = Arc::new(EnrollmentService::new(
            enrollment_repo.clone(),
            activity_repo,
            Arc::new(LocalSubscriptionLookup::new(subscription_repo, plan_repo)),
            bus.clone(),
        ));

        bus.subscribe(
            PAYMENT_EVENTS_PATTERN,
            Arc::new(PaymentEventProcessor::new(subscriptions.clone())),
        )
        .await
        .unwrap();
        bus.subscribe(
            SUBSCRIPTION_CANCELLED_KEY,
            Arc::new(SubscriptionCancelledHandler::new(enrollments.clone())),
        )
        .await
        .unwrap();

        Self {
            bus,
            plans,
            subscriptions,
            payments,
            activities,
            enrollments,
            enrollment_repo,
        }
    }

    pub async fn create_plan(
        &self,
        name: &str,
        price: f64,
        access: AccessType,
        categories: &[&str],
    ) -> Plan {
        self.plans
            .create_plan(
                NewPlan::validate(
                    name,
                    "",
                    price,
                    access,
                    30,
                    categories.iter().map(|c| c.to_string()).collect(),
                )
                .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn create_activity(&self, title: &str, category: &str, capacity: u32) -> ActivityId {
        self.activities
            .create(
                NewActivity::validate(
                    title, "", capacity, "Lunes", "08:00", "09:00", "", "Laura", category, None,
                )
                .unwrap(),
            )
            .await
            .unwrap()
            .id
    }

    pub async fn subscribe(&self, user: UserId, plan_id: PlanId) -> SubscriptionResponse {
        self.subscriptions
            .create(
                user,
                CreateSubscriptionCommand {
                    plan_id,
                    origin_branch_id: None,
                    preferred_payment_method: Some("cash".into()),
                    auto_renew: false,
                    notes: None,
                },
            )
            .await
            .unwrap()
    }

    pub fn cash_payment(
        &self,
        user: UserId,
        subscription_id: &str,
        amount: f64,
        key: Option<&str>,
    ) -> CreatePaymentCommand {
        CreatePaymentCommand {
            entity_type: EntityType::Subscription,
            entity_id: subscription_id.to_string(),
            user_id: user,
            amount,
            currency: "ARS".into(),
            payment_method: "cash".into(),
            payment_gateway: "cash".into(),
            idempotency_key: key.map(|k| k.to_string()),
            metadata: EventMetadata::new(),
            callback_url: None,
            webhook_url: None,
        }
    }

    /// Full activation round: create the cash payment, confirm it with
    /// the admin status PATCH (recording the register code as the
    /// transaction), and let `payment.completed` activate the
    /// subscription.
    pub async fn pay_and_activate(
        &self,
        user: UserId,
        subscription_id: &str,
        amount: f64,
    ) -> Payment {
        let payment = self
            .payments
            .create_basic(self.cash_payment(user, subscription_id, amount, None))
            .await
            .unwrap();
        let approved = self
            .payments
            .update_status(
                payment.id,
                PaymentStatus::Completed,
                Some(format!("CASH-{}", payment.id)),
            )
            .await
            .unwrap();
        assert_eq!(approved.status, PaymentStatus::Completed);
        approved
    }
}
