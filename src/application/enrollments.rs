//! Enrollment service.
//!
//! The enrollment transaction runs three pre-checks concurrently, then
//! verifies the caller's subscription against the subscription service,
//! applies capacity and plan-category gates, and only then writes. A
//! pre-check failure therefore never leaves partial state behind, and
//! there is no rollback path.
//!
//! The duplicate pre-check is advisory: the authoritative uniqueness of
//! `(user, activity)` is the update-or-insert at write time.

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::domain::activities::{ActivityRecord, Enrollment};
use crate::domain::foundation::{ActivityId, DomainError, EventEnvelope, UserId};
use crate::ports::{
    ActivityRepository, EnrollmentRepository, EventPublisher, SubscriptionLookup,
};

/// Result of one concurrent pre-check.
struct Precheck {
    name: &'static str,
    outcome: Result<PrecheckData, DomainError>,
}

enum PrecheckData {
    Activity(Box<ActivityRecord>),
    NoDuplicate,
    /// The caller's current active enrollment count. Informational;
    /// reserved for per-user quota logic.
    ActiveCount(usize),
}

pub struct EnrollmentService {
    enrollments: Arc<dyn EnrollmentRepository>,
    activities: Arc<dyn ActivityRepository>,
    subscriptions: Arc<dyn SubscriptionLookup>,
    publisher: Arc<dyn EventPublisher>,
}

impl EnrollmentService {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        activities: Arc<dyn ActivityRepository>,
        subscriptions: Arc<dyn SubscriptionLookup>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            enrollments,
            activities,
            subscriptions,
            publisher,
        }
    }

    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Enrollment>, DomainError> {
        self.enrollments.list_by_user(user_id).await
    }

    /// Enrolls the caller into an activity.
    ///
    /// `bearer_token` is the caller's own token, forwarded on the
    /// subscription-service call.
    pub async fn enroll(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
        bearer_token: &str,
    ) -> Result<Enrollment, DomainError> {
        // Three pre-checks as independent tasks, rendezvousing through a
        // bounded channel. The channel closes once every sender is gone.
        let (tx, mut rx) = mpsc::channel::<Precheck>(3);

        {
            let tx = tx.clone();
            let activities = self.activities.clone();
            tokio::spawn(async move {
                let outcome = match activities.find_by_id(activity_id).await {
                    Ok(record) => Ok(PrecheckData::Activity(Box::new(record))),
                    Err(err) if err.is_not_found() => {
                        Err(DomainError::not_found("activity not found"))
                    }
                    Err(err) => Err(err),
                };
                let _ = tx.send(Precheck { name: "activity", outcome }).await;
            });
        }

        {
            let tx = tx.clone();
            let enrollments = self.enrollments.clone();
            tokio::spawn(async move {
                let outcome = match enrollments.list_by_user(user_id).await {
                    Ok(rows) => {
                        if rows.iter().any(|e| e.activity_id == activity_id && e.active) {
                            Err(DomainError::conflict(
                                "user is already enrolled in this activity",
                            ))
                        } else {
                            Ok(PrecheckData::NoDuplicate)
                        }
                    }
                    Err(err) => Err(err),
                };
                let _ = tx.send(Precheck { name: "duplicates", outcome }).await;
            });
        }

        {
            let tx = tx.clone();
            let enrollments = self.enrollments.clone();
            tokio::spawn(async move {
                let outcome = match enrollments.list_by_user(user_id).await {
                    Ok(rows) => {
                        Ok(PrecheckData::ActiveCount(rows.iter().filter(|e| e.active).count()))
                    }
                    Err(err) => Err(err),
                };
                let _ = tx.send(Precheck { name: "availability", outcome }).await;
            });
        }
        // The original handle must drop so the receive loop terminates
        // once the last task's clone goes away.
        drop(tx);

        let mut first_error: Option<DomainError> = None;
        let mut activity: Option<ActivityRecord> = None;
        let mut active_count: Option<usize> = None;

        while let Some(result) = rx.recv().await {
            match result.outcome {
                Ok(PrecheckData::Activity(record)) => activity = Some(*record),
                Ok(PrecheckData::NoDuplicate) => {}
                Ok(PrecheckData::ActiveCount(count)) => active_count = Some(count),
                Err(err) => {
                    tracing::debug!(check = result.name, error = %err, "enrollment pre-check failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        let activity = activity
            .ok_or_else(|| DomainError::internal("activity validation incomplete"))?;
        tracing::debug!(
            user_id = %user_id,
            active_enrollments = active_count.unwrap_or(0),
            "pre-checks passed"
        );

        // Cross-service verification, caller token forwarded.
        let subscription = self
            .subscriptions
            .active_subscription(user_id, bearer_token)
            .await?;
        if subscription.state != "active" {
            return Err(DomainError::subscription_inactive(format!(
                "subscription is not active (state: {})",
                subscription.state
            )));
        }

        if activity.available_places <= 0 {
            return Err(DomainError::capacity_exhausted("capacity reached"));
        }

        if let Some(plan) = &subscription.plan {
            if !plan.permits_category(&activity.activity.category) {
                return Err(DomainError::plan_restriction(format!(
                    "plan '{}' does not include the category '{}'",
                    plan.name, activity.activity.category
                )));
            }
        }

        // Authoritative write: reactivate or insert.
        let enrollment = self
            .enrollments
            .upsert_active(user_id, activity_id, Some(subscription.id.clone()))
            .await?;

        self.publish_or_log(EventEnvelope::new(
            "create",
            "inscription",
            enrollment.id.to_string(),
            json!({
                "usuario_id": enrollment.user_id.as_i64(),
                "actividad_id": enrollment.activity_id.as_i64(),
                "is_activa": enrollment.active,
            }),
        ))
        .await;

        tracing::info!(
            user_id = %user_id,
            activity_id = %activity_id,
            subscription_id = %subscription.id,
            "enrollment created"
        );
        Ok(enrollment)
    }

    /// Unenrolls the caller from an activity.
    pub async fn unenroll(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
    ) -> Result<(), DomainError> {
        self.enrollments.deactivate(user_id, activity_id).await?;

        self.publish_or_log(EventEnvelope::new(
            "delete",
            "inscription",
            Enrollment::event_key(user_id, activity_id),
            json!({
                "usuario_id": user_id.as_i64(),
                "actividad_id": activity_id.as_i64(),
            }),
        ))
        .await;
        Ok(())
    }

    /// Deactivates every enrollment of the user; the cascade behind
    /// subscription cancellation. Returns the number of rows flipped.
    pub async fn deactivate_all_by_user(&self, user_id: UserId) -> Result<u64, DomainError> {
        let count = self.enrollments.deactivate_all_by_user(user_id).await?;
        tracing::info!(user_id = %user_id, count, "deactivated all enrollments for user");
        Ok(count)
    }

    async fn publish_or_log(&self, event: EventEnvelope) {
        let key = event.routing_key();
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(routing_key = %key, error = %err, "event publish failed");
        }
    }
}

/// Payload of `subscription.delete` events, validated defensively.
#[derive(Debug, Deserialize)]
pub struct SubscriptionDeletedPayload {
    pub user_id: i64,
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
    use crate::domain::activities::NewActivity;
    use crate::domain::foundation::ErrorKind;
    use crate::domain::plans::{AccessType, NewPlan, Plan};
    use crate::domain::subscriptions::Subscription;
    use crate::ports::{
        ActivityRepository as _, EnrollmentRepository as _, PlanRepository, SubscriptionRepository,
    };

    struct Fixture {
        service: EnrollmentService,
        activities: Arc<InMemoryActivityRepository>,
        enrollments: Arc<InMemoryEnrollmentRepository>,
        subscriptions: Arc<InMemorySubscriptionRepository>,
        plans: Arc<InMemoryPlanRepository>,
        bus: Arc<InMemoryEventBus>,
    }

    fn fixture() -> Fixture {
        let plans = Arc::new(InMemoryPlanRepository::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepository::new());
        let enrollments = Arc::new(InMemoryEnrollmentRepository::new());
        // Availability is projected from the same enrollment rows the
        // service writes.
        let activities = Arc::new(InMemoryActivityRepository::with_enrollments(
            enrollments.clone(),
        ));
        let bus = Arc::new(InMemoryEventBus::new());

        let lookup = Arc::new(LocalSubscriptionLookup::new(
            subscriptions.clone(),
            plans.clone(),
        ));
        let service = EnrollmentService::new(
            enrollments.clone(),
            activities.clone(),
            lookup,
            bus.clone(),
        );
        Fixture {
            service,
            activities,
            enrollments,
            subscriptions,
            plans,
            bus,
        }
    }

    async fn seed_activity(fx: &Fixture, capacity: u32, category: &str) -> ActivityId {
        let activity = fx
            .activities
            .create(
                NewActivity::validate(
                    "Clase", "", capacity, "Lunes", "08:00", "09:00", "", "Laura", category, None,
                )
                .unwrap(),
            )
            .await
            .unwrap();
        activity.id
    }

    async fn seed_active_subscription(fx: &Fixture, user: UserId, categories: &[&str]) -> Plan {
        let access = if categories.is_empty() {
            AccessType::Full
        } else {
            AccessType::Limited
        };
        let plan = NewPlan::validate(
            "Basic",
            "",
            5000.0,
            access,
            30,
            categories.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
        .into_plan();
        fx.plans.create(&plan).await.unwrap();

        let mut sub = Subscription::create(user, &plan, None, None, false, None);
        sub.activate("pay-1", Some(30), 5000.0).unwrap();
        fx.subscriptions.create(&sub).await.unwrap();
        plan
    }

    #[tokio::test]
    async fn happy_path_enrolls_and_publishes() {
        let fx = fixture();
        let user = UserId::new(1);
        seed_active_subscription(&fx, user, &["yoga"]).await;
        let activity = seed_activity(&fx, 10, "yoga").await;

        let enrollment = fx.service.enroll(user, activity, "Bearer t").await.unwrap();
        assert!(enrollment.active);
        assert!(enrollment.subscription_id.is_some());
        assert_eq!(fx.bus.events_for_key("inscription.create").len(), 1);
    }

    #[tokio::test]
    async fn missing_activity_fails_before_any_write() {
        let fx = fixture();
        let user = UserId::new(1);
        seed_active_subscription(&fx, user, &[]).await;

        let err = fx
            .service
            .enroll(user, ActivityId::new(99), "t")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(fx.enrollments.list_by_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_enrollment_conflicts() {
        let fx = fixture();
        let user = UserId::new(1);
        seed_active_subscription(&fx, user, &["yoga"]).await;
        let activity = seed_activity(&fx, 10, "yoga").await;

        fx.service.enroll(user, activity, "t").await.unwrap();
        let err = fx.service.enroll(user, activity, "t").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn no_subscription_is_rejected() {
        let fx = fixture();
        let activity = seed_activity(&fx, 10, "yoga").await;

        let err = fx
            .service
            .enroll(UserId::new(1), activity, "t")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SubscriptionInactive);
    }

    #[tokio::test]
    async fn plan_category_gate_rejects_unlisted_category() {
        let fx = fixture();
        let user = UserId::new(1);
        seed_active_subscription(&fx, user, &["yoga", "spinning"]).await;
        let activity = seed_activity(&fx, 10, "funcional").await;

        let err = fx.service.enroll(user, activity, "t").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::PlanRestriction);
        assert!(err.message.contains("funcional"));
    }

    #[tokio::test]
    async fn category_match_is_case_insensitive() {
        let fx = fixture();
        let user = UserId::new(1);
        seed_active_subscription(&fx, user, &["Yoga"]).await;
        let activity = seed_activity(&fx, 10, "YOGA").await;

        assert!(fx.service.enroll(user, activity, "t").await.is_ok());
    }

    #[tokio::test]
    async fn full_capacity_is_rejected_without_a_row() {
        let fx = fixture();
        let activity = seed_activity(&fx, 3, "yoga").await;
        for i in 1..=3 {
            let user = UserId::new(i);
            seed_active_subscription(&fx, user, &["yoga"]).await;
            fx.service.enroll(user, activity, "t").await.unwrap();
        }

        let fourth = UserId::new(4);
        seed_active_subscription(&fx, fourth, &["yoga"]).await;
        let err = fx.service.enroll(fourth, activity, "t").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CapacityExhausted);
        assert!(fx.enrollments.list_by_user(fourth).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reenrollment_reactivates_the_same_row() {
        let fx = fixture();
        let user = UserId::new(1);
        seed_active_subscription(&fx, user, &["yoga"]).await;
        let activity = seed_activity(&fx, 10, "yoga").await;

        let first = fx.service.enroll(user, activity, "t").await.unwrap();
        fx.service.unenroll(user, activity).await.unwrap();
        let second = fx.service.enroll(user, activity, "t").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(fx.enrollments.list_by_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unenroll_unknown_row_is_not_found() {
        let fx = fixture();
        let err = fx
            .service
            .unenroll(UserId::new(1), ActivityId::new(9))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn unenroll_publishes_compound_key() {
        let fx = fixture();
        let user = UserId::new(7);
        seed_active_subscription(&fx, user, &["yoga"]).await;
        let activity = seed_activity(&fx, 10, "yoga").await;
        fx.service.enroll(user, activity, "t").await.unwrap();
        fx.service.unenroll(user, activity).await.unwrap();

        let events = fx.bus.events_for_key("inscription.delete");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, format!("7_{}", activity));
    }

    #[tokio::test]
    async fn cascade_deactivates_every_enrollment() {
        let fx = fixture();
        let user = UserId::new(1);
        seed_active_subscription(&fx, user, &[]).await;
        for category in ["yoga", "spinning", "funcional"] {
            let activity = seed_activity(&fx, 10, category).await;
            fx.service.enroll(user, activity, "t").await.unwrap();
        }

        let count = fx.service.deactivate_all_by_user(user).await.unwrap();
        assert_eq!(count, 3);
        let rows = fx.enrollments.list_by_user(user).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|e| !e.active));
    }
}
