//! Subscription lifecycle scenarios: the single-active invariant and
//! the plan upgrade flow through refund and re-subscription.

mod common;

use common::World;
use gym_platform::domain::foundation::{ErrorKind, UserId};
use gym_platform::domain::plans::AccessType;
use gym_platform::domain::subscriptions::SubscriptionState;

#[tokio::test]
async fn at_most_one_subscription_in_active_or_pending() {
    let world = World::new().await;
    let user = UserId::new(1);
    let plan = world
        .create_plan("Basic", 5000.0, AccessType::Full, &[])
        .await;

    // Pending blocks a second creation.
    world.subscribe(user, plan.id).await;
    let err = world
        .subscriptions
        .create(
            user,
            gym_platform::application::subscriptions::CreateSubscriptionCommand {
                plan_id: plan.id,
                origin_branch_id: None,
                preferred_payment_method: None,
                auto_renew: false,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    // Active blocks as well.
    let subs = world.subscriptions.list_by_user(user).await.unwrap();
    world
        .pay_and_activate(user, &subs[0].id.to_string(), 5000.0)
        .await;
    let err = world
        .subscriptions
        .create(
            user,
            gym_platform::application::subscriptions::CreateSubscriptionCommand {
                plan_id: plan.id,
                origin_branch_id: None,
                preferred_payment_method: None,
                auto_renew: false,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn plan_upgrade_flow_after_refund() {
    let world = World::new().await;
    let user = UserId::new(5);

    let basic = world
        .create_plan("Basic", 5000.0, AccessType::Limited, &["yoga", "spinning"])
        .await;
    let premium = world
        .create_plan("Premium", 9000.0, AccessType::Full, &[])
        .await;
    let funcional = world.create_activity("Funcional", "funcional", 10).await;

    // Basic subscription, paid and active.
    let sub = world.subscribe(user, basic.id).await;
    let payment = world
        .pay_and_activate(user, &sub.id.to_string(), 5000.0)
        .await;

    // The plan does not cover the activity.
    let err = world
        .enrollments
        .enroll(user, funcional, "t")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PlanRestriction);

    // Refund: payment.refunded cancels the subscription downstream.
    world.payments.refund(payment.id, 5000.0).await.unwrap();
    let cancelled = world.subscriptions.get(sub.id).await.unwrap();
    assert_eq!(cancelled.state, SubscriptionState::Cancelled);
    assert!(world.subscriptions.get_active_by_user(user).await.is_err());

    // With the old subscription terminal, a premium one can be created
    // and activated.
    let upgraded = world.subscribe(user, premium.id).await;
    world
        .pay_and_activate(user, &upgraded.id.to_string(), 9000.0)
        .await;

    // The previously-rejected enrollment now succeeds.
    let enrollment = world.enrollments.enroll(user, funcional, "t").await.unwrap();
    assert!(enrollment.active);
}

#[tokio::test]
async fn activation_restarts_billing_window() {
    let world = World::new().await;
    let user = UserId::new(2);
    let plan = world
        .create_plan("Basic", 5000.0, AccessType::Full, &[])
        .await;
    let sub = world.subscribe(user, plan.id).await;
    let created_expiry = sub.expiry_date;

    world.pay_and_activate(user, &sub.id.to_string(), 5000.0).await;

    let active = world.subscriptions.get(sub.id).await.unwrap();
    assert!(active.start_date >= sub.start_date);
    assert!(active.expiry_date >= created_expiry);
    assert_eq!(active.renewal_history.len(), 1);
    assert_eq!(active.renewal_history[0].amount, 5000.0);
}

#[tokio::test]
async fn cancelling_pending_subscription_needs_no_payment() {
    let world = World::new().await;
    let user = UserId::new(3);
    let plan = world
        .create_plan("Basic", 5000.0, AccessType::Full, &[])
        .await;
    let sub = world.subscribe(user, plan.id).await;

    world.subscriptions.cancel(sub.id).await.unwrap();
    let cancelled = world.subscriptions.get(sub.id).await.unwrap();
    assert_eq!(cancelled.state, SubscriptionState::Cancelled);

    // A new subscription may be created afterwards.
    assert!(world
        .subscriptions
        .create(
            user,
            gym_platform::application::subscriptions::CreateSubscriptionCommand {
                plan_id: plan.id,
                origin_branch_id: None,
                preferred_payment_method: None,
                auto_renew: false,
                notes: None,
            },
        )
        .await
        .is_ok());
}
