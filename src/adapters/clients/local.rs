//! In-process subscription lookup.
//!
//! Serves the same contract as the HTTP client but straight from the
//! repositories. Used by the integration tests and by single-process
//! deployments where both services share a store.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::plans::AccessType;
use crate::ports::{
    PlanRepository, SubscriptionLookup, SubscriptionRepository, VerifiedPlan,
    VerifiedSubscription,
};

pub struct LocalSubscriptionLookup {
    subscriptions: Arc<dyn SubscriptionRepository>,
    plans: Arc<dyn PlanRepository>,
}

impl LocalSubscriptionLookup {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        plans: Arc<dyn PlanRepository>,
    ) -> Self {
        Self {
            subscriptions,
            plans,
        }
    }
}

#[async_trait]
impl SubscriptionLookup for LocalSubscriptionLookup {
    async fn active_subscription(
        &self,
        user_id: UserId,
        _bearer_token: &str,
    ) -> Result<VerifiedSubscription, DomainError> {
        let subscription = self
            .subscriptions
            .find_active_by_user(user_id)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    DomainError::subscription_inactive("no active subscription")
                } else {
                    err
                }
            })?;

        let plan = self
            .plans
            .find_by_id(subscription.plan_id)
            .await
            .ok()
            .map(|plan| VerifiedPlan {
                id: plan.id.to_string(),
                name: plan.name,
                access_type: match plan.access_type {
                    AccessType::Full => "full".into(),
                    AccessType::Limited => "limited".into(),
                },
                allowed_activity_categories: plan.allowed_activity_categories,
            });

        Ok(VerifiedSubscription {
            id: subscription.id.to_string(),
            user_id: subscription.user_id.to_string(),
            plan_id: subscription.plan_id.to_string(),
            state: subscription.state.as_str().to_string(),
            plan,
        })
    }
}
