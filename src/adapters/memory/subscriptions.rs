//! In-memory subscription repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, SubscriptionId, UserId};
use crate::domain::subscriptions::{Subscription, SubscriptionState};
use crate::ports::SubscriptionRepository;

pub struct InMemorySubscriptionRepository {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySubscriptionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn create(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.subscriptions
            .write()
            .expect("subscriptions lock poisoned")
            .insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: SubscriptionId) -> Result<Subscription, DomainError> {
        self.subscriptions
            .read()
            .expect("subscriptions lock poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("subscription not found"))
    }

    async fn find_active_by_user(&self, user_id: UserId) -> Result<Subscription, DomainError> {
        self.subscriptions
            .read()
            .expect("subscriptions lock poisoned")
            .values()
            .find(|s| s.user_id == user_id && s.is_active_now())
            .cloned()
            .ok_or_else(|| DomainError::not_found("no active subscription"))
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Subscription>, DomainError> {
        let mut subscriptions: Vec<Subscription> = self
            .subscriptions
            .read()
            .expect("subscriptions lock poisoned")
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        subscriptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subscriptions)
    }

    async fn exists_in_state(
        &self,
        user_id: UserId,
        state: SubscriptionState,
    ) -> Result<bool, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .expect("subscriptions lock poisoned")
            .values()
            .any(|s| s.user_id == user_id && s.state == state))
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut subscriptions = self
            .subscriptions
            .write()
            .expect("subscriptions lock poisoned");
        if !subscriptions.contains_key(&subscription.id) {
            return Err(DomainError::not_found("subscription not found"));
        }
        subscriptions.insert(subscription.id, subscription.clone());
        Ok(())
    }
}
