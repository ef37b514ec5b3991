//! Subscription repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionId, UserId};
use crate::domain::subscriptions::{Subscription, SubscriptionState};

/// Persistence port for subscriptions (document store).
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create(&self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: SubscriptionId) -> Result<Subscription, DomainError>;

    /// The user's currently-active subscription: `state = active` and
    /// `expiry_date > now`. `NotFound` when there is none.
    async fn find_active_by_user(&self, user_id: UserId) -> Result<Subscription, DomainError>;

    /// All subscriptions of a user, newest first.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Subscription>, DomainError>;

    /// Whether the user holds any subscription in the given state.
    /// Backs the single-active-subscription creation preconditions.
    async fn exists_in_state(
        &self,
        user_id: UserId,
        state: SubscriptionState,
    ) -> Result<bool, DomainError>;

    /// Persists the full aggregate (state, payment id, notes, history).
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;
}
