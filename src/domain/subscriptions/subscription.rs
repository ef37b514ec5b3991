//! Subscription aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    BranchId, DomainError, PlanId, StateMachine, SubscriptionId, Timestamp, UserId,
};
use crate::domain::plans::Plan;

use super::SubscriptionState;

/// One renewal: when it happened, which payment backed it, how much.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Renewal {
    pub date: Timestamp,
    pub payment_id: String,
    pub amount: f64,
}

/// A user's ongoing right to enroll, anchored to a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
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

impl Subscription {
    /// Creates a subscription awaiting its first payment.
    ///
    /// `expiry_date` is provisional (`now + plan.duration_days`); it is
    /// recomputed when the activating payment lands.
    pub fn create(
        user_id: UserId,
        plan: &Plan,
        origin_branch_id: Option<BranchId>,
        preferred_payment_method: Option<String>,
        auto_renew: bool,
        notes: Option<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            user_id,
            plan_id: plan.id,
            origin_branch_id,
            start_date: now,
            expiry_date: now.add_days(plan.duration_days as i64),
            state: SubscriptionState::PendingPayment,
            payment_id: None,
            auto_renew,
            preferred_payment_method,
            notes: notes.unwrap_or_default(),
            renewal_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Observable "active" predicate: state is `active` and the expiry
    /// date lies in the future. Expiry is never written eagerly.
    pub fn is_active_now(&self) -> bool {
        self.state == SubscriptionState::Active && !self.expiry_date.is_past()
    }

    /// Activates on a completed payment.
    ///
    /// Restarts the billing window from now using the plan duration and
    /// records the payment. Activating an already-active subscription is
    /// a no-op success (redelivered events).
    pub fn activate(
        &mut self,
        payment_id: &str,
        duration_days: Option<u32>,
        amount: f64,
    ) -> Result<(), DomainError> {
        if self.state == SubscriptionState::Active {
            return Ok(());
        }
        self.transition(SubscriptionState::Active)?;

        let now = Timestamp::now();
        self.payment_id = Some(payment_id.to_string());
        self.start_date = now;
        if let Some(days) = duration_days {
            self.expiry_date = now.add_days(days as i64);
        }
        self.renewal_history.push(Renewal {
            date: now,
            payment_id: payment_id.to_string(),
            amount,
        });
        self.updated_at = now;
        Ok(())
    }

    /// Records a failed payment attempt while awaiting payment.
    ///
    /// Active subscriptions absorb late failure events untouched.
    pub fn register_payment_failure(&mut self, payment_id: &str) -> Result<(), DomainError> {
        if self.state != SubscriptionState::PendingPayment {
            return Ok(());
        }
        self.transition(SubscriptionState::PaymentFailed)?;
        self.append_note(&format!("payment failed: {}", payment_id));
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Cancels the subscription (user action or refund fallout).
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        if self.state == SubscriptionState::Cancelled {
            return Ok(());
        }
        self.transition(SubscriptionState::Cancelled)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Cancels because the backing payment was refunded.
    pub fn cancel_by_refund(&mut self, payment_id: &str) -> Result<(), DomainError> {
        self.cancel()?;
        self.append_note(&format!("refund processed: {}", payment_id));
        Ok(())
    }

    fn transition(&mut self, target: SubscriptionState) -> Result<(), DomainError> {
        self.state = self
            .state
            .transition_to(target)
            .map_err(|e| DomainError::conflict(e.to_string()))?;
        Ok(())
    }

    fn append_note(&mut self, note: &str) {
        if self.notes.is_empty() {
            self.notes = note.to_string();
        } else {
            self.notes.push('\n');
            self.notes.push_str(note);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plans::{AccessType, NewPlan};

    fn plan() -> Plan {
        NewPlan::validate("Basic", "", 5000.0, AccessType::Limited, 30, vec!["yoga".into()])
            .unwrap()
            .into_plan()
    }

    fn pending() -> Subscription {
        Subscription::create(UserId::new(1), &plan(), None, Some("cash".into()), false, None)
    }

    #[test]
    fn create_starts_pending_with_empty_history() {
        let sub = pending();
        assert_eq!(sub.state, SubscriptionState::PendingPayment);
        assert!(sub.renewal_history.is_empty());
        assert!(sub.payment_id.is_none());
        assert!(sub.expiry_date.is_after(&sub.start_date));
    }

    #[test]
    fn activation_records_payment_and_renewal() {
        let mut sub = pending();
        sub.activate("pay-1", Some(30), 5000.0).unwrap();

        assert_eq!(sub.state, SubscriptionState::Active);
        assert_eq!(sub.payment_id.as_deref(), Some("pay-1"));
        assert_eq!(sub.renewal_history.len(), 1);
        assert!(sub.is_active_now());
    }

    #[test]
    fn activation_is_idempotent() {
        let mut sub = pending();
        sub.activate("pay-1", Some(30), 5000.0).unwrap();
        sub.activate("pay-1", Some(30), 5000.0).unwrap();
        assert_eq!(sub.renewal_history.len(), 1);
    }

    #[test]
    fn failed_payment_moves_pending_to_payment_failed() {
        let mut sub = pending();
        sub.register_payment_failure("pay-bad").unwrap();
        assert_eq!(sub.state, SubscriptionState::PaymentFailed);
        assert!(sub.notes.contains("pay-bad"));
    }

    #[test]
    fn late_failure_does_not_demote_active() {
        let mut sub = pending();
        sub.activate("pay-1", Some(30), 5000.0).unwrap();
        sub.register_payment_failure("pay-late").unwrap();
        assert_eq!(sub.state, SubscriptionState::Active);
    }

    #[test]
    fn payment_failed_can_retry_to_active() {
        let mut sub = pending();
        sub.register_payment_failure("pay-bad").unwrap();
        sub.activate("pay-retry", Some(30), 5000.0).unwrap();
        assert_eq!(sub.state, SubscriptionState::Active);
    }

    #[test]
    fn refund_cancels_and_notes() {
        let mut sub = pending();
        sub.activate("pay-1", Some(30), 5000.0).unwrap();
        sub.cancel_by_refund("pay-1").unwrap();
        assert_eq!(sub.state, SubscriptionState::Cancelled);
        assert!(sub.notes.contains("refund processed"));
    }

    #[test]
    fn cancel_twice_is_noop() {
        let mut sub = pending();
        sub.cancel().unwrap();
        sub.cancel().unwrap();
        assert_eq!(sub.state, SubscriptionState::Cancelled);
    }

    #[test]
    fn expired_subscription_is_not_active_now() {
        let mut sub = pending();
        sub.activate("pay-1", Some(30), 5000.0).unwrap();
        sub.expiry_date = Timestamp::now().add_days(-1);
        assert!(!sub.is_active_now());
    }
}
