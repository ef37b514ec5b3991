//! Subscription lifecycle states.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Lifecycle state of a subscription.
///
/// ```text
/// pending_payment --payment.completed--> active
/// pending_payment --payment.failed----> payment_failed
/// pending_payment --cancel------------> cancelled
/// active          --cancel------------> cancelled
/// active          --payment.refunded--> cancelled
/// payment_failed  --payment.completed--> active   (retry)
/// ```
///
/// `expired` is observer-evaluated from `expiry_date`, never transitioned
/// into eagerly; it exists so stores and responses can represent it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    PendingPayment,
    Active,
    Cancelled,
    Expired,
    PaymentFailed,
}

impl SubscriptionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionState::PendingPayment => "pending_payment",
            SubscriptionState::Active => "active",
            SubscriptionState::Cancelled => "cancelled",
            SubscriptionState::Expired => "expired",
            SubscriptionState::PaymentFailed => "payment_failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending_payment" => Some(SubscriptionState::PendingPayment),
            "active" => Some(SubscriptionState::Active),
            "cancelled" => Some(SubscriptionState::Cancelled),
            "expired" => Some(SubscriptionState::Expired),
            "payment_failed" => Some(SubscriptionState::PaymentFailed),
            _ => None,
        }
    }
}

impl StateMachine for SubscriptionState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionState::*;
        matches!(
            (self, target),
            (PendingPayment, Active)
                | (PendingPayment, PaymentFailed)
                | (PendingPayment, Cancelled)
                | (Active, Cancelled)
                | (Active, Expired)
                | (PaymentFailed, Active)
                | (PaymentFailed, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionState::*;
        match self {
            PendingPayment => vec![Active, PaymentFailed, Cancelled],
            Active => vec![Cancelled, Expired],
            PaymentFailed => vec![Active, Cancelled],
            Cancelled => vec![],
            Expired => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_activates_on_completed_payment() {
        assert!(SubscriptionState::PendingPayment.can_transition_to(&SubscriptionState::Active));
    }

    #[test]
    fn payment_failed_can_retry_to_active() {
        assert!(SubscriptionState::PaymentFailed.can_transition_to(&SubscriptionState::Active));
    }

    #[test]
    fn cancelled_is_terminal() {
        assert!(SubscriptionState::Cancelled.is_terminal());
        assert!(!SubscriptionState::Cancelled.can_transition_to(&SubscriptionState::Active));
    }

    #[test]
    fn active_cannot_be_demoted_by_failure() {
        // A late payment.failed after activation must not move the state.
        assert!(!SubscriptionState::Active.can_transition_to(&SubscriptionState::PaymentFailed));
    }

    #[test]
    fn wire_names_round_trip() {
        for state in [
            SubscriptionState::PendingPayment,
            SubscriptionState::Active,
            SubscriptionState::Cancelled,
            SubscriptionState::Expired,
            SubscriptionState::PaymentFailed,
        ] {
            assert_eq!(SubscriptionState::parse(state.as_str()), Some(state));
        }
        assert_eq!(SubscriptionState::parse("bogus"), None);
    }
}
