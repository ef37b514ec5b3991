//! Payment lifecycle states.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Status of a payment record.
///
/// ```text
/// (new) --create--------------> pending
/// pending --gateway completes--> completed
/// pending --gateway fails------> failed
/// pending --admin approve------> completed
/// pending --admin reject-------> failed
/// completed --refund-----------> refunded
/// ```
///
/// `completed` and `refunded` absorb conflicting late events: once money
/// moved, nothing returns the record to `pending` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!((self, target), (Pending, Completed) | (Pending, Failed) | (Completed, Refunded))
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Completed, Failed],
            Completed => vec![Refunded],
            Failed => vec![],
            Refunded => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_resolves_either_way() {
        assert!(PaymentStatus::Pending.can_transition_to(&PaymentStatus::Completed));
        assert!(PaymentStatus::Pending.can_transition_to(&PaymentStatus::Failed));
    }

    #[test]
    fn only_completed_can_refund() {
        assert!(PaymentStatus::Completed.can_transition_to(&PaymentStatus::Refunded));
        assert!(!PaymentStatus::Pending.can_transition_to(&PaymentStatus::Refunded));
        assert!(!PaymentStatus::Failed.can_transition_to(&PaymentStatus::Refunded));
    }

    #[test]
    fn money_never_flows_backwards() {
        assert!(!PaymentStatus::Completed.can_transition_to(&PaymentStatus::Pending));
        assert!(!PaymentStatus::Completed.can_transition_to(&PaymentStatus::Failed));
        assert!(!PaymentStatus::Refunded.can_transition_to(&PaymentStatus::Pending));
        assert!(PaymentStatus::Refunded.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
    }

    #[test]
    fn wire_names_round_trip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("cancelled"), None);
    }
}
