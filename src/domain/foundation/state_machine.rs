//! State machine trait for lifecycle status enums.
//!
//! Subscription and payment statuses both follow explicit transition
//! tables; this trait gives them a shared, validated transition API.

use thiserror::Error;

/// Returned when a transition is not in the status enum's table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: String,
    pub to: String,
}

/// Trait for status enums that represent state machines.
///
/// Implementors declare the transition table; `transition_to` validates
/// against it. A transition to the current state is treated as a no-op
/// success so that redelivered events do not error.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if a transition from self to target is allowed.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all states reachable from the current one.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs a validated transition.
    ///
    /// Transitioning to the current state succeeds without change,
    /// which keeps event handlers idempotent under redelivery.
    fn transition_to(&self, target: Self) -> Result<Self, InvalidTransition> {
        if *self == target || self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(InvalidTransition {
                from: format!("{:?}", self),
                to: format!("{:?}", target),
            })
        }
    }

    /// True when no outgoing transitions exist.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phase {
        Open,
        Closed,
        Archived,
    }

    impl StateMachine for Phase {
        fn can_transition_to(&self, target: &Self) -> bool {
            use Phase::*;
            matches!((self, target), (Open, Closed) | (Closed, Archived))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Phase::*;
            match self {
                Open => vec![Closed],
                Closed => vec![Archived],
                Archived => vec![],
            }
        }
    }

    #[test]
    fn valid_transition_succeeds() {
        assert_eq!(Phase::Open.transition_to(Phase::Closed), Ok(Phase::Closed));
    }

    #[test]
    fn invalid_transition_errors() {
        let err = Phase::Open.transition_to(Phase::Archived).unwrap_err();
        assert!(err.to_string().contains("Open"));
        assert!(err.to_string().contains("Archived"));
    }

    #[test]
    fn self_transition_is_noop_success() {
        assert_eq!(Phase::Closed.transition_to(Phase::Closed), Ok(Phase::Closed));
        assert_eq!(
            Phase::Archived.transition_to(Phase::Archived),
            Ok(Phase::Archived)
        );
    }

    #[test]
    fn terminal_state_detected() {
        assert!(Phase::Archived.is_terminal());
        assert!(!Phase::Open.is_terminal());
    }
}
