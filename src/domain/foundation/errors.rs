//! Error types for the domain layer.

use std::error::Error;
use std::fmt;

/// Semantic error categories visible at the service boundary.
///
/// The HTTP layer maps each kind to a status code; the wire format is a
/// flat message string plus that status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, invalid time range, missing required field.
    Validation,
    /// No token, invalid token, or expired token.
    Authentication,
    /// Token valid but the caller lacks the capability (non-admin, non-owner).
    Authorization,
    /// Referenced entity absent or soft-deleted.
    NotFound,
    /// Duplicate enrollment, duplicate subscription, duplicate username/email.
    Conflict,
    /// The caller's plan does not permit the activity's category.
    PlanRestriction,
    /// The activity has no free places left.
    CapacityExhausted,
    /// The caller has no active subscription.
    SubscriptionInactive,
    /// A peer service timed out or answered non-200.
    UpstreamUnavailable,
    /// Store-level failure.
    Database,
    /// Anything else.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Authentication => "AUTHENTICATION",
            ErrorKind::Authorization => "AUTHORIZATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::PlanRestriction => "PLAN_RESTRICTION",
            ErrorKind::CapacityExhausted => "CAPACITY_EXHAUSTED",
            ErrorKind::SubscriptionInactive => "SUBSCRIPTION_INACTIVE",
            ErrorKind::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorKind::Database => "DATABASE",
            ErrorKind::Internal => "INTERNAL",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error carrying a kind and a human-readable message.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn plan_restriction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PlanRestriction, message)
    }

    pub fn capacity_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapacityExhausted, message)
    }

    pub fn subscription_inactive(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SubscriptionInactive, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamUnavailable, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Returns true when the error represents a missing entity.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = DomainError::not_found("subscription not found");
        assert_eq!(format!("{}", err), "[NOT_FOUND] subscription not found");
    }

    #[test]
    fn constructors_set_expected_kind() {
        assert_eq!(DomainError::validation("x").kind, ErrorKind::Validation);
        assert_eq!(DomainError::conflict("x").kind, ErrorKind::Conflict);
        assert_eq!(
            DomainError::capacity_exhausted("x").kind,
            ErrorKind::CapacityExhausted
        );
        assert_eq!(DomainError::upstream("x").kind, ErrorKind::UpstreamUnavailable);
    }

    #[test]
    fn is_not_found_matches_only_not_found() {
        assert!(DomainError::not_found("x").is_not_found());
        assert!(!DomainError::internal("x").is_not_found());
    }
}
