//! Cross-service subscription verification port.
//!
//! The enrollment transaction asks the subscription service whether the
//! caller holds an active subscription, forwarding the caller's bearer
//! token. The HTTP adapter carries a 5-second timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, UserId};

/// Plan details attached to a verified subscription. May be absent when
/// the plan lookup fails transiently; category gating then only passes
/// for full-access defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedPlan {
    pub id: String,
    pub name: String,
    pub access_type: String,
    #[serde(default)]
    pub allowed_activity_categories: Vec<String>,
}

impl VerifiedPlan {
    /// Case-insensitive category permission, `full` plans permit all.
    pub fn permits_category(&self, category: &str) -> bool {
        if self.access_type == "full" {
            return true;
        }
        self.allowed_activity_categories
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(category))
    }
}

/// The peer service's answer for an active subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedSubscription {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub state: String,
    #[serde(default)]
    pub plan: Option<VerifiedPlan>,
}

/// Port for the subscription check inside the enrollment transaction.
///
/// Error mapping is part of the contract: no active subscription maps to
/// `SubscriptionInactive`, peer failures to `UpstreamUnavailable`.
#[async_trait]
pub trait SubscriptionLookup: Send + Sync {
    async fn active_subscription(
        &self,
        user_id: UserId,
        bearer_token: &str,
    ) -> Result<VerifiedSubscription, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_access_plan_permits_everything() {
        let plan = VerifiedPlan {
            id: "p".into(),
            name: "Premium".into(),
            access_type: "full".into(),
            allowed_activity_categories: vec![],
        };
        assert!(plan.permits_category("funcional"));
    }

    #[test]
    fn limited_plan_checks_categories_case_insensitively() {
        let plan = VerifiedPlan {
            id: "p".into(),
            name: "Basic".into(),
            access_type: "limited".into(),
            allowed_activity_categories: vec!["Yoga".into(), "spinning".into()],
        };
        assert!(plan.permits_category("yoga"));
        assert!(plan.permits_category("SPINNING"));
        assert!(!plan.permits_category("funcional"));
    }
}
