//! Plan entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, PlanId, Timestamp};

/// How much of the activity catalog a plan unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Every activity category is permitted; the allowed set is ignored.
    Full,
    /// Only the categories in `allowed_activity_categories` are permitted.
    Limited,
}

/// A subscription tier: price, duration, and the categories it unlocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    pub description: String,
    pub monthly_price: f64,
    pub access_type: AccessType,
    pub duration_days: u32,
    pub active: bool,
    pub allowed_activity_categories: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Plan {
    /// Whether this plan permits enrolling into the given activity
    /// category. Matching is case-insensitive; full-access plans permit
    /// everything.
    pub fn permits_category(&self, category: &str) -> bool {
        match self.access_type {
            AccessType::Full => true,
            AccessType::Limited => self
                .allowed_activity_categories
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(category)),
        }
    }
}

/// Validated plan creation input.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub name: String,
    pub description: String,
    pub monthly_price: f64,
    pub access_type: AccessType,
    pub duration_days: u32,
    pub allowed_activity_categories: Vec<String>,
}

impl NewPlan {
    pub fn validate(
        name: &str,
        description: &str,
        monthly_price: f64,
        access_type: AccessType,
        duration_days: u32,
        allowed_activity_categories: Vec<String>,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("plan name is required"));
        }
        if monthly_price <= 0.0 {
            return Err(DomainError::validation("monthly price must be positive"));
        }
        if duration_days == 0 {
            return Err(DomainError::validation("duration must be at least one day"));
        }

        Ok(Self {
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            monthly_price,
            access_type,
            duration_days,
            allowed_activity_categories,
        })
    }

    /// Materializes the plan, active by default.
    pub fn into_plan(self) -> Plan {
        let now = Timestamp::now();
        Plan {
            id: PlanId::new(),
            name: self.name,
            description: self.description,
            monthly_price: self.monthly_price,
            access_type: self.access_type,
            duration_days: self.duration_days,
            active: true,
            allowed_activity_categories: self.allowed_activity_categories,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limited_plan(categories: &[&str]) -> Plan {
        NewPlan::validate(
            "Basic",
            "Limited access tier",
            5000.0,
            AccessType::Limited,
            30,
            categories.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap()
        .into_plan()
    }

    #[test]
    fn full_access_permits_any_category() {
        let plan = NewPlan::validate("Premium", "", 9000.0, AccessType::Full, 30, vec![])
            .unwrap()
            .into_plan();
        assert!(plan.permits_category("funcional"));
        assert!(plan.permits_category("anything-at-all"));
    }

    #[test]
    fn limited_access_matches_case_insensitively() {
        let plan = limited_plan(&["Yoga", "spinning"]);
        assert!(plan.permits_category("yoga"));
        assert!(plan.permits_category("YOGA"));
        assert!(plan.permits_category("Spinning"));
        assert!(!plan.permits_category("funcional"));
    }

    #[test]
    fn rejects_non_positive_price() {
        assert!(NewPlan::validate("Basic", "", 0.0, AccessType::Full, 30, vec![]).is_err());
        assert!(NewPlan::validate("Basic", "", -10.0, AccessType::Full, 30, vec![]).is_err());
    }

    #[test]
    fn rejects_zero_duration() {
        assert!(NewPlan::validate("Basic", "", 100.0, AccessType::Full, 0, vec![]).is_err());
    }

    #[test]
    fn new_plan_starts_active() {
        assert!(limited_plan(&["yoga"]).active);
    }
}
