//! Plan & subscription DTOs.

use serde::Deserialize;

use crate::domain::foundation::DomainError;
use crate::domain::plans::AccessType;

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub monthly_price: f64,
    pub access_type: String,
    pub duration_days: u32,
    #[serde(default)]
    pub allowed_activity_categories: Vec<String>,
}

impl PlanRequest {
    pub fn access_type(&self) -> Result<AccessType, DomainError> {
        match self.access_type.as_str() {
            "full" => Ok(AccessType::Full),
            "limited" => Ok(AccessType::Limited),
            other => Err(DomainError::validation(format!(
                "access_type must be 'full' or 'limited', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TogglePlanRequest {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListPlansQuery {
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_desc: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub plan_id: String,
    #[serde(default)]
    pub origin_branch_id: Option<i64>,
    #[serde(default)]
    pub preferred_payment_method: Option<String>,
    #[serde(default)]
    pub auto_renew: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionStatusRequest {
    pub state: String,
    #[serde(default)]
    pub payment_id: Option<String>,
}
