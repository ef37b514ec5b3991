//! Payment DTOs.

use serde::Deserialize;

use crate::domain::foundation::{DomainError, EventMetadata};
use crate::domain::payments::{EntityType, PaymentStatus};

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub entity_type: String,
    pub entity_id: String,
    /// Defaults to the caller; admins may create for other users.
    #[serde(default)]
    pub user_id: Option<i64>,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub payment_method: String,
    pub payment_gateway: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub metadata: EventMetadata,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl CreatePaymentRequest {
    pub fn entity_type(&self) -> Result<EntityType, DomainError> {
        EntityType::parse(&self.entity_type).ok_or_else(|| {
            DomainError::validation(format!(
                "entity_type must be 'subscription' or 'inscription', got '{}'",
                self.entity_type
            ))
        })
    }
}

fn default_currency() -> String {
    "ARS".to_string()
}

#[derive(Debug, Deserialize)]
pub struct RecurringPaymentRequest {
    #[serde(flatten)]
    pub payment: CreatePaymentRequest,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    #[serde(default = "default_frequency_type")]
    pub frequency_type: String,
}

fn default_frequency() -> u32 {
    1
}

fn default_frequency_type() -> String {
    "months".to_string()
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub status: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl UpdatePaymentStatusRequest {
    pub fn status(&self) -> Result<PaymentStatus, DomainError> {
        PaymentStatus::parse(&self.status)
            .ok_or_else(|| DomainError::validation(format!("unknown status: {}", self.status)))
    }
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct EntityQuery {
    pub entity_type: String,
    pub entity_id: String,
}
