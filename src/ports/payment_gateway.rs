//! Payment gateway ports.
//!
//! A gateway is an external payment processor integration. One-shot
//! charges and recurring billing are separate traits so an adapter never
//! has to answer "unsupported operation" at runtime: the factory hands
//! out only the capability set the named gateway actually implements.
//!
//! Status mapping is gateway-private - each adapter translates its
//! native vocabulary into [`GatewayStatus`] before anything crosses this
//! boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::{DomainError, EventMetadata, Timestamp};
use crate::domain::payments::PaymentStatus;

/// Canonical status vocabulary across all gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl GatewayStatus {
    /// Projects onto the payment record's status. A cancelled gateway
    /// payment is recorded as failed.
    pub fn as_payment_status(&self) -> PaymentStatus {
        match self {
            GatewayStatus::Pending => PaymentStatus::Pending,
            GatewayStatus::Completed => PaymentStatus::Completed,
            GatewayStatus::Failed | GatewayStatus::Cancelled => PaymentStatus::Failed,
            GatewayStatus::Refunded => PaymentStatus::Refunded,
        }
    }
}

/// Gateway-agnostic request to charge a customer once.
#[derive(Debug, Clone)]
pub struct GatewayPaymentRequest {
    pub amount: f64,
    pub currency: String,
    pub description: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub payment_method: String,
    /// Our payment id, for reconciliation from the gateway side.
    pub external_id: String,
    pub customer_id: String,
    pub callback_url: Option<String>,
    pub webhook_url: Option<String>,
    pub metadata: EventMetadata,
}

/// Result of creating a payment at the gateway.
#[derive(Debug, Clone)]
pub struct GatewayPaymentResult {
    pub transaction_id: String,
    pub status: GatewayStatus,
    /// URL the customer completes the payment at, when applicable.
    pub payment_url: Option<String>,
    pub message: String,
}

/// Point-in-time status of a gateway payment.
#[derive(Debug, Clone)]
pub struct GatewayPaymentStatus {
    pub transaction_id: String,
    pub status: GatewayStatus,
    pub amount: f64,
    pub currency: String,
    pub status_detail: Option<String>,
    pub processed_at: Option<Timestamp>,
}

/// Result of a refund at the gateway.
#[derive(Debug, Clone)]
pub struct GatewayRefund {
    pub refund_id: String,
    pub transaction_id: String,
    pub amount: f64,
    pub status: GatewayStatus,
}

/// Canonical webhook notification after gateway-private parsing.
#[derive(Debug, Clone)]
pub struct GatewayWebhookEvent {
    pub event_type: String,
    pub transaction_id: String,
    pub status: GatewayStatus,
    pub amount: f64,
    pub currency: String,
}

/// One-shot payment capability set.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Stable identifier the factory selects on ("mercadopago", "cash").
    fn name(&self) -> &'static str;

    async fn create_payment(
        &self,
        request: GatewayPaymentRequest,
    ) -> Result<GatewayPaymentResult, DomainError>;

    async fn payment_status(
        &self,
        transaction_id: &str,
    ) -> Result<GatewayPaymentStatus, DomainError>;

    async fn refund_payment(
        &self,
        transaction_id: &str,
        amount: f64,
    ) -> Result<GatewayRefund, DomainError>;

    async fn cancel_payment(&self, transaction_id: &str) -> Result<(), DomainError>;

    /// Parses an inbound webhook into the canonical event. A
    /// `Validation` error means the payload was unparseable and the HTTP
    /// layer may answer 400; anything parseable must produce an event.
    async fn process_webhook(
        &self,
        payload: &[u8],
        headers: &HashMap<String, String>,
    ) -> Result<GatewayWebhookEvent, DomainError>;

    async fn validate_credentials(&self) -> Result<(), DomainError>;
}

/// Recurring billing request (preapproval / subscription).
#[derive(Debug, Clone)]
pub struct RecurringRequest {
    pub reason: String,
    pub amount: f64,
    pub currency: String,
    /// Charge every `frequency` units of `frequency_type`.
    pub frequency: u32,
    /// `days`, `weeks`, or `months`.
    pub frequency_type: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub customer_id: String,
    pub external_id: String,
    pub metadata: EventMetadata,
}

/// Result of creating a recurring billing agreement.
#[derive(Debug, Clone)]
pub struct RecurringResult {
    pub subscription_id: String,
    pub status: GatewayStatus,
    /// URL where the customer authorizes the recurring charge.
    pub init_point: Option<String>,
    pub message: String,
}

/// Port for resolving a gateway name to a configured adapter.
///
/// The two creation methods keep the one-shot and recurring capability
/// sets apart; asking for a recurring gateway that only supports
/// one-shot charges fails here, at selection time.
pub trait GatewayProvider: Send + Sync {
    fn create(&self, name: &str) -> Result<std::sync::Arc<dyn PaymentGateway>, DomainError>;

    fn create_recurring(
        &self,
        name: &str,
    ) -> Result<std::sync::Arc<dyn RecurringGateway>, DomainError>;

    fn supports(&self, name: &str) -> bool;
}

/// Canonical recurring-billing webhook notification.
#[derive(Debug, Clone)]
pub struct RecurringWebhookEvent {
    pub event_type: String,
    pub subscription_id: String,
    pub status: GatewayStatus,
}

/// Recurring billing capability set.
#[async_trait]
pub trait RecurringGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_subscription(
        &self,
        request: RecurringRequest,
    ) -> Result<RecurringResult, DomainError>;

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), DomainError>;

    async fn pause_subscription(&self, subscription_id: &str) -> Result<(), DomainError>;

    async fn resume_subscription(&self, subscription_id: &str) -> Result<(), DomainError>;

    /// Parses an inbound recurring-billing webhook into the canonical
    /// event.
    async fn process_subscription_webhook(
        &self,
        payload: &[u8],
        headers: &HashMap<String, String>,
    ) -> Result<RecurringWebhookEvent, DomainError>;

    async fn validate_credentials(&self) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_status_projects_onto_payment_status() {
        assert_eq!(GatewayStatus::Pending.as_payment_status(), PaymentStatus::Pending);
        assert_eq!(GatewayStatus::Completed.as_payment_status(), PaymentStatus::Completed);
        assert_eq!(GatewayStatus::Failed.as_payment_status(), PaymentStatus::Failed);
        assert_eq!(GatewayStatus::Cancelled.as_payment_status(), PaymentStatus::Failed);
        assert_eq!(GatewayStatus::Refunded.as_payment_status(), PaymentStatus::Refunded);
    }

    #[allow(dead_code)]
    fn gateway_is_object_safe(_: &dyn PaymentGateway) {}

    #[allow(dead_code)]
    fn recurring_gateway_is_object_safe(_: &dyn RecurringGateway) {}
}
