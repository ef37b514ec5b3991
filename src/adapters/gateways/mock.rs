//! Mock gateway for tests.
//!
//! Deterministic behavior selected at construction: `Approve` completes
//! everything, `Reject` fails everything. Webhook payloads use the same
//! `{action, data: {id}}` shape real gateways send.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::foundation::DomainError;
use crate::ports::{
    GatewayPaymentRequest, GatewayPaymentResult, GatewayPaymentStatus, GatewayRefund,
    GatewayStatus, GatewayWebhookEvent, PaymentGateway, RecurringGateway, RecurringRequest,
    RecurringResult, RecurringWebhookEvent,
};

/// What the mock does with everything it is asked to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockGatewayBehavior {
    Approve,
    Reject,
}

pub struct MockGateway {
    behavior: MockGatewayBehavior,
    counter: AtomicU64,
}

impl MockGateway {
    pub fn new(behavior: MockGatewayBehavior) -> Self {
        Self {
            behavior,
            counter: AtomicU64::new(0),
        }
    }

    fn outcome(&self) -> GatewayStatus {
        match self.behavior {
            MockGatewayBehavior::Approve => GatewayStatus::Completed,
            MockGatewayBehavior::Reject => GatewayStatus::Failed,
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_payment(
        &self,
        request: GatewayPaymentRequest,
    ) -> Result<GatewayPaymentResult, DomainError> {
        if request.amount <= 0.0 {
            return Err(DomainError::validation("amount must be greater than 0"));
        }
        Ok(GatewayPaymentResult {
            transaction_id: self.next_id("MOCK"),
            status: self.outcome(),
            payment_url: Some("https://mock.gateway/pay".into()),
            message: "mock payment processed".into(),
        })
    }

    async fn payment_status(
        &self,
        transaction_id: &str,
    ) -> Result<GatewayPaymentStatus, DomainError> {
        Ok(GatewayPaymentStatus {
            transaction_id: transaction_id.to_string(),
            status: self.outcome(),
            amount: 0.0,
            currency: "ARS".into(),
            status_detail: None,
            processed_at: None,
        })
    }

    async fn refund_payment(
        &self,
        transaction_id: &str,
        amount: f64,
    ) -> Result<GatewayRefund, DomainError> {
        Ok(GatewayRefund {
            refund_id: self.next_id("MOCK-REFUND"),
            transaction_id: transaction_id.to_string(),
            amount,
            status: GatewayStatus::Refunded,
        })
    }

    async fn cancel_payment(&self, _transaction_id: &str) -> Result<(), DomainError> {
        Ok(())
    }

    async fn process_webhook(
        &self,
        payload: &[u8],
        _headers: &HashMap<String, String>,
    ) -> Result<GatewayWebhookEvent, DomainError> {
        let body: JsonValue = serde_json::from_slice(payload)
            .map_err(|e| DomainError::validation(format!("unparseable webhook payload: {}", e)))?;
        let transaction_id = match &body["data"]["id"] {
            JsonValue::String(id) => id.clone(),
            JsonValue::Number(id) => id.to_string(),
            _ => return Err(DomainError::validation("webhook without data.id")),
        };

        Ok(GatewayWebhookEvent {
            event_type: body["action"].as_str().unwrap_or("payment.updated").to_string(),
            transaction_id,
            status: self.outcome(),
            amount: 0.0,
            currency: "ARS".into(),
        })
    }

    async fn validate_credentials(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[async_trait]
impl RecurringGateway for MockGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_subscription(
        &self,
        request: RecurringRequest,
    ) -> Result<RecurringResult, DomainError> {
        if request.amount <= 0.0 {
            return Err(DomainError::validation("amount must be greater than 0"));
        }
        Ok(RecurringResult {
            subscription_id: self.next_id("MOCK-SUB"),
            status: GatewayStatus::Pending,
            init_point: Some("https://mock.gateway/authorize".into()),
            message: "mock preapproval created".into(),
        })
    }

    async fn cancel_subscription(&self, _subscription_id: &str) -> Result<(), DomainError> {
        Ok(())
    }

    async fn pause_subscription(&self, _subscription_id: &str) -> Result<(), DomainError> {
        Ok(())
    }

    async fn resume_subscription(&self, _subscription_id: &str) -> Result<(), DomainError> {
        Ok(())
    }

    async fn process_subscription_webhook(
        &self,
        payload: &[u8],
        _headers: &HashMap<String, String>,
    ) -> Result<RecurringWebhookEvent, DomainError> {
        let body: JsonValue = serde_json::from_slice(payload)
            .map_err(|e| DomainError::validation(format!("unparseable webhook payload: {}", e)))?;
        let subscription_id = match &body["data"]["id"] {
            JsonValue::String(id) => id.clone(),
            JsonValue::Number(id) => id.to_string(),
            _ => return Err(DomainError::validation("webhook without data.id")),
        };

        Ok(RecurringWebhookEvent {
            event_type: body["action"]
                .as_str()
                .unwrap_or("subscription.updated")
                .to_string(),
            subscription_id,
            status: self.outcome(),
        })
    }

    async fn validate_credentials(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
