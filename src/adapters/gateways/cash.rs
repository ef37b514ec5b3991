//! Cash gateway: payments settled in person at a branch.
//!
//! No external integration. A cash payment stays `pending` until an
//! admin confirms (or rejects) it at the front desk; the "transaction"
//! is a confirmation code the member presents at the register.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;

use crate::domain::foundation::DomainError;
use crate::ports::{
    GatewayPaymentRequest, GatewayPaymentResult, GatewayPaymentStatus, GatewayRefund,
    GatewayStatus, GatewayWebhookEvent, PaymentGateway,
};

/// How long a member has to show up and pay.
const CASH_VALIDITY_HOURS: i64 = 48;

pub struct CashGateway;

impl CashGateway {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CashGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for CashGateway {
    fn name(&self) -> &'static str {
        "cash"
    }

    async fn create_payment(
        &self,
        request: GatewayPaymentRequest,
    ) -> Result<GatewayPaymentResult, DomainError> {
        if request.amount <= 0.0 {
            return Err(DomainError::validation("amount must be greater than 0"));
        }
        if request.customer_id.is_empty() {
            return Err(DomainError::validation("customer id is required"));
        }

        let transaction_id = format!("CASH-{}-{}", Utc::now().timestamp(), request.customer_id);
        Ok(GatewayPaymentResult {
            transaction_id: transaction_id.clone(),
            status: GatewayStatus::Pending,
            payment_url: None,
            message: format!(
                "cash payment registered, code {}; pay at the branch within {} hours",
                transaction_id, CASH_VALIDITY_HOURS
            ),
        })
    }

    async fn payment_status(
        &self,
        transaction_id: &str,
    ) -> Result<GatewayPaymentStatus, DomainError> {
        if transaction_id.is_empty() {
            return Err(DomainError::validation("transaction id is required"));
        }
        // The register has no remote state; the stored record is the
        // truth and stays pending until an admin confirms it.
        Ok(GatewayPaymentStatus {
            transaction_id: transaction_id.to_string(),
            status: GatewayStatus::Pending,
            amount: 0.0,
            currency: String::new(),
            status_detail: Some("awaiting_cash_payment".into()),
            processed_at: None,
        })
    }

    async fn refund_payment(
        &self,
        transaction_id: &str,
        amount: f64,
    ) -> Result<GatewayRefund, DomainError> {
        if transaction_id.is_empty() {
            return Err(DomainError::validation("transaction id is required"));
        }
        if amount <= 0.0 {
            return Err(DomainError::validation("refund amount must be positive"));
        }

        Ok(GatewayRefund {
            refund_id: format!("REFUND-CASH-{}", Utc::now().timestamp()),
            transaction_id: transaction_id.to_string(),
            amount,
            status: GatewayStatus::Pending,
        })
    }

    async fn cancel_payment(&self, transaction_id: &str) -> Result<(), DomainError> {
        if transaction_id.is_empty() {
            return Err(DomainError::validation("transaction id is required"));
        }
        Ok(())
    }

    async fn process_webhook(
        &self,
        _payload: &[u8],
        _headers: &HashMap<String, String>,
    ) -> Result<GatewayWebhookEvent, DomainError> {
        Err(DomainError::validation("cash payments do not receive webhooks"))
    }

    async fn validate_credentials(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
