//! Payment aggregate.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, EventMetadata, PaymentId, StateMachine, Timestamp, UserId,
};

use super::PaymentStatus;

/// What a payment pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Subscription,
    Inscription,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Subscription => "subscription",
            EntityType::Inscription => "inscription",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "subscription" => Some(EntityType::Subscription),
            "inscription" => Some(EntityType::Inscription),
            _ => None,
        }
    }
}

/// One-shot charge or recurring billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    OneTime,
    Recurring,
}

/// A payment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub user_id: UserId,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub payment_gateway: String,
    pub payment_type: PaymentType,
    /// Caller-supplied key making creation safe under retries. Unique
    /// across the whole store when present.
    pub idempotency_key: Option<String>,
    /// Gateway-assigned transaction reference.
    pub transaction_id: Option<String>,
    pub metadata: EventMetadata,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Set exactly once, when the payment first reaches `completed`.
    pub processed_at: Option<Timestamp>,
}

impl Payment {
    /// Applies a status transition, stamping `processed_at` on the first
    /// arrival at `completed`.
    ///
    /// Returns `true` when the status actually changed; callers publish
    /// events only on observed changes.
    pub fn apply_status(
        &mut self,
        target: PaymentStatus,
        transaction_id: Option<&str>,
    ) -> Result<bool, DomainError> {
        if let Some(tx) = transaction_id {
            if !tx.is_empty() {
                self.transaction_id = Some(tx.to_string());
            }
        }

        if self.status == target {
            return Ok(false);
        }

        self.status = self
            .status
            .transition_to(target)
            .map_err(|e| DomainError::conflict(e.to_string()))?;
        self.updated_at = Timestamp::now();
        if self.status == PaymentStatus::Completed && self.processed_at.is_none() {
            self.processed_at = Some(self.updated_at);
        }
        Ok(true)
    }

    /// Validates a refund request: only completed payments with a
    /// gateway transaction can be refunded, and never for more than the
    /// original amount.
    pub fn validate_refund(&self, amount: f64) -> Result<(), DomainError> {
        if self.status != PaymentStatus::Completed {
            return Err(DomainError::validation(
                "only completed payments can be refunded",
            ));
        }
        if self.transaction_id.as_deref().unwrap_or("").is_empty() {
            return Err(DomainError::validation(
                "payment has no transaction id to refund against",
            ));
        }
        if amount <= 0.0 {
            return Err(DomainError::validation("refund amount must be positive"));
        }
        if amount > self.amount {
            return Err(DomainError::validation(
                "refund amount exceeds the payment amount",
            ));
        }
        Ok(())
    }
}

/// Validated payment creation input.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub user_id: UserId,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub payment_gateway: String,
    pub payment_type: PaymentType,
    pub idempotency_key: Option<String>,
    pub metadata: EventMetadata,
}

impl NewPayment {
    #[allow(clippy::too_many_arguments)]
    pub fn validate(
        entity_type: EntityType,
        entity_id: &str,
        user_id: UserId,
        amount: f64,
        currency: &str,
        payment_method: &str,
        payment_gateway: &str,
        payment_type: PaymentType,
        idempotency_key: Option<String>,
        metadata: EventMetadata,
    ) -> Result<Self, DomainError> {
        if entity_id.trim().is_empty() {
            return Err(DomainError::validation("entity id is required"));
        }
        if amount <= 0.0 {
            return Err(DomainError::validation("amount must be positive"));
        }
        if currency.trim().is_empty() {
            return Err(DomainError::validation("currency is required"));
        }

        // Empty keys are treated as absent so retried clients that send
        // "" do not all collide on one key.
        let idempotency_key = idempotency_key.filter(|k| !k.trim().is_empty());

        Ok(Self {
            entity_type,
            entity_id: entity_id.trim().to_string(),
            user_id,
            amount,
            currency: currency.trim().to_string(),
            payment_method: payment_method.trim().to_string(),
            payment_gateway: payment_gateway.trim().to_string(),
            payment_type,
            idempotency_key,
            metadata,
        })
    }

    /// Materializes a pending payment record.
    pub fn into_payment(self) -> Payment {
        let now = Timestamp::now();
        Payment {
            id: PaymentId::new(),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            user_id: self.user_id,
            amount: self.amount,
            currency: self.currency,
            status: PaymentStatus::Pending,
            payment_method: self.payment_method,
            payment_gateway: self.payment_gateway,
            payment_type: self.payment_type,
            idempotency_key: self.idempotency_key,
            transaction_id: None,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
            processed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Payment {
        NewPayment::validate(
            EntityType::Subscription,
            "sub-1",
            UserId::new(3),
            1000.0,
            "ARS",
            "cash",
            "cash",
            PaymentType::OneTime,
            Some("K1".into()),
            EventMetadata::new(),
        )
        .unwrap()
        .into_payment()
    }

    #[test]
    fn creation_starts_pending_without_processed_at() {
        let payment = pending();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.processed_at.is_none());
        assert_eq!(payment.idempotency_key.as_deref(), Some("K1"));
    }

    #[test]
    fn blank_idempotency_key_is_dropped() {
        let payment = NewPayment::validate(
            EntityType::Subscription,
            "sub-1",
            UserId::new(3),
            1000.0,
            "ARS",
            "cash",
            "cash",
            PaymentType::OneTime,
            Some("   ".into()),
            EventMetadata::new(),
        )
        .unwrap();
        assert!(payment.idempotency_key.is_none());
    }

    #[test]
    fn completion_stamps_processed_at_once() {
        let mut payment = pending();
        let changed = payment.apply_status(PaymentStatus::Completed, Some("TX1")).unwrap();
        assert!(changed);
        let stamped = payment.processed_at.expect("processed_at set");

        // Re-applying the same status is a no-change success.
        let changed = payment.apply_status(PaymentStatus::Completed, None).unwrap();
        assert!(!changed);
        assert_eq!(payment.processed_at, Some(stamped));
    }

    #[test]
    fn completed_rejects_demotion() {
        let mut payment = pending();
        payment.apply_status(PaymentStatus::Completed, Some("TX1")).unwrap();
        assert!(payment.apply_status(PaymentStatus::Pending, None).is_err());
        assert!(payment.apply_status(PaymentStatus::Failed, None).is_err());
    }

    #[test]
    fn refund_requires_completed_with_transaction() {
        let mut payment = pending();
        assert!(payment.validate_refund(500.0).is_err());

        payment.apply_status(PaymentStatus::Completed, Some("TX1")).unwrap();
        assert!(payment.validate_refund(500.0).is_ok());
        assert!(payment.validate_refund(1000.0).is_ok());
        assert!(payment.validate_refund(1000.01).is_err());
        assert!(payment.validate_refund(0.0).is_err());
    }

    #[test]
    fn rejects_non_positive_amount() {
        assert!(NewPayment::validate(
            EntityType::Inscription,
            "3",
            UserId::new(1),
            0.0,
            "ARS",
            "card",
            "mercadopago",
            PaymentType::OneTime,
            None,
            EventMetadata::new(),
        )
        .is_err());
    }
}
