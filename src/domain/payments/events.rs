//! Payment event payloads.
//!
//! Published by the payment service on every material state change and
//! consumed by the subscription service. Routing key:
//! `payment.<action>.<entity_type>`.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::foundation::{EventEnvelope, EventMetadata};

use super::{Payment, PaymentStatus};

/// Full payment snapshot carried in `payment.*` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub payment_id: String,
    pub status: String,
    pub entity_type: String,
    pub entity_id: String,
    pub user_id: i64,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub payment_gateway: String,
}

impl PaymentEvent {
    /// Snapshot of a payment with an explicit action-level status (the
    /// refunded event reports the refunded amount, not the original).
    pub fn snapshot(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id.to_string(),
            status: payment.status.as_str().to_string(),
            entity_type: payment.entity_type.as_str().to_string(),
            entity_id: payment.entity_id.clone(),
            user_id: payment.user_id.as_i64(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            transaction_id: payment.transaction_id.clone(),
            payment_gateway: payment.payment_gateway.clone(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed.as_str()
    }

    pub fn is_refunded(&self) -> bool {
        self.status == PaymentStatus::Refunded.as_str()
    }
}

/// Builds the envelope for a payment lifecycle event.
///
/// `action` is one of `created`, `completed`, `failed`, `refunded`; the
/// routing key appends the paid entity's type so subscribers can bind
/// `payment.*.subscription` and friends.
pub fn payment_envelope(action: &str, payment: &Payment, metadata: EventMetadata) -> EventEnvelope {
    let snapshot = PaymentEvent::snapshot(payment);
    EventEnvelope::new(
        format!("payment.{}", action),
        "payment",
        payment.id.to_string(),
        json!(snapshot),
    )
    .with_routing_key(format!(
        "payment.{}.{}",
        action,
        payment.entity_type.as_str()
    ))
    .with_metadata(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::domain::payments::{EntityType, NewPayment, PaymentType};

    fn payment() -> Payment {
        let mut payment = NewPayment::validate(
            EntityType::Subscription,
            "sub-9",
            UserId::new(4),
            5000.0,
            "ARS",
            "cash",
            "cash",
            PaymentType::OneTime,
            None,
            EventMetadata::new(),
        )
        .unwrap()
        .into_payment();
        payment.apply_status(PaymentStatus::Completed, Some("TX9")).unwrap();
        payment
    }

    #[test]
    fn routing_key_carries_paid_entity_type() {
        let envelope = payment_envelope("completed", &payment(), EventMetadata::new());
        assert_eq!(envelope.routing_key(), "payment.completed.subscription");
        assert_eq!(envelope.action, "payment.completed");
        assert_eq!(envelope.entity_type, "payment");
    }

    #[test]
    fn snapshot_round_trips_through_envelope_data() {
        let payment = payment();
        let envelope = payment_envelope("completed", &payment, EventMetadata::new());
        let event: PaymentEvent = envelope.data_as().unwrap();

        assert_eq!(event.payment_id, payment.id.to_string());
        assert_eq!(event.entity_id, "sub-9");
        assert_eq!(event.user_id, 4);
        assert!(event.is_completed());
        assert!(!event.is_refunded());
        assert_eq!(event.transaction_id.as_deref(), Some("TX9"));
    }
}
