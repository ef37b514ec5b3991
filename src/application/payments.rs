//! Payment service.
//!
//! Orchestrates the payment repository, the gateway factory, and the
//! event publisher. Every create path starts with the idempotency-key
//! check: a known key returns the original record with no gateway call
//! and no event - the at-most-once guarantee of the whole platform.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use crate::domain::foundation::{DomainError, EventMetadata, PaymentId, UserId};
use crate::domain::payments::{
    payment_envelope, EntityType, NewPayment, Payment, PaymentStatus, PaymentType,
};
use crate::ports::{
    EventPublisher, GatewayPaymentRequest, GatewayProvider, PaymentRepository, RecurringRequest,
};

/// Payment creation input from the HTTP boundary.
#[derive(Debug, Clone)]
pub struct CreatePaymentCommand {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub user_id: UserId,
    pub amount: f64,
    pub currency: String,
    pub payment_method: String,
    pub payment_gateway: String,
    pub idempotency_key: Option<String>,
    pub metadata: EventMetadata,
    pub callback_url: Option<String>,
    pub webhook_url: Option<String>,
}

/// What the webhook path did with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Payment updated and event published.
    Updated { payment_id: String, status: PaymentStatus },
    /// Notification matched the stored status; nothing to do.
    Unchanged,
    /// No payment carries the reported transaction id. Answered 2xx so
    /// the gateway stops retrying.
    PaymentNotFound,
    /// The reported transition conflicts with a terminal status; logged
    /// and absorbed.
    Ignored,
}

pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    gateways: Arc<dyn GatewayProvider>,
    publisher: Arc<dyn EventPublisher>,
}

impl PaymentService {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        gateways: Arc<dyn GatewayProvider>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            payments,
            gateways,
            publisher,
        }
    }

    /// Records a payment without touching any gateway (manual flows,
    /// cash at the front desk).
    pub async fn create_basic(&self, command: CreatePaymentCommand) -> Result<Payment, DomainError> {
        let new_payment = self.validate(command, PaymentType::OneTime)?;
        if let Some(existing) = self.find_by_key(&new_payment.idempotency_key).await? {
            return Ok(existing);
        }

        let payment = new_payment.into_payment();
        self.payments.create(&payment).await?;
        self.publish_or_log("created", &payment, EventMetadata::new()).await;
        Ok(payment)
    }

    /// Creates a payment and charges it through the named gateway.
    ///
    /// The pending record is durable before the gateway is contacted, so
    /// a gateway failure leaves an auditable `failed` payment behind.
    pub async fn process_one_time(
        &self,
        command: CreatePaymentCommand,
    ) -> Result<Payment, DomainError> {
        let callback_url = command.callback_url.clone();
        let webhook_url = command.webhook_url.clone();
        let new_payment = self.validate(command, PaymentType::OneTime)?;
        if let Some(existing) = self.find_by_key(&new_payment.idempotency_key).await? {
            return Ok(existing);
        }

        let mut payment = new_payment.into_payment();
        self.payments.create(&payment).await?;
        self.publish_or_log("created", &payment, EventMetadata::new()).await;

        let gateway = match self.gateways.create(&payment.payment_gateway) {
            Ok(gateway) => gateway,
            Err(err) => {
                self.mark_failed(&mut payment).await;
                return Err(err);
            }
        };

        let request = GatewayPaymentRequest {
            amount: payment.amount,
            currency: payment.currency.clone(),
            description: format!("{} #{}", payment.entity_type.as_str(), payment.entity_id),
            customer_email: metadata_str(&payment.metadata, "customer_email"),
            customer_name: metadata_str(&payment.metadata, "customer_name"),
            payment_method: payment.payment_method.clone(),
            external_id: payment.id.to_string(),
            customer_id: payment.user_id.to_string(),
            callback_url,
            webhook_url,
            metadata: payment.metadata.clone(),
        };

        let result = match gateway.create_payment(request).await {
            Ok(result) => result,
            Err(err) => {
                self.mark_failed(&mut payment).await;
                return Err(err);
            }
        };

        let changed = payment
            .apply_status(result.status.as_payment_status(), Some(result.transaction_id.as_str()))?;
        self.payments.update(&payment).await?;

        if changed {
            match payment.status {
                PaymentStatus::Completed => {
                    self.publish_or_log("completed", &payment, EventMetadata::new()).await
                }
                PaymentStatus::Failed => {
                    self.publish_or_log("failed", &payment, EventMetadata::new()).await
                }
                _ => {}
            }
        }

        // Response-only enrichment; the stored record stays lean.
        if let Some(url) = result.payment_url {
            payment.metadata.insert("payment_url".into(), json!(url));
        }
        payment
            .metadata
            .insert("gateway_message".into(), json!(result.message));
        Ok(payment)
    }

    /// Creates a recurring billing agreement through the named gateway.
    ///
    /// The gateway's agreement id is stored as the payment's transaction
    /// id; the authorization URL travels back in response metadata.
    pub async fn process_recurring(
        &self,
        command: CreatePaymentCommand,
        frequency: u32,
        frequency_type: &str,
    ) -> Result<Payment, DomainError> {
        let new_payment = self.validate(command, PaymentType::Recurring)?;
        if let Some(existing) = self.find_by_key(&new_payment.idempotency_key).await? {
            return Ok(existing);
        }

        let mut payment = new_payment.into_payment();
        self.payments.create(&payment).await?;
        self.publish_or_log("created", &payment, EventMetadata::new()).await;

        let gateway = match self.gateways.create_recurring(&payment.payment_gateway) {
            Ok(gateway) => gateway,
            Err(err) => {
                self.mark_failed(&mut payment).await;
                return Err(err);
            }
        };

        let request = RecurringRequest {
            reason: format!("{} - {}", payment.entity_type.as_str(), payment.entity_id),
            amount: payment.amount,
            currency: payment.currency.clone(),
            frequency,
            frequency_type: frequency_type.to_string(),
            customer_email: metadata_str(&payment.metadata, "customer_email"),
            customer_name: metadata_str(&payment.metadata, "customer_name"),
            customer_id: payment.user_id.to_string(),
            external_id: payment.id.to_string(),
            metadata: payment.metadata.clone(),
        };

        let result = match gateway.create_subscription(request).await {
            Ok(result) => result,
            Err(err) => {
                self.mark_failed(&mut payment).await;
                return Err(err);
            }
        };

        payment.apply_status(
            result.status.as_payment_status(),
            Some(result.subscription_id.as_str()),
        )?;
        self.payments.update(&payment).await?;

        if let Some(init_point) = result.init_point {
            payment.metadata.insert("init_point".into(), json!(init_point));
        }
        payment
            .metadata
            .insert("gateway_message".into(), json!(result.message));
        payment.metadata.insert("frequency".into(), json!(frequency));
        payment
            .metadata
            .insert("frequency_type".into(), json!(frequency_type));
        Ok(payment)
    }

    pub async fn get(&self, id: PaymentId) -> Result<Payment, DomainError> {
        self.payments.find_by_id(id).await
    }

    pub async fn list_all(&self) -> Result<Vec<Payment>, DomainError> {
        self.payments.find_all().await
    }

    pub async fn get_by_user(&self, user_id: UserId) -> Result<Vec<Payment>, DomainError> {
        self.payments.find_by_user(user_id).await
    }

    pub async fn get_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<Payment>, DomainError> {
        self.payments.find_by_entity(entity_type, entity_id).await
    }

    pub async fn get_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, DomainError> {
        self.payments.find_by_status(status).await
    }

    /// Manual status override (admin paths, cash confirmation).
    ///
    /// Publishes the matching `payment.*` event only when the stored
    /// status actually changed.
    pub async fn update_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<Payment, DomainError> {
        let mut payment = self.payments.find_by_id(id).await?;
        let changed = payment.apply_status(status, transaction_id.as_deref())?;
        self.payments.update(&payment).await?;

        if changed {
            match payment.status {
                PaymentStatus::Completed => {
                    self.publish_or_log("completed", &payment, EventMetadata::new()).await
                }
                PaymentStatus::Failed => {
                    self.publish_or_log("failed", &payment, EventMetadata::new()).await
                }
                PaymentStatus::Refunded => {
                    let mut meta = EventMetadata::new();
                    meta.insert("refund_amount".into(), json!(payment.amount));
                    self.publish_or_log("refunded", &payment, meta).await
                }
                PaymentStatus::Pending => {}
            }
        }
        Ok(payment)
    }

    /// Admin confirmation of a cash payment at the branch.
    pub async fn approve_cash(&self, id: PaymentId) -> Result<Payment, DomainError> {
        self.update_status(id, PaymentStatus::Completed, None).await
    }

    /// Admin rejection of a cash payment.
    pub async fn reject_cash(&self, id: PaymentId) -> Result<Payment, DomainError> {
        self.update_status(id, PaymentStatus::Failed, None).await
    }

    /// Re-reads the gateway's view of a pending payment and adopts it
    /// when it differs.
    pub async fn sync_with_gateway(&self, id: PaymentId) -> Result<Payment, DomainError> {
        let mut payment = self.payments.find_by_id(id).await?;
        let transaction_id = payment
            .transaction_id
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                DomainError::validation("payment has no transaction id, cannot sync")
            })?;

        let gateway = self.gateways.create(&payment.payment_gateway)?;
        let remote = gateway.payment_status(&transaction_id).await?;

        let target = remote.status.as_payment_status();
        if target != payment.status {
            payment.apply_status(target, Some(transaction_id.as_str()))?;
            self.payments.update(&payment).await?;
        }
        Ok(payment)
    }

    /// Refunds a completed payment through its gateway, up to the
    /// original amount, then records the terminal `refunded` status and
    /// publishes `payment.refunded`.
    pub async fn refund(&self, id: PaymentId, amount: f64) -> Result<Payment, DomainError> {
        let mut payment = self.payments.find_by_id(id).await?;
        payment.validate_refund(amount)?;

        let transaction_id = payment
            .transaction_id
            .clone()
            .expect("validate_refund guarantees a transaction id");
        let gateway = self.gateways.create(&payment.payment_gateway)?;
        gateway.refund_payment(&transaction_id, amount).await?;

        payment.apply_status(PaymentStatus::Refunded, Some(transaction_id.as_str()))?;
        self.payments.update(&payment).await?;

        let mut meta = EventMetadata::new();
        meta.insert("refund_amount".into(), json!(amount));
        self.publish_or_log("refunded", &payment, meta).await;
        Ok(payment)
    }

    /// Webhook reconciliation.
    ///
    /// The named gateway parses the payload into a canonical event; the
    /// payment is located by transaction id over the `pending` and
    /// `completed` buckets. Anything parseable yields an `Ok` outcome so
    /// the HTTP layer can answer 2xx and stop gateway retries.
    pub async fn process_webhook(
        &self,
        gateway_name: &str,
        payload: &[u8],
        headers: &HashMap<String, String>,
    ) -> Result<WebhookOutcome, DomainError> {
        if !self.gateways.supports(gateway_name) {
            return Err(DomainError::validation(format!(
                "unsupported gateway: {}",
                gateway_name
            )));
        }

        let gateway = self.gateways.create(gateway_name)?;
        let event = gateway.process_webhook(payload, headers).await?;
        tracing::info!(
            gateway = gateway_name,
            transaction_id = %event.transaction_id,
            status = ?event.status,
            "webhook received"
        );

        let Some(mut payment) = self.find_by_transaction_id(&event.transaction_id).await? else {
            tracing::warn!(
                transaction_id = %event.transaction_id,
                "webhook for unknown payment, acknowledging"
            );
            return Ok(WebhookOutcome::PaymentNotFound);
        };

        let target = event.status.as_payment_status();
        if payment.status == target {
            return Ok(WebhookOutcome::Unchanged);
        }

        match payment.apply_status(target, Some(event.transaction_id.as_str())) {
            Ok(_) => {}
            Err(err) => {
                // Late notification against a terminal status; absorb it.
                tracing::warn!(payment_id = %payment.id, error = %err, "webhook transition ignored");
                return Ok(WebhookOutcome::Ignored);
            }
        }
        self.payments.update(&payment).await?;

        match payment.status {
            PaymentStatus::Completed => {
                self.publish_or_log("completed", &payment, EventMetadata::new()).await
            }
            PaymentStatus::Failed => {
                self.publish_or_log("failed", &payment, EventMetadata::new()).await
            }
            PaymentStatus::Refunded => {
                let mut meta = EventMetadata::new();
                meta.insert("refund_amount".into(), json!(payment.amount));
                self.publish_or_log("refunded", &payment, meta).await
            }
            PaymentStatus::Pending => {}
        }

        Ok(WebhookOutcome::Updated {
            payment_id: payment.id.to_string(),
            status: payment.status,
        })
    }

    fn validate(
        &self,
        command: CreatePaymentCommand,
        payment_type: PaymentType,
    ) -> Result<NewPayment, DomainError> {
        NewPayment::validate(
            command.entity_type,
            &command.entity_id,
            command.user_id,
            command.amount,
            &command.currency,
            &command.payment_method,
            &command.payment_gateway,
            payment_type,
            command.idempotency_key,
            command.metadata,
        )
    }

    async fn find_by_key(&self, key: &Option<String>) -> Result<Option<Payment>, DomainError> {
        let Some(key) = key else { return Ok(None) };
        let existing = self.payments.find_by_idempotency_key(key).await?;
        if let Some(payment) = &existing {
            tracing::warn!(
                idempotency_key = %key,
                payment_id = %payment.id,
                "duplicate payment request, returning original"
            );
        }
        Ok(existing)
    }

    /// Transaction-id lookup over the small-cardinality status buckets.
    /// An index on transaction_id is a store detail; the scan order
    /// (`pending`, then `completed`) matches where webhooks land.
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        for status in [PaymentStatus::Pending, PaymentStatus::Completed] {
            let bucket = self.payments.find_by_status(status).await?;
            if let Some(payment) = bucket
                .into_iter()
                .find(|p| p.transaction_id.as_deref() == Some(transaction_id))
            {
                return Ok(Some(payment));
            }
        }
        Ok(None)
    }

    async fn mark_failed(&self, payment: &mut Payment) {
        if payment.apply_status(PaymentStatus::Failed, None).is_ok() {
            if let Err(err) = self.payments.update(payment).await {
                tracing::error!(payment_id = %payment.id, error = %err, "could not mark payment failed");
            }
        }
    }

    async fn publish_or_log(&self, action: &str, payment: &Payment, metadata: EventMetadata) {
        let event = payment_envelope(action, payment, metadata);
        let key = event.routing_key();
        if let Err(err) = self.publisher.publish(event).await {
            tracing::warn!(routing_key = %key, error = %err, "event publish failed");
        }
    }
}

fn metadata_str(metadata: &EventMetadata, key: &str) -> Option<String> {
    metadata
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::adapters::gateways::{GatewayFactory, MockGatewayBehavior};
    use crate::adapters::memory::InMemoryPaymentRepository;
    use crate::domain::foundation::ErrorKind;

    struct Fixture {
        service: PaymentService,
        bus: Arc<InMemoryEventBus>,
    }

    fn fixture(behavior: MockGatewayBehavior) -> Fixture {
        let bus = Arc::new(InMemoryEventBus::new());
        let service = PaymentService::new(
            Arc::new(InMemoryPaymentRepository::new()),
            Arc::new(GatewayFactory::for_tests(behavior)),
            bus.clone(),
        );
        Fixture { service, bus }
    }

    fn command(key: Option<&str>) -> CreatePaymentCommand {
        CreatePaymentCommand {
            entity_type: EntityType::Subscription,
            entity_id: "sub-1".into(),
            user_id: UserId::new(3),
            amount: 1000.0,
            currency: "ARS".into(),
            payment_method: "credit_card".into(),
            payment_gateway: "mock".into(),
            idempotency_key: key.map(|k| k.to_string()),
            metadata: EventMetadata::new(),
            callback_url: None,
            webhook_url: None,
        }
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_returns_original_without_events() {
        let fx = fixture(MockGatewayBehavior::Approve);

        let first = fx.service.create_basic(command(Some("K1"))).await.unwrap();
        let second = fx.service.create_basic(command(Some("K1"))).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, PaymentStatus::Pending);
        assert_eq!(fx.bus.events_for_key("payment.created.subscription").len(), 1);
        assert_eq!(fx.service.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn idempotency_short_circuits_gateway_processing_too() {
        let fx = fixture(MockGatewayBehavior::Approve);

        let first = fx.service.process_one_time(command(Some("K2"))).await.unwrap();
        assert_eq!(first.status, PaymentStatus::Completed);

        let second = fx.service.process_one_time(command(Some("K2"))).await.unwrap();
        assert_eq!(second.id, first.id);
        // One created + one completed; the replay added nothing.
        assert_eq!(fx.bus.event_count(), 2);
    }

    #[tokio::test]
    async fn approved_gateway_payment_completes_and_publishes() {
        let fx = fixture(MockGatewayBehavior::Approve);
        let payment = fx.service.process_one_time(command(None)).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.processed_at.is_some());
        assert!(payment.transaction_id.is_some());
        assert_eq!(fx.bus.events_for_key("payment.completed.subscription").len(), 1);
    }

    #[tokio::test]
    async fn rejected_gateway_payment_fails_and_publishes() {
        let fx = fixture(MockGatewayBehavior::Reject);
        let payment = fx.service.process_one_time(command(None)).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Failed);
        assert!(payment.processed_at.is_none());
        assert_eq!(fx.bus.events_for_key("payment.failed.subscription").len(), 1);
    }

    #[tokio::test]
    async fn unknown_gateway_marks_payment_failed() {
        let fx = fixture(MockGatewayBehavior::Approve);
        let mut cmd = command(None);
        cmd.payment_gateway = "paypal".into();

        let err = fx.service.process_one_time(cmd).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let stored = fx.service.list_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn manual_update_publishes_only_on_observed_change() {
        let fx = fixture(MockGatewayBehavior::Approve);
        let payment = fx.service.create_basic(command(None)).await.unwrap();

        fx.service
            .update_status(payment.id, PaymentStatus::Completed, Some("TX-9".into()))
            .await
            .unwrap();
        fx.service
            .update_status(payment.id, PaymentStatus::Completed, None)
            .await
            .unwrap();

        assert_eq!(fx.bus.events_for_key("payment.completed.subscription").len(), 1);
    }

    #[tokio::test]
    async fn completed_payment_cannot_be_demoted() {
        let fx = fixture(MockGatewayBehavior::Approve);
        let payment = fx.service.create_basic(command(None)).await.unwrap();
        fx.service
            .update_status(payment.id, PaymentStatus::Completed, None)
            .await
            .unwrap();

        let err = fx
            .service
            .update_status(payment.id, PaymentStatus::Pending, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn refund_validates_amount_and_publishes() {
        let fx = fixture(MockGatewayBehavior::Approve);
        let payment = fx.service.process_one_time(command(None)).await.unwrap();

        assert!(fx.service.refund(payment.id, 2000.0).await.is_err());

        let refunded = fx.service.refund(payment.id, 1000.0).await.unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);

        let events = fx.bus.events_for_key("payment.refunded.subscription");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].metadata.get("refund_amount"), Some(&json!(1000.0)));
    }

    #[tokio::test]
    async fn cash_approval_completes_payment() {
        let fx = fixture(MockGatewayBehavior::Approve);
        let mut cmd = command(None);
        cmd.payment_gateway = "cash".into();
        cmd.payment_method = "cash".into();
        let payment = fx.service.create_basic(cmd).await.unwrap();

        let approved = fx.service.approve_cash(payment.id).await.unwrap();
        assert_eq!(approved.status, PaymentStatus::Completed);
        assert!(approved.processed_at.is_some());
    }

    #[tokio::test]
    async fn webhook_updates_pending_payment_and_publishes() {
        let fx = fixture(MockGatewayBehavior::Approve);
        let mut cmd = command(None);
        cmd.payment_gateway = "mock".into();
        let payment = fx.service.create_basic(cmd).await.unwrap();
        fx.service
            .update_status(payment.id, PaymentStatus::Pending, Some("TX42".into()))
            .await
            .unwrap();

        let payload = serde_json::to_vec(&json!({
            "action": "payment.updated",
            "data": {"id": "TX42"}
        }))
        .unwrap();

        let outcome = fx
            .service
            .process_webhook("mock", &payload, &HashMap::new())
            .await
            .unwrap();
        assert!(matches!(outcome, WebhookOutcome::Updated { status: PaymentStatus::Completed, .. }));
        assert_eq!(fx.bus.events_for_key("payment.completed.subscription").len(), 1);

        // Redelivery of the same notification is a harmless no-op.
        let outcome = fx
            .service
            .process_webhook("mock", &payload, &HashMap::new())
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Unchanged);
    }

    #[tokio::test]
    async fn webhook_for_unknown_payment_acknowledges() {
        let fx = fixture(MockGatewayBehavior::Approve);
        let payload = serde_json::to_vec(&json!({
            "action": "payment.updated",
            "data": {"id": "TX-missing"}
        }))
        .unwrap();

        let outcome = fx
            .service
            .process_webhook("mock", &payload, &HashMap::new())
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::PaymentNotFound);
    }

    #[tokio::test]
    async fn webhook_with_garbage_payload_is_rejected() {
        let fx = fixture(MockGatewayBehavior::Approve);
        let err = fx
            .service
            .process_webhook("mock", b"not-json", &HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
