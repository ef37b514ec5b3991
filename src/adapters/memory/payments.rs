//! In-memory payment repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::foundation::{DomainError, PaymentId, UserId};
use crate::domain::payments::{EntityType, Payment, PaymentStatus};
use crate::ports::PaymentRepository;

pub struct InMemoryPaymentRepository {
    payments: RwLock<HashMap<PaymentId, Payment>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self {
            payments: RwLock::new(HashMap::new()),
        }
    }

    fn sorted(&self, mut payments: Vec<Payment>) -> Vec<Payment> {
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        payments
    }
}

impl Default for InMemoryPaymentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = self.payments.write().expect("payments lock poisoned");
        if let Some(key) = &payment.idempotency_key {
            // The unique-key backstop the service-level check relies on.
            if payments
                .values()
                .any(|p| p.idempotency_key.as_deref() == Some(key))
            {
                return Err(DomainError::conflict("idempotency key already used"));
            }
        }
        payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Payment, DomainError> {
        self.payments
            .read()
            .expect("payments lock poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("payment not found"))
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Payment>, DomainError> {
        Ok(self
            .payments
            .read()
            .expect("payments lock poisoned")
            .values()
            .find(|p| p.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<Payment>, DomainError> {
        let payments = self
            .payments
            .read()
            .expect("payments lock poisoned")
            .values()
            .cloned()
            .collect();
        Ok(self.sorted(payments))
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Payment>, DomainError> {
        let payments = self
            .payments
            .read()
            .expect("payments lock poisoned")
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        Ok(self.sorted(payments))
    }

    async fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<Payment>, DomainError> {
        let payments = self
            .payments
            .read()
            .expect("payments lock poisoned")
            .values()
            .filter(|p| p.entity_type == entity_type && p.entity_id == entity_id)
            .cloned()
            .collect();
        Ok(self.sorted(payments))
    }

    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, DomainError> {
        let payments = self
            .payments
            .read()
            .expect("payments lock poisoned")
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        Ok(self.sorted(payments))
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = self.payments.write().expect("payments lock poisoned");
        if !payments.contains_key(&payment.id) {
            return Err(DomainError::not_found("payment not found"));
        }
        payments.insert(payment.id, payment.clone());
        Ok(())
    }
}
