//! Payment repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentId, UserId};
use crate::domain::payments::{EntityType, Payment, PaymentStatus};

/// Persistence port for payments (document store).
///
/// `idempotency_key` is unique when present; `create` must reject a
/// duplicate key with `Conflict` (the service checks first, the store
/// constraint is the backstop for races).
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: &Payment) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: PaymentId) -> Result<Payment, DomainError>;

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Payment>, DomainError>;

    async fn find_all(&self) -> Result<Vec<Payment>, DomainError>;

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Payment>, DomainError>;

    async fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<Payment>, DomainError>;

    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, DomainError>;

    /// Persists the aggregate after a state transition.
    async fn update(&self, payment: &Payment) -> Result<(), DomainError>;
}
