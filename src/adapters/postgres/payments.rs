//! PostgreSQL payment repository.
//!
//! Document-shaped; `idempotency_key` carries a partial unique index so
//! racing duplicate creations lose at the store even when both passed
//! the service-level check.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, PaymentId, UserId};
use crate::domain::payments::{EntityType, Payment, PaymentStatus};
use crate::ports::PaymentRepository;

use super::map_sqlx_err;

pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(doc: JsonValue) -> Result<Payment, DomainError> {
        serde_json::from_value(doc)
            .map_err(|e| DomainError::database(format!("stored payment is unreadable: {}", e)))
    }

    fn encode(payment: &Payment) -> Result<JsonValue, DomainError> {
        serde_json::to_value(payment)
            .map_err(|e| DomainError::internal(format!("payment serialization failed: {}", e)))
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn create(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments
                (id, user_id, entity_type, entity_id, status, idempotency_key, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*payment.id.as_uuid())
        .bind(payment.user_id.as_i64())
        .bind(payment.entity_type.as_str())
        .bind(&payment.entity_id)
        .bind(payment.status.as_str())
        .bind(payment.idempotency_key.as_deref())
        .bind(*payment.created_at.as_datetime())
        .bind(Self::encode(payment)?)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "payment"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Payment, DomainError> {
        let doc: JsonValue = sqlx::query_scalar("SELECT doc FROM payments WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_err(e, "payment"))?;
        Self::decode(doc)
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Payment>, DomainError> {
        let doc: Option<JsonValue> =
            sqlx::query_scalar("SELECT doc FROM payments WHERE idempotency_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_err(e, "payment"))?;

        doc.map(Self::decode).transpose()
    }

    async fn find_all(&self) -> Result<Vec<Payment>, DomainError> {
        let docs: Vec<JsonValue> =
            sqlx::query_scalar("SELECT doc FROM payments ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_err(e, "payment"))?;
        docs.into_iter().map(Self::decode).collect()
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Payment>, DomainError> {
        let docs: Vec<JsonValue> = sqlx::query_scalar(
            "SELECT doc FROM payments WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "payment"))?;
        docs.into_iter().map(Self::decode).collect()
    }

    async fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<Payment>, DomainError> {
        let docs: Vec<JsonValue> = sqlx::query_scalar(
            r#"
            SELECT doc FROM payments
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(entity_type.as_str())
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "payment"))?;
        docs.into_iter().map(Self::decode).collect()
    }

    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, DomainError> {
        let docs: Vec<JsonValue> = sqlx::query_scalar(
            "SELECT doc FROM payments WHERE status = $1 ORDER BY created_at DESC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "payment"))?;
        docs.into_iter().map(Self::decode).collect()
    }

    async fn update(&self, payment: &Payment) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE payments SET status = $2, doc = $3 WHERE id = $1")
            .bind(*payment.id.as_uuid())
            .bind(payment.status.as_str())
            .bind(Self::encode(payment)?)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_err(e, "payment"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("payment not found"));
        }
        Ok(())
    }
}
