//! PostgreSQL subscription repository.
//!
//! Document-shaped like the plan store; `user_id`, `state`, and
//! `expiry_date` are mirrored out because they back the hot queries
//! (active-by-user, single-active preconditions).

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, SubscriptionId, UserId};
use crate::domain::subscriptions::{Subscription, SubscriptionState};
use crate::ports::SubscriptionRepository;

use super::map_sqlx_err;

pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(doc: JsonValue) -> Result<Subscription, DomainError> {
        serde_json::from_value(doc)
            .map_err(|e| DomainError::database(format!("stored subscription is unreadable: {}", e)))
    }

    fn encode(subscription: &Subscription) -> Result<JsonValue, DomainError> {
        serde_json::to_value(subscription)
            .map_err(|e| DomainError::internal(format!("subscription serialization failed: {}", e)))
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn create(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO suscripciones (id, user_id, state, expiry_date, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*subscription.id.as_uuid())
        .bind(subscription.user_id.as_i64())
        .bind(subscription.state.as_str())
        .bind(*subscription.expiry_date.as_datetime())
        .bind(*subscription.created_at.as_datetime())
        .bind(Self::encode(subscription)?)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "subscription"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: SubscriptionId) -> Result<Subscription, DomainError> {
        let doc: JsonValue = sqlx::query_scalar("SELECT doc FROM suscripciones WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_err(e, "subscription"))?;
        Self::decode(doc)
    }

    async fn find_active_by_user(&self, user_id: UserId) -> Result<Subscription, DomainError> {
        let doc: Option<JsonValue> = sqlx::query_scalar(
            r#"
            SELECT doc FROM suscripciones
            WHERE user_id = $1 AND state = 'active' AND expiry_date > now()
            LIMIT 1
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "subscription"))?;

        match doc {
            Some(doc) => Self::decode(doc),
            None => Err(DomainError::not_found("no active subscription")),
        }
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Subscription>, DomainError> {
        let docs: Vec<JsonValue> = sqlx::query_scalar(
            "SELECT doc FROM suscripciones WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "subscription"))?;

        docs.into_iter().map(Self::decode).collect()
    }

    async fn exists_in_state(
        &self,
        user_id: UserId,
        state: SubscriptionState,
    ) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM suscripciones WHERE user_id = $1 AND state = $2)",
        )
        .bind(user_id.as_i64())
        .bind(state.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "subscription"))
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE suscripciones SET state = $2, expiry_date = $3, doc = $4
            WHERE id = $1
            "#,
        )
        .bind(*subscription.id.as_uuid())
        .bind(subscription.state.as_str())
        .bind(*subscription.expiry_date.as_datetime())
        .bind(Self::encode(subscription)?)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "subscription"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("subscription not found"));
        }
        Ok(())
    }
}
