//! PostgreSQL repository adapters.
//!
//! The relational entities (users, activities, enrollments) live in
//! normal tables; the document-backed aggregates (plans, subscriptions,
//! payments) are stored as JSONB documents with a handful of indexed
//! columns for the hot filters. Schemas are under `migrations/`.

mod activities;
mod enrollments;
mod payments;
mod plans;
mod subscriptions;
mod users;

pub use activities::PgActivityRepository;
pub use enrollments::PgEnrollmentRepository;
pub use payments::PgPaymentRepository;
pub use plans::PgPlanRepository;
pub use subscriptions::PgSubscriptionRepository;
pub use users::PgUserRepository;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::adapters::http::HealthIndicator;
use crate::domain::foundation::DomainError;

/// Translates driver errors into the semantic vocabulary at the
/// repository boundary.
pub(crate) fn map_sqlx_err(err: sqlx::Error, entity: &str) -> DomainError {
    match &err {
        sqlx::Error::RowNotFound => DomainError::not_found(format!("{} not found", entity)),
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            DomainError::conflict(format!("{} already exists", entity))
        }
        _ => DomainError::database(format!("{} query failed: {}", entity, err)),
    }
}

/// Health indicator backed by a trivial round-trip query.
pub struct PgHealth {
    pool: PgPool,
}

impl PgHealth {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthIndicator for PgHealth {
    async fn healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
