//! PostgreSQL plan repository.
//!
//! Plans are document-shaped: the aggregate is the JSONB `doc` column,
//! with `active` and `created_at` mirrored out for filtering and
//! sorting.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, PlanId};
use crate::domain::plans::Plan;
use crate::ports::{PageRequest, PlanFilter, PlanRepository};

use super::map_sqlx_err;

pub struct PgPlanRepository {
    pool: PgPool,
}

impl PgPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(doc: JsonValue) -> Result<Plan, DomainError> {
        serde_json::from_value(doc)
            .map_err(|e| DomainError::database(format!("stored plan is unreadable: {}", e)))
    }

    /// Whitelisted sort expressions; anything else falls back to the
    /// creation timestamp.
    fn sort_expression(sort_by: &str) -> &'static str {
        match sort_by {
            "name" => "doc->>'name'",
            "monthly_price" => "(doc->>'monthly_price')::float8",
            "duration_days" => "(doc->>'duration_days')::int",
            _ => "created_at",
        }
    }
}

#[async_trait]
impl PlanRepository for PgPlanRepository {
    async fn create(&self, plan: &Plan) -> Result<(), DomainError> {
        let doc = serde_json::to_value(plan)
            .map_err(|e| DomainError::internal(format!("plan serialization failed: {}", e)))?;

        sqlx::query("INSERT INTO planes (id, active, created_at, doc) VALUES ($1, $2, $3, $4)")
            .bind(*plan.id.as_uuid())
            .bind(plan.active)
            .bind(*plan.created_at.as_datetime())
            .bind(doc)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_err(e, "plan"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: PlanId) -> Result<Plan, DomainError> {
        let doc: JsonValue = sqlx::query_scalar("SELECT doc FROM planes WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_err(e, "plan"))?;
        Self::decode(doc)
    }

    async fn count(&self, filter: &PlanFilter) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM planes WHERE ($1::bool IS NULL OR active = $1)",
        )
        .bind(filter.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "plan"))?;
        Ok(count as u64)
    }

    async fn find_page(
        &self,
        filter: &PlanFilter,
        page: &PageRequest,
    ) -> Result<Vec<Plan>, DomainError> {
        let direction = if page.sort_desc { "DESC" } else { "ASC" };
        let query = format!(
            "SELECT doc FROM planes WHERE ($1::bool IS NULL OR active = $1) \
             ORDER BY {} {} LIMIT $2 OFFSET $3",
            Self::sort_expression(&page.sort_by),
            direction
        );

        let docs: Vec<JsonValue> = sqlx::query_scalar(&query)
            .bind(filter.active)
            .bind(page.page_size as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_err(e, "plan"))?;

        docs.into_iter().map(Self::decode).collect()
    }

    async fn update(&self, plan: &Plan) -> Result<(), DomainError> {
        let doc = serde_json::to_value(plan)
            .map_err(|e| DomainError::internal(format!("plan serialization failed: {}", e)))?;

        let result = sqlx::query("UPDATE planes SET active = $2, doc = $3 WHERE id = $1")
            .bind(*plan.id.as_uuid())
            .bind(plan.active)
            .bind(doc)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_err(e, "plan"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("plan not found"));
        }
        Ok(())
    }

    async fn delete(&self, id: PlanId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM planes WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_err(e, "plan"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("plan not found"));
        }
        Ok(())
    }
}
