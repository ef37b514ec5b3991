//! PostgreSQL enrollment repository.
//!
//! `(usuario_id, actividad_id)` carries a unique constraint; the upsert
//! rides it with `ON CONFLICT`, which is what makes the write the
//! authoritative duplicate guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::activities::Enrollment;
use crate::domain::foundation::{ActivityId, DomainError, EnrollmentId, Timestamp, UserId};
use crate::ports::EnrollmentRepository;

use super::map_sqlx_err;

#[derive(sqlx::FromRow)]
struct EnrollmentRow {
    id: i64,
    usuario_id: i64,
    actividad_id: i64,
    suscripcion_id: Option<String>,
    is_activa: bool,
    enrolled_at: DateTime<Utc>,
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        Enrollment {
            id: EnrollmentId::new(row.id),
            user_id: UserId::new(row.usuario_id),
            activity_id: ActivityId::new(row.actividad_id),
            subscription_id: row.suscripcion_id,
            active: row.is_activa,
            enrolled_at: Timestamp::from_datetime(row.enrolled_at),
        }
    }
}

pub struct PgEnrollmentRepository {
    pool: PgPool,
}

impl PgEnrollmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentRepository for PgEnrollmentRepository {
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Enrollment>, DomainError> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, usuario_id, actividad_id, suscripcion_id, is_activa, enrolled_at
            FROM inscripciones WHERE usuario_id = $1 ORDER BY enrolled_at
            "#,
        )
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "enrollment"))?;

        Ok(rows.into_iter().map(Enrollment::from).collect())
    }

    async fn upsert_active(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
        subscription_id: Option<String>,
    ) -> Result<Enrollment, DomainError> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            INSERT INTO inscripciones (usuario_id, actividad_id, suscripcion_id, is_activa)
            VALUES ($1, $2, $3, TRUE)
            ON CONFLICT (usuario_id, actividad_id) DO UPDATE SET
                is_activa = TRUE,
                suscripcion_id = COALESCE(EXCLUDED.suscripcion_id, inscripciones.suscripcion_id)
            RETURNING id, usuario_id, actividad_id, suscripcion_id, is_activa, enrolled_at
            "#,
        )
        .bind(user_id.as_i64())
        .bind(activity_id.as_i64())
        .bind(subscription_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "enrollment"))?;

        Ok(row.into())
    }

    async fn deactivate(
        &self,
        user_id: UserId,
        activity_id: ActivityId,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE inscripciones SET is_activa = FALSE WHERE usuario_id = $1 AND actividad_id = $2",
        )
        .bind(user_id.as_i64())
        .bind(activity_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "enrollment"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("enrollment not found"));
        }
        Ok(())
    }

    async fn deactivate_all_by_user(&self, user_id: UserId) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "UPDATE inscripciones SET is_activa = FALSE WHERE usuario_id = $1 AND is_activa",
        )
        .bind(user_id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "enrollment"))?;

        Ok(result.rows_affected())
    }

    async fn count_active_by_activity(&self, activity_id: ActivityId) -> Result<i64, DomainError> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM inscripciones WHERE actividad_id = $1 AND is_activa",
        )
        .bind(activity_id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "enrollment"))
    }
}
