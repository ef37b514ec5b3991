//! PostgreSQL activity repository.
//!
//! Reads go through the `actividades_lugares` view, which projects
//! `available_places = capacity - count(active enrollments)` and
//! excludes soft-deleted rows. The projection is eventually consistent
//! with enrollment writes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::PgPool;

use crate::domain::activities::{Activity, ActivityRecord, NewActivity, ScheduleTime, Weekday};
use crate::domain::foundation::{ActivityId, BranchId, DomainError, Timestamp};
use crate::ports::{ActivityRepository, ActivitySearch};

use super::map_sqlx_err;

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: i64,
    title: String,
    description: String,
    capacity: i32,
    day_of_week: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    photo_url: String,
    instructor: String,
    category: String,
    branch_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct ActivityViewRow {
    #[sqlx(flatten)]
    activity: ActivityRow,
    available_places: i64,
}

impl ActivityRow {
    fn into_activity(self) -> Result<Activity, DomainError> {
        Ok(Activity {
            id: ActivityId::new(self.id),
            title: self.title,
            description: self.description,
            capacity: self.capacity as u32,
            day_of_week: Weekday::parse(&self.day_of_week)
                .map_err(|_| DomainError::database("stored weekday is unreadable"))?,
            start_time: ScheduleTime::from_time(self.start_time),
            end_time: ScheduleTime::from_time(self.end_time),
            photo_url: self.photo_url,
            instructor: self.instructor,
            category: self.category,
            branch_id: self.branch_id.map(BranchId::new),
            created_at: Timestamp::from_datetime(self.created_at),
            updated_at: Timestamp::from_datetime(self.updated_at),
            deleted_at: self.deleted_at.map(Timestamp::from_datetime),
        })
    }
}

impl ActivityViewRow {
    fn into_record(self) -> Result<ActivityRecord, DomainError> {
        Ok(ActivityRecord {
            available_places: self.available_places,
            activity: self.activity.into_activity()?,
        })
    }
}

const VIEW_COLUMNS: &str = "id, title, description, capacity, day_of_week, start_time, end_time, \
     photo_url, instructor, category, branch_id, created_at, updated_at, deleted_at, \
     available_places";

pub struct PgActivityRepository {
    pool: PgPool,
}

impl PgActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn create(&self, input: NewActivity) -> Result<Activity, DomainError> {
        let row = sqlx::query_as::<_, ActivityRow>(
            r#"
            INSERT INTO activities
                (title, description, capacity, day_of_week, start_time, end_time,
                 photo_url, instructor, category, branch_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, title, description, capacity, day_of_week, start_time, end_time,
                      photo_url, instructor, category, branch_id, created_at, updated_at, deleted_at
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.capacity as i32)
        .bind(input.day_of_week.as_str())
        .bind(input.start_time.as_time())
        .bind(input.end_time.as_time())
        .bind(&input.photo_url)
        .bind(&input.instructor)
        .bind(&input.category)
        .bind(input.branch_id.map(|b| b.as_i64()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "activity"))?;

        row.into_activity()
    }

    async fn find_by_id(&self, id: ActivityId) -> Result<ActivityRecord, DomainError> {
        let row = sqlx::query_as::<_, ActivityViewRow>(&format!(
            "SELECT {} FROM actividades_lugares WHERE id = $1",
            VIEW_COLUMNS
        ))
        .bind(id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "activity"))?;

        row.into_record()
    }

    async fn list(&self) -> Result<Vec<ActivityRecord>, DomainError> {
        let rows = sqlx::query_as::<_, ActivityViewRow>(&format!(
            "SELECT {} FROM actividades_lugares ORDER BY id",
            VIEW_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "activity"))?;

        rows.into_iter().map(ActivityViewRow::into_record).collect()
    }

    async fn search(&self, search: &ActivitySearch) -> Result<Vec<ActivityRecord>, DomainError> {
        let keyword = search
            .keyword
            .as_deref()
            .map(|k| format!("%{}%", k.to_lowercase()));

        let rows = sqlx::query_as::<_, ActivityViewRow>(&format!(
            r#"
            SELECT {} FROM actividades_lugares
            WHERE ($1::text IS NULL OR LOWER(title) LIKE $1 OR LOWER(description) LIKE $1)
              AND ($2::text IS NULL OR LOWER(category) = LOWER($2))
            ORDER BY id
            "#,
            VIEW_COLUMNS
        ))
        .bind(keyword)
        .bind(search.category.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "activity"))?;

        rows.into_iter().map(ActivityViewRow::into_record).collect()
    }

    async fn update(&self, id: ActivityId, input: NewActivity) -> Result<Activity, DomainError> {
        // Capacity cannot drop below the places already taken.
        let row = sqlx::query_as::<_, ActivityRow>(
            r#"
            UPDATE activities SET
                title = $2, description = $3, capacity = $4, day_of_week = $5,
                start_time = $6, end_time = $7, photo_url = $8, instructor = $9,
                category = $10, branch_id = $11, updated_at = now()
            WHERE id = $1
              AND deleted_at IS NULL
              AND $4 >= (SELECT COUNT(*) FROM inscripciones
                         WHERE actividad_id = $1 AND is_activa)
            RETURNING id, title, description, capacity, day_of_week, start_time, end_time,
                      photo_url, instructor, category, branch_id, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id.as_i64())
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.capacity as i32)
        .bind(input.day_of_week.as_str())
        .bind(input.start_time.as_time())
        .bind(input.end_time.as_time())
        .bind(&input.photo_url)
        .bind(&input.instructor)
        .bind(&input.category)
        .bind(input.branch_id.map(|b| b.as_i64()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "activity"))?;

        match row {
            Some(row) => row.into_activity(),
            None => {
                // Distinguish "missing" from "capacity too small".
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM activities WHERE id = $1 AND deleted_at IS NULL)",
                )
                .bind(id.as_i64())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_err(e, "activity"))?;

                if exists {
                    Err(DomainError::validation(
                        "cannot reduce capacity below active enrollments",
                    ))
                } else {
                    Err(DomainError::not_found("activity not found"))
                }
            }
        }
    }

    async fn soft_delete(&self, id: ActivityId) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE activities SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "activity"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("activity not found"));
        }
        Ok(())
    }
}
