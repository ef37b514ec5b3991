//! PostgreSQL user repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{BranchId, DomainError, Timestamp, UserId};
use crate::domain::identity::{NewUser, PasswordHash, User};
use crate::ports::UserRepository;

use super::map_sqlx_err;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    username: String,
    email: String,
    password_hash: String,
    is_admin: bool,
    home_branch_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::new(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            username: row.username,
            email: row.email,
            password_hash: PasswordHash::from_stored(row.password_hash),
            is_admin: row.is_admin,
            home_branch_id: row.home_branch_id.map(BranchId::new),
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users
                (first_name, last_name, username, email, password_hash, is_admin, home_branch_id)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6)
            RETURNING id, first_name, last_name, username, email, password_hash,
                      is_admin, home_branch_id, created_at
            "#,
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.password_hash.as_str())
        .bind(user.home_branch_id.map(|b| b.as_i64()))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "user"))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, DomainError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, first_name, last_name, username, email, password_hash,
                   is_admin, home_branch_id, created_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "user"))?;

        Ok(row.into())
    }

    async fn find_by_username_or_email(&self, key: &str) -> Result<User, DomainError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, first_name, last_name, username, email, password_hash,
                   is_admin, home_branch_id, created_at
            FROM users WHERE username = $1 OR email = $1
            "#,
        )
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "user"))?;

        Ok(row.into())
    }

    async fn list(&self) -> Result<Vec<User>, DomainError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, first_name, last_name, username, email, password_hash,
                   is_admin, home_branch_id, created_at
            FROM users ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err(e, "user"))?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}
