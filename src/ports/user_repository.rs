//! User repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::identity::{NewUser, User};

/// Persistence port for users (relational store).
///
/// `create` must enforce username and email uniqueness and surface
/// violations as `Conflict`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, DomainError>;

    async fn find_by_id(&self, id: UserId) -> Result<User, DomainError>;

    /// Login lookup: the key may be a username or an email.
    async fn find_by_username_or_email(&self, key: &str) -> Result<User, DomainError>;

    async fn list(&self) -> Result<Vec<User>, DomainError>;
}
