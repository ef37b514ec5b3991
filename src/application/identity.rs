//! Identity service - registration, login, user lookups.

use std::sync::Arc;

use crate::domain::foundation::{BranchId, DomainError, UserId};
use crate::domain::identity::{NewUser, UserProfile};
use crate::ports::{TokenIssuer, UserRepository};

/// Registration input as received from the HTTP boundary.
#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub home_branch_id: Option<BranchId>,
}

/// Orchestrates user registration and authentication.
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenIssuer>,
}

impl IdentityService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<dyn TokenIssuer>) -> Self {
        Self { users, tokens }
    }

    /// Registers a user and issues their first token.
    ///
    /// Duplicate username or email surfaces as `Conflict` from the
    /// repository. New users are never admins.
    pub async fn register(
        &self,
        command: RegisterCommand,
    ) -> Result<(UserProfile, String), DomainError> {
        let new_user = NewUser::validate(
            &command.first_name,
            &command.last_name,
            &command.username,
            &command.email,
            &command.password,
            command.home_branch_id,
        )?;

        let user = self.users.create(new_user).await?;
        let token = self.tokens.issue(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok((user.profile(), token))
    }

    /// Authenticates by username or email plus password.
    ///
    /// Both unknown-user and wrong-password collapse into the same
    /// "invalid credentials" so the response does not leak which one it
    /// was.
    pub async fn login(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<(UserProfile, String), DomainError> {
        let invalid = || DomainError::authentication("invalid credentials");

        let user = self
            .users
            .find_by_username_or_email(username_or_email.trim())
            .await
            .map_err(|_| invalid())?;

        if !user.password_hash.matches(password) {
            return Err(invalid());
        }

        let token = self.tokens.issue(&user).await?;
        tracing::info!(user_id = %user.id, "user logged in");
        Ok((user.profile(), token))
    }

    pub async fn get_user(&self, id: UserId) -> Result<UserProfile, DomainError> {
        Ok(self.users.find_by_id(id).await?.profile())
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, DomainError> {
        let users = self.users.list().await?;
        Ok(users.into_iter().map(|u| u.profile()).collect())
    }
}
