//! Authenticated-caller context shared by all services.
//!
//! Every service validates the same symmetric-HMAC bearer token; the
//! validated claims are projected into [`AuthenticatedUser`] and injected
//! into request extensions by the auth middleware.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{DomainError, UserId};

/// Capability role carried in the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// Caller identity extracted from a validated bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
    pub is_admin: bool,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn new(user_id: UserId, username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_admin,
            role: if is_admin { Role::Admin } else { Role::User },
        }
    }

    /// Admin capability check for admin-only operations.
    pub fn require_admin(&self) -> Result<(), DomainError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(DomainError::authorization(
                "admin access required for this operation",
            ))
        }
    }

    /// Owner-or-admin check used by the payment read paths.
    pub fn can_access_resource_of(&self, owner: UserId) -> bool {
        self.is_admin || self.user_id == owner
    }
}

/// Token validation failures, mapped to 401 at the boundary.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("authorization header required")]
    MissingToken,

    #[error("invalid or malformed token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("token claims are malformed")]
    MalformedClaims,
}

impl From<AuthError> for DomainError {
    fn from(err: AuthError) -> Self {
        DomainError::authentication(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_flag_implies_admin_role() {
        let user = AuthenticatedUser::new(UserId::new(1), "ana", true);
        assert_eq!(user.role, Role::Admin);
        assert!(user.require_admin().is_ok());
    }

    #[test]
    fn plain_user_fails_admin_check() {
        let user = AuthenticatedUser::new(UserId::new(2), "bob", false);
        assert_eq!(user.role, Role::User);
        assert!(user.require_admin().is_err());
    }

    #[test]
    fn owner_or_admin_can_access_resource() {
        let owner = AuthenticatedUser::new(UserId::new(7), "carla", false);
        let admin = AuthenticatedUser::new(UserId::new(1), "root", true);
        let other = AuthenticatedUser::new(UserId::new(8), "dan", false);

        assert!(owner.can_access_resource_of(UserId::new(7)));
        assert!(admin.can_access_resource_of(UserId::new(7)));
        assert!(!other.can_access_resource_of(UserId::new(7)));
    }

    #[test]
    fn auth_error_converts_to_authentication_kind() {
        let err: DomainError = AuthError::TokenExpired.into();
        assert_eq!(err.kind, crate::domain::foundation::ErrorKind::Authentication);
    }
}
