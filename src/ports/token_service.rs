//! Token issuance and validation ports.
//!
//! All services share the same signing secret; identity issues tokens at
//! register/login, every service verifies them at its boundary.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, DomainError};
use crate::domain::identity::User;

/// Port for minting bearer tokens (identity service only).
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, user: &User) -> Result<String, DomainError>;
}

/// Port for validating bearer tokens at every service boundary.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
