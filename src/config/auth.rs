//! Token signing configuration.
//!
//! Every service shares the same symmetric secret; identity signs with
//! it, the rest only verify.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ConfigValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 signing secret.
    pub jwt_secret: SecretString,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_minutes: i64,
}

impl AuthConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.jwt_secret.expose_secret().len() < 16 {
            return Err(ConfigValidationError::WeakJwtSecret);
        }
        if self.token_ttl_minutes <= 0 {
            return Err(ConfigValidationError::InvalidTokenTtl);
        }
        Ok(())
    }
}

fn default_issuer() -> String {
    "gym-management-system".to_string()
}

fn default_token_ttl() -> i64 {
    30
}
