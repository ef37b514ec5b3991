//! Application configuration.
//!
//! Type-safe configuration loaded from environment variables (plus a
//! `.env` file in development) under the `GYM` prefix with `__` as the
//! nesting separator: `GYM__SERVER__PORT=8081` becomes `server.port`.
//! Each service binary loads the same shape and reads the sections it
//! needs.

mod auth;
mod database;
mod error;
mod payment;
mod peers;
mod redis;
mod server;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ConfigValidationError};
pub use payment::PaymentConfig;
pub use peers::PeersConfig;
pub use redis::RedisConfig;
pub use server::ServerConfig;

use serde::Deserialize;

/// Root configuration for every service binary.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub redis: RedisConfig,

    pub auth: AuthConfig,

    /// Gateway credentials; only the payment service needs them.
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Peer service locations; only the activity service needs them.
    #[serde(default)]
    pub peers: PeersConfig,
}

impl AppConfig {
    /// Loads configuration from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().prefix("GYM").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Semantic validation beyond deserialization.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}
