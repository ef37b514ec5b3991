//! Configuration error types.

use thiserror::Error;

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration invalid: {0}")]
    Validation(#[from] ConfigValidationError),
}

/// Errors found by semantic validation after loading.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("invalid port number")]
    InvalidPort,

    #[error("invalid bind address")]
    InvalidBindAddress,

    #[error("invalid request timeout")]
    InvalidTimeout,

    #[error("database url must be a postgres:// url")]
    InvalidDatabaseUrl,

    #[error("redis url must be a redis:// url")]
    InvalidRedisUrl,

    #[error("connection pool bounds are inconsistent")]
    InvalidPoolSize,

    #[error("jwt secret must be at least 16 bytes")]
    WeakJwtSecret,

    #[error("token ttl must be positive")]
    InvalidTokenTtl,
}
