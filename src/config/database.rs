//! Relational store configuration.

use serde::Deserialize;

use super::error::ConfigValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ConfigValidationError::InvalidDatabaseUrl);
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigValidationError::InvalidPoolSize);
        }
        if self.max_connections == 0 || self.max_connections > 500 {
            return Err(ConfigValidationError::InvalidPoolSize);
        }
        Ok(())
    }
}

fn default_max_connections() -> u32 {
    100
}

fn default_min_connections() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }

    #[test]
    fn postgres_urls_are_accepted() {
        assert!(config("postgres://u:p@host/db").validate().is_ok());
        assert!(config("postgresql://u:p@host/db").validate().is_ok());
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(config("mysql://u:p@host/db").validate().is_err());
    }

    #[test]
    fn inverted_pool_bounds_are_rejected() {
        let mut cfg = config("postgres://u:p@host/db");
        cfg.min_connections = 50;
        cfg.max_connections = 10;
        assert!(cfg.validate().is_err());
    }
}
