//! Event bus (Redis) configuration.

use serde::Deserialize;

use super::error::ConfigValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

impl RedisConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ConfigValidationError::InvalidRedisUrl);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_schemes_are_accepted() {
        assert!(RedisConfig { url: "redis://localhost".into() }.validate().is_ok());
        assert!(RedisConfig { url: "rediss://remote:6380".into() }.validate().is_ok());
        assert!(RedisConfig { url: "http://nope".into() }.validate().is_err());
    }
}
