//! Gateway factory.
//!
//! Maps a gateway name to a configured adapter instance. Adding a
//! gateway means adding a match arm here; callers never construct
//! adapters directly.

use std::sync::Arc;

use crate::config::PaymentConfig;
use crate::domain::foundation::DomainError;
use crate::ports::{GatewayProvider, PaymentGateway, RecurringGateway};

use super::{CashGateway, MercadoPagoGateway, MercadoPagoRecurringGateway, MockGateway,
    MockGatewayBehavior};

pub struct GatewayFactory {
    config: PaymentConfig,
    mock: Option<MockGatewayBehavior>,
}

impl GatewayFactory {
    pub fn new(config: PaymentConfig) -> Self {
        Self { config, mock: None }
    }

    /// Factory with the `mock` gateway enabled. Test wiring only.
    pub fn for_tests(behavior: MockGatewayBehavior) -> Self {
        Self {
            config: PaymentConfig::default(),
            mock: Some(behavior),
        }
    }

    fn mercadopago_credentials(&self) -> Result<secrecy::SecretString, DomainError> {
        self.config.mercadopago_access_token.clone().ok_or_else(|| {
            DomainError::validation("missing configuration: mercadopago access token")
        })
    }
}

impl GatewayProvider for GatewayFactory {
    fn create(&self, name: &str) -> Result<Arc<dyn PaymentGateway>, DomainError> {
        match name {
            "mercadopago" => {
                let token = self.mercadopago_credentials()?;
                Ok(Arc::new(MercadoPagoGateway::new(
                    self.config.mercadopago_base_url.clone(),
                    token,
                    self.config.mercadopago_webhook_secret.clone(),
                )?))
            }
            "cash" | "efectivo" => Ok(Arc::new(CashGateway::new())),
            "mock" => match self.mock {
                Some(behavior) => Ok(Arc::new(MockGateway::new(behavior))),
                None => Err(DomainError::validation("unsupported gateway: mock")),
            },
            other => Err(DomainError::validation(format!(
                "unsupported gateway: {}",
                other
            ))),
        }
    }

    fn create_recurring(&self, name: &str) -> Result<Arc<dyn RecurringGateway>, DomainError> {
        match name {
            "mercadopago" => {
                let token = self.mercadopago_credentials()?;
                Ok(Arc::new(MercadoPagoRecurringGateway::new(
                    self.config.mercadopago_base_url.clone(),
                    token,
                )?))
            }
            "mock" => match self.mock {
                Some(behavior) => Ok(Arc::new(MockGateway::new(behavior))),
                None => Err(DomainError::validation(
                    "unsupported recurring gateway: mock",
                )),
            },
            other => Err(DomainError::validation(format!(
                "unsupported recurring gateway: {}",
                other
            ))),
        }
    }

    fn supports(&self, name: &str) -> bool {
        matches!(name, "mercadopago" | "cash" | "efectivo")
            || (name == "mock" && self.mock.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn cash_needs_no_credentials() {
        let factory = GatewayFactory::new(PaymentConfig::default());
        assert!(factory.create("cash").is_ok());
        assert!(factory.create("efectivo").is_ok());
    }

    #[test]
    fn mercadopago_requires_access_token() {
        let factory = GatewayFactory::new(PaymentConfig::default());
        assert!(factory.create("mercadopago").is_err());

        let config = PaymentConfig {
            mercadopago_access_token: Some(SecretString::new("APP_USR-token".into())),
            ..Default::default()
        };
        let factory = GatewayFactory::new(config);
        assert!(factory.create("mercadopago").is_ok());
        assert!(factory.create_recurring("mercadopago").is_ok());
    }

    #[test]
    fn unknown_names_are_rejected() {
        let factory = GatewayFactory::new(PaymentConfig::default());
        assert!(factory.create("paypal").is_err());
        assert!(!factory.supports("paypal"));
        assert!(factory.supports("cash"));
    }

    #[test]
    fn cash_has_no_recurring_capability() {
        let factory = GatewayFactory::new(PaymentConfig::default());
        assert!(factory.create_recurring("cash").is_err());
    }

    #[test]
    fn mock_is_only_available_in_test_factories() {
        assert!(GatewayFactory::new(PaymentConfig::default()).create("mock").is_err());
        assert!(GatewayFactory::for_tests(MockGatewayBehavior::Approve)
            .create("mock")
            .is_ok());
    }
}
