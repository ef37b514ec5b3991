//! Payment gateway configuration.

use secrecy::SecretString;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Mercado Pago API token; absent means the gateway is unavailable.
    pub mercadopago_access_token: Option<SecretString>,

    pub mercadopago_public_key: Option<String>,

    /// Secret for `x-signature` webhook verification; absent skips it.
    pub mercadopago_webhook_secret: Option<SecretString>,

    #[serde(default = "default_mp_base_url")]
    pub mercadopago_base_url: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            mercadopago_access_token: None,
            mercadopago_public_key: None,
            mercadopago_webhook_secret: None,
            mercadopago_base_url: default_mp_base_url(),
        }
    }
}

fn default_mp_base_url() -> String {
    "https://api.mercadopago.com".to_string()
}
