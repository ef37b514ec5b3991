//! Peer service locations.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PeersConfig {
    /// Base URL of the subscription service, used by the enrollment
    /// transaction's active-subscription check.
    #[serde(default = "default_subscriptions_url")]
    pub subscriptions_url: String,
}

impl Default for PeersConfig {
    fn default() -> Self {
        Self {
            subscriptions_url: default_subscriptions_url(),
        }
    }
}

fn default_subscriptions_url() -> String {
    "http://subscriptions-api:8081".to_string()
}
