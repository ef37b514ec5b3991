//! HTTP client for the subscription service.
//!
//! The enrollment transaction forwards the caller's own bearer token on
//! this call; the subscription service applies its normal authorization.
//! A hard 5-second timeout bounds the whole enrollment request.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{SubscriptionLookup, VerifiedPlan, VerifiedSubscription};

const PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// Wire shape of the subscription service's response.
#[derive(Debug, Deserialize)]
struct SubscriptionDto {
    id: String,
    user_id: i64,
    plan_id: String,
    state: String,
}

pub struct HttpSubscriptionLookup {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSubscriptionLookup {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(PEER_TIMEOUT)
            .build()
            .map_err(|e| DomainError::internal(format!("http client build failed: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Best-effort plan fetch; a transiently missing plan must not fail
    /// the enrollment, it only disables category gating for full plans.
    async fn plan_info(&self, plan_id: &str, bearer_token: &str) -> Option<VerifiedPlan> {
        let url = format!("{}/plans/{}", self.base_url, plan_id);
        let response = self
            .http
            .get(&url)
            .header("Authorization", bearer_token)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            tracing::warn!(plan_id, status = %response.status(), "plan lookup failed");
            return None;
        }
        response.json::<VerifiedPlan>().await.ok()
    }
}

#[async_trait]
impl SubscriptionLookup for HttpSubscriptionLookup {
    async fn active_subscription(
        &self,
        user_id: UserId,
        bearer_token: &str,
    ) -> Result<VerifiedSubscription, DomainError> {
        let url = format!("{}/subscriptions/active/{}", self.base_url, user_id);
        let response = self
            .http
            .get(&url)
            .header("Authorization", bearer_token)
            .send()
            .await
            .map_err(|e| DomainError::upstream(format!("subscription check failed: {}", e)))?;

        match response.status().as_u16() {
            200 => {}
            401 => {
                return Err(DomainError::authentication(
                    "not authorized to check subscription",
                ))
            }
            404 => {
                return Err(DomainError::subscription_inactive("no active subscription"));
            }
            status => {
                return Err(DomainError::upstream(format!(
                    "subscription check failed (status: {})",
                    status
                )))
            }
        }

        let dto: SubscriptionDto = response
            .json()
            .await
            .map_err(|e| DomainError::upstream(format!("undecodable subscription: {}", e)))?;

        let plan = self.plan_info(&dto.plan_id, bearer_token).await;
        Ok(VerifiedSubscription {
            id: dto.id,
            user_id: dto.user_id.to_string(),
            plan_id: dto.plan_id,
            state: dto.state,
            plan,
        })
    }
}
