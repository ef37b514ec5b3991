//! Mercado Pago gateway adapters.
//!
//! One-shot charges go through Checkout Pro preferences; recurring
//! billing goes through Preapprovals. Webhook notifications carry only a
//! payment id, so processing re-queries the payment and reports the
//! freshly-mapped status.
//!
//! Signature verification follows the `x-signature` scheme: the header
//! carries `ts=<unix>,v1=<hmac>` and the HMAC-SHA256 manifest is
//! `id:<data.id>;ts:<ts>;`. Verification runs only when a webhook secret
//! is configured, and the comparison is constant-time.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value as JsonValue};
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{
    GatewayPaymentRequest, GatewayPaymentResult, GatewayPaymentStatus, GatewayRefund,
    GatewayStatus, GatewayWebhookEvent, PaymentGateway, RecurringGateway, RecurringRequest,
    RecurringResult, RecurringWebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Shared REST client for the Mercado Pago API.
#[derive(Clone)]
struct MpClient {
    http: reqwest::Client,
    base_url: String,
    access_token: SecretString,
}

impl MpClient {
    fn new(base_url: String, access_token: SecretString) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DomainError::internal(format!("http client build failed: {}", e)))?;
        Ok(Self {
            http,
            base_url,
            access_token,
        })
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<JsonValue>,
    ) -> Result<JsonValue, DomainError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(self.access_token.expose_secret());
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::upstream(format!("mercadopago request failed: {}", e)))?;

        let status = response.status();
        let payload: JsonValue = response
            .json()
            .await
            .map_err(|e| DomainError::upstream(format!("mercadopago response unreadable: {}", e)))?;

        if !status.is_success() {
            let detail = payload["message"].as_str().unwrap_or("unknown error");
            return Err(DomainError::upstream(format!(
                "mercadopago answered {}: {}",
                status, detail
            )));
        }
        Ok(payload)
    }
}

/// Maps Mercado Pago's payment status vocabulary onto the canonical one.
fn map_status(mp_status: &str) -> GatewayStatus {
    match mp_status {
        "approved" => GatewayStatus::Completed,
        "pending" | "in_process" | "in_mediation" | "authorized" => GatewayStatus::Pending,
        "rejected" | "cancelled" => GatewayStatus::Failed,
        "refunded" | "charged_back" => GatewayStatus::Refunded,
        _ => GatewayStatus::Pending,
    }
}

/// Maps preapproval statuses, where `authorized` means the recurring
/// charge is live.
fn map_preapproval_status(mp_status: &str) -> GatewayStatus {
    match mp_status {
        "authorized" => GatewayStatus::Completed,
        "pending" => GatewayStatus::Pending,
        "paused" => GatewayStatus::Pending,
        "cancelled" => GatewayStatus::Cancelled,
        _ => GatewayStatus::Pending,
    }
}

/// One-shot payments via Checkout Pro.
pub struct MercadoPagoGateway {
    client: MpClient,
    webhook_secret: Option<SecretString>,
}

impl MercadoPagoGateway {
    pub fn new(
        base_url: String,
        access_token: SecretString,
        webhook_secret: Option<SecretString>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            client: MpClient::new(base_url, access_token)?,
            webhook_secret,
        })
    }

    fn verify_signature(
        &self,
        payload_id: &str,
        headers: &HashMap<String, String>,
    ) -> Result<(), DomainError> {
        let Some(secret) = &self.webhook_secret else {
            return Ok(());
        };

        let signature = headers
            .get("x-signature")
            .ok_or_else(|| DomainError::validation("missing x-signature header"))?;

        let mut ts = None;
        let mut v1 = None;
        for part in signature.split(',') {
            match part.trim().split_once('=') {
                Some(("ts", value)) => ts = Some(value.to_string()),
                Some(("v1", value)) => v1 = Some(value.to_string()),
                _ => {}
            }
        }
        let (ts, v1) = match (ts, v1) {
            (Some(ts), Some(v1)) => (ts, v1),
            _ => return Err(DomainError::validation("malformed x-signature header")),
        };

        let manifest = format!("id:{};ts:{};", payload_id, ts);
        let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|e| DomainError::internal(format!("hmac key error: {}", e)))?;
        mac.update(manifest.as_bytes());
        let expected = mac.finalize().into_bytes();
        let expected_hex: String = expected.iter().map(|b| format!("{:02x}", b)).collect();

        if expected_hex.as_bytes().ct_eq(v1.as_bytes()).into() {
            Ok(())
        } else {
            Err(DomainError::validation("webhook signature mismatch"))
        }
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    fn name(&self) -> &'static str {
        "mercadopago"
    }

    async fn create_payment(
        &self,
        request: GatewayPaymentRequest,
    ) -> Result<GatewayPaymentResult, DomainError> {
        let mut preference = json!({
            "items": [{
                "title": request.description,
                "quantity": 1,
                "unit_price": request.amount,
                "currency_id": request.currency,
            }],
            "external_reference": request.external_id,
            "auto_return": "approved",
        });
        if let Some(email) = &request.customer_email {
            preference["payer"] = json!({"email": email, "name": request.customer_name});
        }
        if let Some(url) = &request.callback_url {
            preference["back_urls"] = json!({"success": url, "failure": url, "pending": url});
        }
        if let Some(url) = &request.webhook_url {
            preference["notification_url"] = json!(url);
        }

        let payload = self
            .client
            .request(reqwest::Method::POST, "/checkout/preferences", Some(preference))
            .await?;

        let preference_id = payload["id"]
            .as_str()
            .ok_or_else(|| DomainError::upstream("preference response without id"))?;
        Ok(GatewayPaymentResult {
            transaction_id: preference_id.to_string(),
            status: GatewayStatus::Pending,
            payment_url: payload["init_point"].as_str().map(|s| s.to_string()),
            message: "checkout preference created".into(),
        })
    }

    async fn payment_status(
        &self,
        transaction_id: &str,
    ) -> Result<GatewayPaymentStatus, DomainError> {
        let payload = self
            .client
            .request(
                reqwest::Method::GET,
                &format!("/v1/payments/{}", transaction_id),
                None,
            )
            .await?;

        let status = payload["status"].as_str().unwrap_or("pending");
        let processed_at = payload["date_approved"]
            .as_str()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| Timestamp::from_datetime(dt.with_timezone(&chrono::Utc)));

        Ok(GatewayPaymentStatus {
            transaction_id: transaction_id.to_string(),
            status: map_status(status),
            amount: payload["transaction_amount"].as_f64().unwrap_or(0.0),
            currency: payload["currency_id"].as_str().unwrap_or("").to_string(),
            status_detail: payload["status_detail"].as_str().map(|s| s.to_string()),
            processed_at,
        })
    }

    async fn refund_payment(
        &self,
        transaction_id: &str,
        amount: f64,
    ) -> Result<GatewayRefund, DomainError> {
        let payload = self
            .client
            .request(
                reqwest::Method::POST,
                &format!("/v1/payments/{}/refunds", transaction_id),
                Some(json!({"amount": amount})),
            )
            .await?;

        Ok(GatewayRefund {
            refund_id: payload["id"]
                .as_i64()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            transaction_id: transaction_id.to_string(),
            amount,
            status: map_status(payload["status"].as_str().unwrap_or("pending")),
        })
    }

    async fn cancel_payment(&self, transaction_id: &str) -> Result<(), DomainError> {
        self.client
            .request(
                reqwest::Method::PUT,
                &format!("/v1/payments/{}", transaction_id),
                Some(json!({"status": "cancelled"})),
            )
            .await?;
        Ok(())
    }

    async fn process_webhook(
        &self,
        payload: &[u8],
        headers: &HashMap<String, String>,
    ) -> Result<GatewayWebhookEvent, DomainError> {
        let body: JsonValue = serde_json::from_slice(payload)
            .map_err(|e| DomainError::validation(format!("unparseable webhook payload: {}", e)))?;

        // The notification carries a numeric or string payment id.
        let payment_id = match &body["data"]["id"] {
            JsonValue::String(id) => id.clone(),
            JsonValue::Number(id) => id.to_string(),
            _ => return Err(DomainError::validation("webhook without data.id")),
        };

        self.verify_signature(&payment_id, headers)?;

        // The webhook only announces a change; ask for the actual state.
        let status = self.payment_status(&payment_id).await?;
        let action = body["action"].as_str().unwrap_or("payment.updated");

        Ok(GatewayWebhookEvent {
            event_type: action.to_string(),
            transaction_id: payment_id,
            status: status.status,
            amount: status.amount,
            currency: status.currency,
        })
    }

    async fn validate_credentials(&self) -> Result<(), DomainError> {
        self.client
            .request(reqwest::Method::GET, "/v1/payment_methods", None)
            .await?;
        Ok(())
    }
}

/// Recurring billing via Preapprovals.
pub struct MercadoPagoRecurringGateway {
    client: MpClient,
}

impl MercadoPagoRecurringGateway {
    pub fn new(base_url: String, access_token: SecretString) -> Result<Self, DomainError> {
        Ok(Self {
            client: MpClient::new(base_url, access_token)?,
        })
    }
}

#[async_trait]
impl RecurringGateway for MercadoPagoRecurringGateway {
    fn name(&self) -> &'static str {
        "mercadopago"
    }

    async fn create_subscription(
        &self,
        request: RecurringRequest,
    ) -> Result<RecurringResult, DomainError> {
        let mut body = json!({
            "reason": request.reason,
            "external_reference": request.external_id,
            "auto_recurring": {
                "frequency": request.frequency,
                "frequency_type": request.frequency_type,
                "transaction_amount": request.amount,
                "currency_id": request.currency,
            },
            "status": "pending",
        });
        if let Some(email) = &request.customer_email {
            body["payer_email"] = json!(email);
        }

        let payload = self
            .client
            .request(reqwest::Method::POST, "/preapproval", Some(body))
            .await?;

        let subscription_id = payload["id"]
            .as_str()
            .ok_or_else(|| DomainError::upstream("preapproval response without id"))?;
        Ok(RecurringResult {
            subscription_id: subscription_id.to_string(),
            status: map_status(payload["status"].as_str().unwrap_or("pending")),
            init_point: payload["init_point"].as_str().map(|s| s.to_string()),
            message: "preapproval created".into(),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), DomainError> {
        self.set_status(subscription_id, "cancelled").await
    }

    async fn pause_subscription(&self, subscription_id: &str) -> Result<(), DomainError> {
        self.set_status(subscription_id, "paused").await
    }

    async fn resume_subscription(&self, subscription_id: &str) -> Result<(), DomainError> {
        self.set_status(subscription_id, "authorized").await
    }

    async fn process_subscription_webhook(
        &self,
        payload: &[u8],
        _headers: &HashMap<String, String>,
    ) -> Result<RecurringWebhookEvent, DomainError> {
        let body: JsonValue = serde_json::from_slice(payload)
            .map_err(|e| DomainError::validation(format!("unparseable webhook payload: {}", e)))?;

        let preapproval_id = match &body["data"]["id"] {
            JsonValue::String(id) => id.clone(),
            JsonValue::Number(id) => id.to_string(),
            _ => return Err(DomainError::validation("webhook without data.id")),
        };

        let state = self
            .client
            .request(
                reqwest::Method::GET,
                &format!("/preapproval/{}", preapproval_id),
                None,
            )
            .await?;

        Ok(RecurringWebhookEvent {
            event_type: body["action"]
                .as_str()
                .unwrap_or("subscription_preapproval.updated")
                .to_string(),
            subscription_id: preapproval_id,
            status: map_preapproval_status(state["status"].as_str().unwrap_or("pending")),
        })
    }

    async fn validate_credentials(&self) -> Result<(), DomainError> {
        self.client
            .request(reqwest::Method::GET, "/v1/payment_methods", None)
            .await?;
        Ok(())
    }
}

impl MercadoPagoRecurringGateway {
    async fn set_status(&self, subscription_id: &str, status: &str) -> Result<(), DomainError> {
        self.client
            .request(
                reqwest::Method::PUT,
                &format!("/preapproval/{}", subscription_id),
                Some(json!({"status": status})),
            )
            .await?;
        Ok(())
    }
}
