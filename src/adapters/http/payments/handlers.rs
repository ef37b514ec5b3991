//! Payment HTTP handlers.
//!
//! Boundary authorization lives here: reads are owner-or-admin, the
//! listing and manual-transition paths are admin-only, webhooks carry no
//! bearer token at all (the gateway signature is their authentication).

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::adapters::http::middleware::{RequireAdmin, RequireAuth};
use crate::adapters::http::{ApiError, ApiResult};
use crate::application::payments::{CreatePaymentCommand, PaymentService, WebhookOutcome};
use crate::domain::foundation::{AuthenticatedUser, DomainError, PaymentId, UserId};
use crate::domain::payments::{Payment, PaymentStatus};

use super::dto::{
    CreatePaymentRequest, EntityQuery, RecurringPaymentRequest, RefundRequest,
    UpdatePaymentStatusRequest,
};

#[derive(Clone)]
pub struct PaymentsAppState {
    pub payments: Arc<PaymentService>,
}

fn parse_payment_id(raw: &str) -> Result<PaymentId, ApiError> {
    PaymentId::from_str(raw).map_err(|_| ApiError(DomainError::validation("invalid payment id")))
}

/// Resolves the payment's owner from the request body against the
/// caller: plain users may only pay for themselves.
fn resolve_owner(
    caller: &AuthenticatedUser,
    requested: Option<i64>,
) -> Result<UserId, ApiError> {
    let owner = requested.map(UserId::new).unwrap_or(caller.user_id);
    if !caller.can_access_resource_of(owner) {
        return Err(ApiError(DomainError::authorization(
            "you can only create payments for yourself",
        )));
    }
    Ok(owner)
}

fn command(
    request: CreatePaymentRequest,
    owner: UserId,
) -> Result<CreatePaymentCommand, ApiError> {
    Ok(CreatePaymentCommand {
        entity_type: request.entity_type().map_err(ApiError)?,
        entity_id: request.entity_id,
        user_id: owner,
        amount: request.amount,
        currency: request.currency,
        payment_method: request.payment_method,
        payment_gateway: request.payment_gateway,
        idempotency_key: request.idempotency_key,
        metadata: request.metadata,
        callback_url: request.callback_url,
        webhook_url: request.webhook_url,
    })
}

pub async fn create_payment(
    State(state): State<PaymentsAppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    let owner = resolve_owner(&caller, request.user_id)?;
    let payment = state
        .payments
        .create_basic(command(request, owner)?)
        .await
        .map_err(ApiError)?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn process_payment(
    State(state): State<PaymentsAppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<CreatePaymentRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    let owner = resolve_owner(&caller, request.user_id)?;
    let payment = state
        .payments
        .process_one_time(command(request, owner)?)
        .await
        .map_err(ApiError)?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn process_recurring(
    State(state): State<PaymentsAppState>,
    RequireAuth(caller): RequireAuth,
    Json(request): Json<RecurringPaymentRequest>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    let owner = resolve_owner(&caller, request.payment.user_id)?;
    let frequency = request.frequency;
    let frequency_type = request.frequency_type.clone();
    let payment = state
        .payments
        .process_recurring(command(request.payment, owner)?, frequency, &frequency_type)
        .await
        .map_err(ApiError)?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn get_payment(
    State(state): State<PaymentsAppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<String>,
) -> ApiResult<Json<Payment>> {
    let payment = state
        .payments
        .get(parse_payment_id(&id)?)
        .await
        .map_err(ApiError)?;

    if !caller.can_access_resource_of(payment.user_id) {
        return Err(ApiError(DomainError::authorization(
            "you don't have permission to view this payment",
        )));
    }
    Ok(Json(payment))
}

pub async fn list_payments(
    State(state): State<PaymentsAppState>,
    RequireAdmin(_caller): RequireAdmin,
) -> ApiResult<Json<Vec<Payment>>> {
    let payments = state.payments.list_all().await.map_err(ApiError)?;
    Ok(Json(payments))
}

pub async fn get_payments_by_user(
    State(state): State<PaymentsAppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Vec<Payment>>> {
    let user_id = UserId::new(user_id);
    if !caller.can_access_resource_of(user_id) {
        return Err(ApiError(DomainError::authorization(
            "you can only view your own payments",
        )));
    }

    let payments = state
        .payments
        .get_by_user(user_id)
        .await
        .map_err(ApiError)?;
    Ok(Json(payments))
}

pub async fn get_payments_by_entity(
    State(state): State<PaymentsAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Query(query): Query<EntityQuery>,
) -> ApiResult<Json<Vec<Payment>>> {
    let entity_type = crate::domain::payments::EntityType::parse(&query.entity_type)
        .ok_or_else(|| ApiError(DomainError::validation("unknown entity_type")))?;
    let payments = state
        .payments
        .get_by_entity(entity_type, &query.entity_id)
        .await
        .map_err(ApiError)?;
    Ok(Json(payments))
}

pub async fn get_payments_by_status(
    State(state): State<PaymentsAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Path(status): Path<String>,
) -> ApiResult<Json<Vec<Payment>>> {
    let status = PaymentStatus::parse(&status)
        .ok_or_else(|| ApiError(DomainError::validation(format!("unknown status: {}", status))))?;
    let payments = state
        .payments
        .get_by_status(status)
        .await
        .map_err(ApiError)?;
    Ok(Json(payments))
}

pub async fn update_payment_status(
    State(state): State<PaymentsAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Path(id): Path<String>,
    Json(request): Json<UpdatePaymentStatusRequest>,
) -> ApiResult<Json<Payment>> {
    let payment = state
        .payments
        .update_status(
            parse_payment_id(&id)?,
            request.status().map_err(ApiError)?,
            request.transaction_id,
        )
        .await
        .map_err(ApiError)?;
    Ok(Json(payment))
}

pub async fn approve_cash(
    State(state): State<PaymentsAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Payment>> {
    let payment = state
        .payments
        .approve_cash(parse_payment_id(&id)?)
        .await
        .map_err(ApiError)?;
    Ok(Json(payment))
}

pub async fn reject_cash(
    State(state): State<PaymentsAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Path(id): Path<String>,
) -> ApiResult<Json<Payment>> {
    let payment = state
        .payments
        .reject_cash(parse_payment_id(&id)?)
        .await
        .map_err(ApiError)?;
    Ok(Json(payment))
}

pub async fn sync_payment(
    State(state): State<PaymentsAppState>,
    RequireAuth(caller): RequireAuth,
    Path(id): Path<String>,
) -> ApiResult<Json<Payment>> {
    let id = parse_payment_id(&id)?;
    let current = state.payments.get(id).await.map_err(ApiError)?;
    if !caller.can_access_resource_of(current.user_id) {
        return Err(ApiError(DomainError::authorization(
            "you don't have permission to sync this payment",
        )));
    }

    let payment = state.payments.sync_with_gateway(id).await.map_err(ApiError)?;
    Ok(Json(payment))
}

pub async fn refund_payment(
    State(state): State<PaymentsAppState>,
    RequireAdmin(_caller): RequireAdmin,
    Path(id): Path<String>,
    Json(request): Json<RefundRequest>,
) -> ApiResult<Json<Payment>> {
    let payment = state
        .payments
        .refund(parse_payment_id(&id)?, request.amount)
        .await
        .map_err(ApiError)?;
    Ok(Json(payment))
}

// ------------------------------------------------------------------
// Webhooks
// ------------------------------------------------------------------

/// `POST /webhooks/:gateway`.
///
/// Always answers 2xx once the payload parsed, even for unknown
/// payments - anything else makes the gateway retry forever.
pub async fn handle_webhook(
    State(state): State<PaymentsAppState>,
    Path(gateway): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    let outcome = state
        .payments
        .process_webhook(&gateway, &body, &headers)
        .await
        .map_err(ApiError)?;

    let message = match outcome {
        WebhookOutcome::Updated { payment_id, status } => {
            serde_json::json!({
                "status": "ok",
                "payment_id": payment_id,
                "new_status": status.as_str(),
            })
        }
        WebhookOutcome::Unchanged => serde_json::json!({"status": "ok"}),
        WebhookOutcome::PaymentNotFound => {
            serde_json::json!({"status": "payment not found, webhook received"})
        }
        WebhookOutcome::Ignored => serde_json::json!({"status": "ignored"}),
    };
    Ok(Json(message))
}
