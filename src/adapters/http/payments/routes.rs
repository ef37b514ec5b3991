//! Payment route table.
//!
//! Token routes: create/process/recurring, own reads, sync.
//! Admin routes: listing, by-status, manual transitions, refunds.
//! Webhooks are open; the gateway signature authenticates them.

use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;

use crate::adapters::http::middleware::{auth_middleware, AuthState};

use super::handlers::{self, PaymentsAppState};

pub fn payments_router(state: PaymentsAppState, verifier: AuthState) -> Router {
    let payments = Router::new()
        .route(
            "/payments",
            get(handlers::list_payments).post(handlers::create_payment),
        )
        .route("/payments/process", post(handlers::process_payment))
        .route("/payments/recurring", post(handlers::process_recurring))
        .route("/payments/entity", get(handlers::get_payments_by_entity))
        .route("/payments/user/:user_id", get(handlers::get_payments_by_user))
        .route("/payments/status/:status", get(handlers::get_payments_by_status))
        .route("/payments/:id", get(handlers::get_payment))
        .route("/payments/:id/status", patch(handlers::update_payment_status))
        .route("/payments/:id/approve", post(handlers::approve_cash))
        .route("/payments/:id/reject", post(handlers::reject_cash))
        .route("/payments/:id/sync", get(handlers::sync_payment))
        .route("/payments/:id/refund", post(handlers::refund_payment))
        .layer(middleware::from_fn_with_state(verifier, auth_middleware));

    // No auth middleware on webhooks; signatures are checked gateway-side.
    let webhooks = Router::new().route("/webhooks/:gateway", post(handlers::handle_webhook));

    payments.merge(webhooks).with_state(state)
}
