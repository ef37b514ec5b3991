//! Plan & subscription route table.
//!
//! Plans:
//! - `GET /plans`, `GET /plans/:id` - open
//! - `POST /plans`, `PUT /plans/:id`, `DELETE /plans/:id`,
//!   `PATCH /plans/:id/toggle` - admin
//!
//! Subscriptions (token, owner-or-admin where a target user exists):
//! - `POST /subscriptions`
//! - `GET /subscriptions/:id`
//! - `GET /subscriptions/active/:user_id`
//! - `GET /subscriptions/user/:user_id`
//! - `PATCH /subscriptions/:id/status`
//! - `DELETE /subscriptions/:id`

use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;

use crate::adapters::http::middleware::{auth_middleware, AuthState};

use super::handlers::{self, PlansAppState};

pub fn plans_router(state: PlansAppState, verifier: AuthState) -> Router {
    Router::new()
        .route("/plans", get(handlers::list_plans).post(handlers::create_plan))
        .route(
            "/plans/:id",
            get(handlers::get_plan)
                .put(handlers::update_plan)
                .delete(handlers::delete_plan),
        )
        .route("/plans/:id/toggle", patch(handlers::toggle_plan))
        .route("/subscriptions", post(handlers::create_subscription))
        .route(
            "/subscriptions/:id",
            get(handlers::get_subscription).delete(handlers::cancel_subscription),
        )
        .route(
            "/subscriptions/:id/status",
            patch(handlers::update_subscription_status),
        )
        .route(
            "/subscriptions/active/:user_id",
            get(handlers::get_active_subscription),
        )
        .route(
            "/subscriptions/user/:user_id",
            get(handlers::list_subscriptions_by_user),
        )
        .with_state(state)
        .layer(middleware::from_fn_with_state(verifier, auth_middleware))
}
