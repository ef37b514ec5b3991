//! Identity route table.
//!
//! - `POST /register` - open
//! - `POST /login` - open
//! - `GET /users/:id` - token
//! - `GET /users` - token

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::adapters::http::middleware::{auth_middleware, AuthState};

use super::handlers::{self, IdentityAppState};

pub fn identity_router(state: IdentityAppState, verifier: AuthState) -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/users", get(handlers::list_users))
        .route("/users/:id", get(handlers::get_user))
        .with_state(state)
        .layer(middleware::from_fn_with_state(verifier, auth_middleware))
}
