//! HTTP middleware.

mod auth;

pub use auth::{auth_middleware, AuthState, BearerToken, RequireAdmin, RequireAuth};
