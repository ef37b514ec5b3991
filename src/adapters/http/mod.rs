//! HTTP adapters: per-service routers, auth middleware, error mapping,
//! and the health endpoint.

pub mod activities;
mod error;
mod health;
pub mod identity;
pub mod middleware;
pub mod payments;
pub mod plans;

pub use error::{ApiError, ApiResult};
pub use health::{health_routes, HealthIndicator, HealthRegistry};

use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;

/// CORS layer from configuration; unset origins mean allow-any, which
/// matches how the services are fronted in development.
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<http::HeaderValue> = config
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
