//! Health endpoint.
//!
//! `GET /healthz` answers 200 while every registered dependency check
//! passes, 503 otherwise, with a per-check breakdown in the body.

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

/// A critical dependency that can be probed.
#[async_trait]
pub trait HealthIndicator: Send + Sync {
    async fn healthy(&self) -> bool;
}

/// Named indicators for one service binary.
#[derive(Clone)]
pub struct HealthRegistry {
    service: &'static str,
    indicators: Arc<Vec<(&'static str, Arc<dyn HealthIndicator>)>>,
}

impl HealthRegistry {
    pub fn new(
        service: &'static str,
        indicators: Vec<(&'static str, Arc<dyn HealthIndicator>)>,
    ) -> Self {
        Self {
            service,
            indicators: Arc::new(indicators),
        }
    }
}

pub fn health_routes(registry: HealthRegistry) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .with_state(registry)
}

async fn healthz(State(registry): State<HealthRegistry>) -> impl IntoResponse {
    let mut checks = serde_json::Map::new();
    let mut all_up = true;
    for (name, indicator) in registry.indicators.iter() {
        let up = indicator.healthy().await;
        all_up &= up;
        checks.insert(
            name.to_string(),
            serde_json::Value::String(if up { "up" } else { "down" }.into()),
        );
    }

    let status = if all_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "status": if all_up { "healthy" } else { "degraded" },
            "service": registry.service,
            "checks": checks,
        })),
    )
}
