//! Identity service entry point.
//!
//! Issues and validates the bearer tokens every other service trusts.
//! Default port 8080; configure with `GYM__SERVER__PORT`.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use gym_platform::adapters::auth::JwtTokenService;
use gym_platform::adapters::http::identity::{identity_router, IdentityAppState};
use gym_platform::adapters::http::{cors_layer, health_routes, HealthIndicator, HealthRegistry};
use gym_platform::adapters::postgres::{PgHealth, PgUserRepository};
use gym_platform::application::identity::IdentityService;
use gym_platform::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.server.log_level)
                }),
        )
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect(&config.database.url)
        .await?;

    let tokens = Arc::new(JwtTokenService::new(
        config.auth.jwt_secret.clone(),
        config.auth.issuer.clone(),
        config.auth.token_ttl_minutes,
    ));
    let identity = Arc::new(IdentityService::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        tokens.clone(),
    ));

    let health = HealthRegistry::new(
        "users-api",
        vec![(
            "database",
            Arc::new(PgHealth::new(pool.clone())) as Arc<dyn HealthIndicator>,
        )],
    );

    let app = identity_router(IdentityAppState { identity }, tokens)
        .merge(health_routes(health))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(&config.server));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "users-api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
