//! Payment service entry point.
//!
//! Owns the payment lifecycle and the gateway integrations, receives
//! gateway webhooks, and publishes `payment.*` events. Default port
//! 8082.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use gym_platform::adapters::auth::JwtTokenService;
use gym_platform::adapters::events::{RedisEventBus, RedisHealth};
use gym_platform::adapters::gateways::GatewayFactory;
use gym_platform::adapters::http::payments::{payments_router, PaymentsAppState};
use gym_platform::adapters::http::{cors_layer, health_routes, HealthIndicator, HealthRegistry};
use gym_platform::adapters::postgres::{PgHealth, PgPaymentRepository};
use gym_platform::application::payments::PaymentService;
use gym_platform::config::AppConfig;
use gym_platform::ports::GatewayProvider;

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

    let bus = Arc::new(RedisEventBus::connect(&config.redis.url).await?);
    let broker_health = Arc::new(RedisHealth::new(&bus));

    let factory = Arc::new(GatewayFactory::new(config.payment.clone()));

    // Surface bad gateway credentials at startup instead of on the
    // first charge.
    if config.payment.mercadopago_access_token.is_some() {
        match factory.create("mercadopago") {
            Ok(gateway) => {
                if let Err(err) = gateway.validate_credentials().await {
                    tracing::warn!(error = %err, "mercadopago credential check failed");
                }
            }
            Err(err) => tracing::warn!(error = %err, "mercadopago gateway unavailable"),
        }
    }

    let payments = Arc::new(PaymentService::new(
        Arc::new(PgPaymentRepository::new(pool.clone())),
        factory,
        bus,
    ));

    let tokens = Arc::new(JwtTokenService::new(
        config.auth.jwt_secret.clone(),
        config.auth.issuer.clone(),
        config.auth.token_ttl_minutes,
    ));

    let health = HealthRegistry::new(
        "payments-api",
        vec![
            (
                "database",
                Arc::new(PgHealth::new(pool.clone())) as Arc<dyn HealthIndicator>,
            ),
            ("broker", broker_health as Arc<dyn HealthIndicator>),
        ],
    );

    let app = payments_router(PaymentsAppState { payments }, tokens)
        .merge(health_routes(health))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors_layer(&config.server));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "payments-api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
