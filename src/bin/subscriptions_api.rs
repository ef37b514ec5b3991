//! Plan & subscription service entry point.
//!
//! Serves the plan catalog and subscription lifecycle, consumes
//! `payment.*` events to advance subscription state, and keeps the
//! active-plan listing in a 1-hour cache. Default port 8081.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use gym_platform::adapters::auth::JwtTokenService;
use gym_platform::adapters::events::{RedisEventBus, RedisEventSubscriber, RedisHealth};
use gym_platform::adapters::http::plans::{plans_router, PlansAppState};
use gym_platform::adapters::http::{cors_layer, health_routes, HealthIndicator, HealthRegistry};
use gym_platform::adapters::postgres::{PgHealth, PgPlanRepository, PgSubscriptionRepository};
use gym_platform::application::cache::TtlCache;
use gym_platform::application::payment_events::{PaymentEventProcessor, PAYMENT_EVENTS_PATTERN};
use gym_platform::application::plans::{CachedPlanService, PlanService, PLAN_CACHE_SWEEP};
use gym_platform::application::subscriptions::SubscriptionService;
use gym_platform::config::AppConfig;
use gym_platform::ports::EventSubscriber;

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

    let plan_repo = Arc::new(PgPlanRepository::new(pool.clone()));
    let plans = Arc::new(CachedPlanService::new(PlanService::new(plan_repo.clone())));
    TtlCache::spawn_sweeper(plans.cache(), PLAN_CACHE_SWEEP);

    let subscriptions = Arc::new(SubscriptionService::new(
        Arc::new(PgSubscriptionRepository::new(pool.clone())),
        plan_repo,
        bus.clone(),
    ));

    // payment.* consumer: completed activates, failed records, refunded
    // cancels.
    let consumer = RedisEventSubscriber::new(&config.redis.url)?;
    consumer
        .subscribe(
            PAYMENT_EVENTS_PATTERN,
            Arc::new(PaymentEventProcessor::new(subscriptions.clone())),
        )
        .await?;

    let tokens = Arc::new(JwtTokenService::new(
        config.auth.jwt_secret.clone(),
        config.auth.issuer.clone(),
        config.auth.token_ttl_minutes,
    ));

    let health = HealthRegistry::new(
        "subscriptions-api",
        vec![
            (
                "database",
                Arc::new(PgHealth::new(pool.clone())) as Arc<dyn HealthIndicator>,
            ),
            ("broker", broker_health as Arc<dyn HealthIndicator>),
        ],
    );

    let app = plans_router(
        PlansAppState {
            plans,
            subscriptions,
        },
        tokens,
    )
    .merge(health_routes(health))
    .layer(TraceLayer::new_for_http())
    .layer(TimeoutLayer::new(Duration::from_secs(
        config.server.request_timeout_secs,
    )))
    .layer(cors_layer(&config.server));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "subscriptions-api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
