//! Activity & enrollment service entry point.
//!
//! Serves the activity catalog (5-minute list cache), runs the
//! enrollment transaction against the subscription service, and
//! consumes `subscription.delete` to cascade-deactivate enrollments.
//! Default port 8083.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use gym_platform::adapters::auth::JwtTokenService;
use gym_platform::adapters::clients::HttpSubscriptionLookup;
use gym_platform::adapters::events::{RedisEventBus, RedisEventSubscriber, RedisHealth};
use gym_platform::adapters::http::activities::{activities_router, ActivitiesAppState};
use gym_platform::adapters::http::{cors_layer, health_routes, HealthIndicator, HealthRegistry};
use gym_platform::adapters::postgres::{PgActivityRepository, PgEnrollmentRepository, PgHealth};
use gym_platform::application::activities::{
    ActivityService, CachedActivityService, ACTIVITY_CACHE_SWEEP,
};
use gym_platform::application::cache::TtlCache;
use gym_platform::application::enrollments::EnrollmentService;
use gym_platform::application::subscription_events::{
    SubscriptionCancelledHandler, SUBSCRIPTION_CANCELLED_KEY,
};
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

    let activity_repo = Arc::new(PgActivityRepository::new(pool.clone()));
    let enrollment_repo = Arc::new(PgEnrollmentRepository::new(pool.clone()));

    let activities = Arc::new(CachedActivityService::new(ActivityService::new(
        activity_repo.clone(),
        bus.clone(),
    )));
    TtlCache::spawn_sweeper(activities.cache(), ACTIVITY_CACHE_SWEEP);

    let enrollments = Arc::new(EnrollmentService::new(
        enrollment_repo,
        activity_repo,
        Arc::new(HttpSubscriptionLookup::new(
            config.peers.subscriptions_url.clone(),
        )?),
        bus,
    ));

    // Cascade consumer: a cancelled subscription deactivates every
    // enrollment of that user.
    let consumer = RedisEventSubscriber::new(&config.redis.url)?;
    consumer
        .subscribe(
            SUBSCRIPTION_CANCELLED_KEY,
            Arc::new(SubscriptionCancelledHandler::new(enrollments.clone())),
        )
        .await?;

    let tokens = Arc::new(JwtTokenService::new(
        config.auth.jwt_secret.clone(),
        config.auth.issuer.clone(),
        config.auth.token_ttl_minutes,
    ));

    let health = HealthRegistry::new(
        "activities-api",
        vec![
            (
                "database",
                Arc::new(PgHealth::new(pool.clone())) as Arc<dyn HealthIndicator>,
            ),
            ("broker", broker_health as Arc<dyn HealthIndicator>),
        ],
    );

    let app = activities_router(
        ActivitiesAppState {
            activities,
            enrollments,
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
    tracing::info!(%addr, "activities-api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
