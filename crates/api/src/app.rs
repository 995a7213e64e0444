use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use chrono::Duration as ChronoDuration;
use domain::services::{Aggregator, AggregatorConfig};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id, RateLimiterState};
use crate::routes::{devices, efficiency, health, shifts, telemetry};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub aggregator: Arc<Aggregator>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

/// Build the shared aggregator from configuration.
pub fn build_aggregator(config: &Config) -> Arc<Aggregator> {
    Arc::new(Aggregator::new(AggregatorConfig {
        max_sample_gap: ChronoDuration::seconds(config.telemetry.max_sample_gap_secs as i64),
        track_idle_after: ChronoDuration::minutes(config.limits.track_idle_eviction_mins as i64),
    }))
}

pub fn create_app(config: Config, pool: PgPool, aggregator: Arc<Aggregator>) -> Router {
    let config = Arc::new(config);

    // Rate limiting is enabled when rate_limit_per_minute > 0
    let rate_limiter = if config.security.rate_limit_per_minute > 0 {
        Some(Arc::new(RateLimiterState::new(
            config.security.rate_limit_per_minute,
        )))
    } else {
        None
    };

    let state = AppState {
        pool,
        config: config.clone(),
        aggregator,
        rate_limiter,
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production: only allow specified origins
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Versioned API routes
    let api_routes = Router::new()
        // Telemetry intake (v1)
        .route("/api/v1/telemetry", post(telemetry::ingest_sample))
        .route("/api/v1/telemetry/batch", post(telemetry::ingest_batch))
        // Shift definition routes (v1)
        .route(
            "/api/v1/organizations/:org_id/shifts",
            post(shifts::create_shift).get(shifts::list_shifts),
        )
        .route(
            "/api/v1/organizations/:org_id/shifts/:shift_id",
            put(shifts::update_shift).delete(shifts::delete_shift),
        )
        // Device registry routes (v1)
        .route(
            "/api/v1/organizations/:org_id/devices",
            post(devices::register_device).get(devices::list_devices),
        )
        // Efficiency dashboard (v1)
        .route(
            "/api/v1/organizations/:org_id/efficiency",
            get(efficiency::list_efficiency),
        );

    // Public operational routes
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Merge all routes
    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware)) // Prometheus metrics
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id)) // Request ID and logging
        .layer(cors)
        .with_state(state)
}
