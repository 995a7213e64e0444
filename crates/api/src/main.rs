use anyhow::Result;
use tracing::info;

use mill_metrics_api::jobs::flush_buckets::FlushBucketsJob;
use mill_metrics_api::jobs::pool_metrics::PoolMetricsJob;
use mill_metrics_api::jobs::purge_buckets::PurgeBucketsJob;
use mill_metrics_api::jobs::scheduler::JobScheduler;
use mill_metrics_api::{app, config, middleware};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::load()?;

    // Initialize logging
    middleware::logging::init_logging(&config.logging);

    info!("Starting Mill Metrics API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics recorder
    middleware::init_metrics();

    // Create database pool
    let pool = persistence::db::create_pool(&config.database_config()).await?;

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    // Shared aggregation state for the ingestion path and the flush job
    let aggregator = app::build_aggregator(&config);

    // Start background jobs
    let mut scheduler = JobScheduler::new();
    scheduler.register(FlushBucketsJob::new(pool.clone(), aggregator.clone()));
    scheduler.register(PurgeBucketsJob::new(
        pool.clone(),
        config.limits.bucket_retention_days,
    ));
    scheduler.register(PoolMetricsJob::new(pool.clone(), aggregator.clone()));
    scheduler.start();

    // Build application
    let app = app::create_app(config.clone(), pool, aggregator);

    // Start server
    let addr = config.socket_addr();
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    scheduler.shutdown();
    scheduler
        .wait_for_shutdown(std::time::Duration::from_secs(10))
        .await;

    Ok(())
}
