//! Common test utilities for integration tests.
//!
//! These tests run against a real PostgreSQL database. They are skipped
//! (pass without doing anything) when `TEST_DATABASE_URL` is not set, so
//! the unit suite stays runnable without infrastructure.

// Helper utilities intentionally available even where a given test file
// does not use all of them.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use chrono::Utc;
use mill_metrics_api::app::{build_aggregator, create_app};
use mill_metrics_api::config::Config;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

/// Connect to the test database, or `None` when `TEST_DATABASE_URL` is
/// unset and the test should be skipped.
pub async fn try_create_test_pool() -> Option<PgPool> {
    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping integration test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");
    Some(pool)
}

/// Run migrations on the test database.
pub async fn run_migrations(pool: &PgPool) {
    let migration_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("persistence/src/migrations");

    let mut entries: Vec<_> = std::fs::read_dir(&migration_dir)
        .expect("Failed to read migrations directory")
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "sql").unwrap_or(false))
        .collect();

    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let sql = std::fs::read_to_string(entry.path()).expect("Failed to read migration file");

        // Migration might already be applied; ignore errors
        sqlx::raw_sql(&sql)
            .execute(pool)
            .await
            .unwrap_or_else(|_| sqlx::postgres::PgQueryResult::default());
    }
}

/// Test configuration with rate limiting disabled.
pub fn test_config() -> Config {
    let url = std::env::var("TEST_DATABASE_URL").unwrap_or_default();
    Config::load_for_test(&[
        ("database.url", url.as_str()),
        ("security.rate_limit_per_minute", "0"),
        ("logging.format", "pretty"),
    ])
    .expect("Failed to build test config")
}

/// Build the full application router against the test database, or `None`
/// when the test should be skipped.
///
/// Each call gets a fresh in-memory aggregator, so tests are isolated as
/// long as they use unique organization and device ids.
pub async fn try_setup_app() -> Option<(Router, PgPool)> {
    let pool = try_create_test_pool().await?;
    run_migrations(&pool).await;

    let config = test_config();
    let aggregator = build_aggregator(&config);
    let app = create_app(config, pool.clone(), aggregator);
    Some((app, pool))
}

/// Delete all rows belonging to one test organization, respecting
/// foreign-key order.
pub async fn cleanup_org(pool: &PgPool, org_id: Uuid) {
    for sql in [
        "DELETE FROM metric_buckets WHERE organization_id = $1",
        "DELETE FROM shift_definitions WHERE organization_id = $1",
        "DELETE FROM devices WHERE organization_id = $1",
    ] {
        sqlx::query(sql).bind(org_id).execute(pool).await.ok();
    }
}

/// Build a JSON request.
pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a GET request.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a DELETE request.
pub fn delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to parse a JSON response body.
pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}

/// Create a shift definition via the API and return the response body.
pub async fn create_test_shift(
    app: &Router,
    org_id: Uuid,
    shift_type: &str,
    start_time: &str,
    end_time: &str,
) -> (axum::http::StatusCode, serde_json::Value) {
    let request = json_request(
        Method::POST,
        &format!("/api/v1/organizations/{}/shifts", org_id),
        serde_json::json!({
            "shiftType": shift_type,
            "startTime": start_time,
            "endTime": end_time
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

/// Register a device via the API and return the response body.
pub async fn register_test_device(
    app: &Router,
    org_id: Uuid,
    device_id: Uuid,
    name: &str,
) -> serde_json::Value {
    let request = json_request(
        Method::POST,
        &format!("/api/v1/organizations/{}/devices", org_id),
        serde_json::json!({
            "deviceId": device_id,
            "name": name
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.status(),
        axum::http::StatusCode::CREATED,
        "Device registration failed"
    );
    parse_response_body(response).await
}

/// Post one telemetry sample and return (status, body).
pub async fn ingest_sample(
    app: &Router,
    device_id: Uuid,
    org_id: Uuid,
    timestamp_ms: i64,
    running: bool,
    rpm: f64,
) -> (axum::http::StatusCode, serde_json::Value) {
    let request = json_request(
        Method::POST,
        "/api/v1/telemetry",
        serde_json::json!({
            "deviceId": device_id,
            "organizationId": org_id,
            "timestamp": timestamp_ms,
            "running": running,
            "rpm": rpm
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

/// Timestamp helper: `minutes_ago` minutes before now, in epoch millis.
pub fn millis_ago(minutes_ago: i64) -> i64 {
    (Utc::now() - chrono::Duration::minutes(minutes_ago)).timestamp_millis()
}

/// Set up an org with full-day shift coverage (DAY 08:00-20:00 plus a
/// wrapping NIGHT 20:00-08:00) and one registered device.
///
/// Full coverage means "now"-relative samples always classify, whatever
/// wall-clock time the test happens to run at.
pub async fn setup_covered_org(app: &Router) -> (Uuid, Uuid) {
    let org_id = Uuid::new_v4();
    let device_id = Uuid::new_v4();

    let (status, body) = create_test_shift(app, org_id, "DAY", "08:00:00", "20:00:00").await;
    assert_eq!(status, axum::http::StatusCode::CREATED, "{:?}", body);
    let (status, body) = create_test_shift(app, org_id, "NIGHT", "20:00:00", "08:00:00").await;
    assert_eq!(status, axum::http::StatusCode::CREATED, "{:?}", body);

    register_test_device(app, org_id, device_id, "Loom 12").await;

    (org_id, device_id)
}
