//! Integration tests for telemetry intake.

mod common;

use axum::http::{Method, StatusCode};
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_ingest_sample_accepted() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    let (org_id, device_id) = common::setup_covered_org(&app).await;

    let (status, body) =
        common::ingest_sample(&app, device_id, org_id, common::millis_ago(1), true, 1200.0).await;
    assert_eq!(status, StatusCode::OK, "{:?}", body);
    assert_eq!(body["accepted"], true);
    let bucket = &body["bucket"];
    assert_eq!(bucket["deviceId"], device_id.to_string());
    assert_eq!(bucket["currentRpm"], 1200.0);
    // First sample for the device opens its bucket with zero accrual.
    assert_eq!(bucket["powerOnMinutes"], 0.0);
    assert_eq!(bucket["runningMinutes"], 0.0);
    assert_eq!(bucket["efficiency"], 0.0);

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
async fn test_ingest_accrues_minutes_from_previous_sample() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    let (org_id, device_id) = common::setup_covered_org(&app).await;

    // First sample: machine powered but idle.
    let (status, _) =
        common::ingest_sample(&app, device_id, org_id, common::millis_ago(10), false, 0.0).await;
    assert_eq!(status, StatusCode::OK);

    // Ten minutes later it reports running. The elapsed interval counts as
    // power-on but not running, because the machine was idle during it.
    let (status, body) =
        common::ingest_sample(&app, device_id, org_id, common::millis_ago(0), true, 1500.0).await;
    assert_eq!(status, StatusCode::OK, "{:?}", body);
    assert_eq!(body["accepted"], true);

    let power = body["bucket"]["powerOnMinutes"].as_f64().unwrap();
    let running = body["bucket"]["runningMinutes"].as_f64().unwrap();
    assert!((power - 10.0).abs() < 0.1, "powerOnMinutes = {}", power);
    assert!(running < 0.1, "runningMinutes = {}", running);
    assert_eq!(body["bucket"]["efficiency"], 0.0);

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
async fn test_ingest_running_interval_counts_toward_efficiency() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    let (org_id, device_id) = common::setup_covered_org(&app).await;

    let (status, _) =
        common::ingest_sample(&app, device_id, org_id, common::millis_ago(10), true, 1500.0).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        common::ingest_sample(&app, device_id, org_id, common::millis_ago(0), false, 0.0).await;
    assert_eq!(status, StatusCode::OK, "{:?}", body);

    let power = body["bucket"]["powerOnMinutes"].as_f64().unwrap();
    let running = body["bucket"]["runningMinutes"].as_f64().unwrap();
    assert!((power - 10.0).abs() < 0.1);
    assert!((running - 10.0).abs() < 0.1);
    assert_eq!(body["bucket"]["efficiency"].as_f64().unwrap(), 100.0);

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
async fn test_ingest_stale_sample_dropped() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    let (org_id, device_id) = common::setup_covered_org(&app).await;

    let (status, _) =
        common::ingest_sample(&app, device_id, org_id, common::millis_ago(5), true, 1000.0).await;
    assert_eq!(status, StatusCode::OK);

    // Older than the last accepted sample.
    let (status, body) =
        common::ingest_sample(&app, device_id, org_id, common::millis_ago(20), true, 1000.0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], false);
    assert_eq!(body["reason"], "stale_sample");

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
async fn test_ingest_without_shift_coverage_dropped() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    // Device registered, but the organization has no shift definitions.
    let org_id = Uuid::new_v4();
    let device_id = Uuid::new_v4();
    common::register_test_device(&app, org_id, device_id, "Loom 7").await;

    let (status, body) =
        common::ingest_sample(&app, device_id, org_id, common::millis_ago(1), true, 900.0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], false);
    assert_eq!(body["reason"], "no_shift_window");

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
async fn test_ingest_unregistered_device_rejected() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    let org_id = Uuid::new_v4();

    let (status, body) =
        common::ingest_sample(&app, Uuid::new_v4(), org_id, common::millis_ago(1), true, 900.0)
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
async fn test_ingest_invalid_rpm_rejected() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    let (org_id, device_id) = common::setup_covered_org(&app).await;

    let (status, body) =
        common::ingest_sample(&app, device_id, org_id, common::millis_ago(1), true, 70000.0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
async fn test_batch_ingest() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    let (org_id, device_id) = common::setup_covered_org(&app).await;

    let request = common::json_request(
        Method::POST,
        "/api/v1/telemetry/batch",
        serde_json::json!({
            "samples": [
                {
                    "deviceId": device_id,
                    "organizationId": org_id,
                    "timestamp": common::millis_ago(10),
                    "running": true,
                    "rpm": 1100.0
                },
                {
                    "deviceId": device_id,
                    "organizationId": org_id,
                    "timestamp": common::millis_ago(5),
                    "running": true,
                    "rpm": 1150.0
                },
                {
                    "deviceId": device_id,
                    "organizationId": org_id,
                    "timestamp": common::millis_ago(0),
                    "running": false,
                    "rpm": 0.0
                }
            ]
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_response_body(response).await;
    assert_eq!(body["acceptedCount"], 3);
    assert_eq!(body["droppedCount"], 0);

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
async fn test_batch_reports_dropped_samples_by_index() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    let (org_id, device_id) = common::setup_covered_org(&app).await;

    // Second entry is older than the first and gets dropped as stale.
    let request = common::json_request(
        Method::POST,
        "/api/v1/telemetry/batch",
        serde_json::json!({
            "samples": [
                {
                    "deviceId": device_id,
                    "organizationId": org_id,
                    "timestamp": common::millis_ago(5),
                    "running": true,
                    "rpm": 1000.0
                },
                {
                    "deviceId": device_id,
                    "organizationId": org_id,
                    "timestamp": common::millis_ago(30),
                    "running": true,
                    "rpm": 1000.0
                }
            ]
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_response_body(response).await;
    assert_eq!(body["acceptedCount"], 1);
    assert_eq!(body["droppedCount"], 1);
    assert_eq!(body["dropped"][0]["index"], 1);
    assert_eq!(body["dropped"][0]["reason"], "stale_sample");

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
async fn test_batch_rejects_device_claimed_under_wrong_org() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    let (org_id, device_id) = common::setup_covered_org(&app).await;
    let other_org = Uuid::new_v4();

    // First sample is a valid pair; the second claims the same device under
    // an organization it does not belong to and must fail the whole batch.
    let request = common::json_request(
        Method::POST,
        "/api/v1/telemetry/batch",
        serde_json::json!({
            "samples": [
                {
                    "deviceId": device_id,
                    "organizationId": org_id,
                    "timestamp": common::millis_ago(5),
                    "running": true,
                    "rpm": 1000.0
                },
                {
                    "deviceId": device_id,
                    "organizationId": other_org,
                    "timestamp": common::millis_ago(1),
                    "running": true,
                    "rpm": 1000.0
                }
            ]
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = common::parse_response_body(response).await;
    assert_eq!(body["error"], "not_found");

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
async fn test_batch_with_invalid_sample_fails_whole_request() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    let (org_id, device_id) = common::setup_covered_org(&app).await;

    let request = common::json_request(
        Method::POST,
        "/api/v1/telemetry/batch",
        serde_json::json!({
            "samples": [
                {
                    "deviceId": device_id,
                    "organizationId": org_id,
                    "timestamp": common::millis_ago(1),
                    "running": true,
                    "rpm": -5.0
                }
            ]
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
async fn test_empty_batch_rejected() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    let org_id = Uuid::new_v4();

    let request = common::json_request(
        Method::POST,
        "/api/v1/telemetry/batch",
        serde_json::json!({ "samples": [] }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
async fn test_duplicate_timestamp_accepted_with_zero_delta() {
    let Some((app, pool)) = common::try_setup_app().await else {
        return;
    };
    let (org_id, device_id) = common::setup_covered_org(&app).await;

    let ts = common::millis_ago(2);
    let (status, first) = common::ingest_sample(&app, device_id, org_id, ts, true, 1000.0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["accepted"], true);

    // Same timestamp again: accepted, but accrues nothing.
    let (status, second) = common::ingest_sample(&app, device_id, org_id, ts, true, 1000.0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["accepted"], true);
    assert_eq!(
        second["bucket"]["powerOnMinutes"],
        first["bucket"]["powerOnMinutes"]
    );

    common::cleanup_org(&pool, org_id).await;
}
