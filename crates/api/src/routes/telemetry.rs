//! Telemetry intake endpoint handlers.
//!
//! Samples are classified against the organization's live shift windows,
//! folded into in-memory bucket totals, and committed write-through. A
//! sample that cannot be classified is dropped with a 200 response; only
//! a storage failure surfaces as an error (503, caller may retry).

use std::collections::{HashMap, HashSet};

use axum::{extract::State, Json};
use chrono::{TimeZone, Utc};
use persistence::repositories::{DeviceRepository, MetricBucketRepository, ShiftRepository};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{
    record_buckets_committed, record_sample_dropped, record_samples_ingested,
};
use domain::models::metric_bucket::{BucketKey, BucketSnapshot};
use domain::models::telemetry::{
    BatchIngestRequest, BatchIngestResponse, ClassifiedSample, DropReason, DroppedSample,
    IngestSampleRequest, IngestSampleResponse, TelemetrySample,
};
use domain::models::ShiftDefinition;

async fn verify_device(
    state: &AppState,
    device_id: Uuid,
    organization_id: Uuid,
) -> Result<(), ApiError> {
    let repo = DeviceRepository::new(state.pool.clone());
    let device = repo
        .find_by_device_id(device_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Device not registered".to_string()))?;

    if !device.active || device.organization_id != organization_id {
        return Err(ApiError::NotFound("Device not registered".to_string()));
    }
    Ok(())
}

async fn load_live_shifts(
    state: &AppState,
    organization_id: Uuid,
) -> Result<Vec<ShiftDefinition>, ApiError> {
    let repo = ShiftRepository::new(state.pool.clone());
    let shifts = repo
        .find_live_by_org(organization_id)
        .await?
        .into_iter()
        .map(ShiftDefinition::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(shifts)
}

/// Classifies one validated request into a bucket-routed sample, or the
/// reason it must be dropped.
fn classify_request(
    shifts: &[ShiftDefinition],
    request: &IngestSampleRequest,
) -> Result<Option<ClassifiedSample>, ApiError> {
    let observed_at = Utc
        .timestamp_millis_opt(request.timestamp)
        .single()
        .ok_or_else(|| ApiError::Validation("Invalid timestamp".to_string()))?;

    let Some((shift_id, shift_date)) =
        domain::services::shift_schedule::classify(shifts, observed_at)
    else {
        return Ok(None);
    };

    Ok(Some(ClassifiedSample {
        shift_id,
        shift_date,
        sample: TelemetrySample {
            device_id: request.device_id,
            organization_id: request.organization_id,
            observed_at,
            running: request.running,
            rpm: request.rpm,
        },
    }))
}

/// Loads the persisted bucket row on first touch so in-memory totals
/// continue from durable state after a restart.
async fn seed_bucket(state: &AppState, key: &BucketKey) -> Result<(), ApiError> {
    if state.aggregator.has_bucket(key) {
        return Ok(());
    }
    let repo = MetricBucketRepository::new(state.pool.clone());
    if let Some(row) = repo.find_by_key(key).await? {
        state.aggregator.seed(row.into());
    }
    Ok(())
}

fn touch_last_seen(state: &AppState, device_id: Uuid) {
    let pool = state.pool.clone();
    tokio::spawn(async move {
        let repo = DeviceRepository::new(pool);
        if let Err(e) = repo.update_last_seen_at(device_id, Utc::now()).await {
            warn!("Failed to update device last_seen_at: {}", e);
        }
    });
}

fn check_rate_limit(state: &AppState, device_id: Uuid) -> Result<(), ApiError> {
    if let Some(ref limiter) = state.rate_limiter {
        if let Err(retry_after) = limiter.check(device_id) {
            return Err(ApiError::RateLimited { retry_after });
        }
    }
    Ok(())
}

/// Ingest a single telemetry sample.
///
/// POST /api/v1/telemetry
pub async fn ingest_sample(
    State(state): State<AppState>,
    Json(request): Json<IngestSampleRequest>,
) -> Result<Json<IngestSampleResponse>, ApiError> {
    check_rate_limit(&state, request.device_id)?;
    request.validate()?;
    verify_device(&state, request.device_id, request.organization_id).await?;

    let shifts = load_live_shifts(&state, request.organization_id).await?;

    let Some(classified) = classify_request(&shifts, &request)? else {
        warn!(
            device_id = %request.device_id,
            timestamp = request.timestamp,
            "Sample dropped, no shift window covers its time of day"
        );
        record_sample_dropped(DropReason::NoShiftWindow.as_str());
        return Ok(Json(IngestSampleResponse {
            accepted: false,
            reason: Some(DropReason::NoShiftWindow),
            bucket: None,
        }));
    };

    let key = BucketKey {
        device_id: request.device_id,
        organization_id: request.organization_id,
        shift_id: classified.shift_id,
        shift_date: classified.shift_date,
    };
    seed_bucket(&state, &key).await?;

    let snapshot = match state.aggregator.apply(classified) {
        Ok(snapshot) => snapshot,
        Err(reason) => {
            warn!(
                device_id = %request.device_id,
                timestamp = request.timestamp,
                reason = reason.as_str(),
                "Sample dropped"
            );
            record_sample_dropped(reason.as_str());
            return Ok(Json(IngestSampleResponse {
                accepted: false,
                reason: Some(reason),
                bucket: None,
            }));
        }
    };

    // Write-through; the bucket stays dirty in memory so the flush job
    // retries if this commit fails.
    let bucket_repo = MetricBucketRepository::new(state.pool.clone());
    bucket_repo
        .commit(&snapshot)
        .await
        .map_err(|e| ApiError::ServiceUnavailable(format!("Metrics storage unavailable: {}", e)))?;

    record_samples_ingested(1);
    record_buckets_committed(1);
    touch_last_seen(&state, request.device_id);

    info!(
        device_id = %request.device_id,
        shift_id = %snapshot.key.shift_id,
        shift_date = %snapshot.key.shift_date,
        efficiency = snapshot.efficiency(),
        "Sample aggregated"
    );

    Ok(Json(IngestSampleResponse {
        accepted: true,
        reason: None,
        bucket: Some(snapshot.into()),
    }))
}

/// Ingest a batch of telemetry samples.
///
/// POST /api/v1/telemetry/batch
pub async fn ingest_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchIngestRequest>,
) -> Result<Json<BatchIngestResponse>, ApiError> {
    request.validate()?;
    if request.samples.len() > state.config.telemetry.max_batch_size {
        return Err(ApiError::Validation(format!(
            "Batch must contain at most {} samples",
            state.config.telemetry.max_batch_size
        )));
    }

    for sample in &request.samples {
        check_rate_limit(&state, sample.device_id)?;
        sample.validate()?;
    }

    // Ownership and shift sets are verified once per distinct pair, not per
    // sample. Keyed by (device, org) so a sample claiming the same device
    // under a different organization still gets its own ownership check.
    let mut verified_pairs: HashSet<(Uuid, Uuid)> = HashSet::new();
    let mut org_shifts: HashMap<Uuid, Vec<ShiftDefinition>> = HashMap::new();

    for sample in &request.samples {
        if verified_pairs.insert((sample.device_id, sample.organization_id)) {
            verify_device(&state, sample.device_id, sample.organization_id).await?;
        }
        if !org_shifts.contains_key(&sample.organization_id) {
            let shifts = load_live_shifts(&state, sample.organization_id).await?;
            org_shifts.insert(sample.organization_id, shifts);
        }
    }

    let mut dropped: Vec<DroppedSample> = Vec::new();
    let mut final_snapshots: HashMap<BucketKey, BucketSnapshot> = HashMap::new();
    let mut accepted_count = 0usize;

    for (index, sample) in request.samples.iter().enumerate() {
        let shifts = &org_shifts[&sample.organization_id];

        let Some(classified) = classify_request(shifts, sample)? else {
            record_sample_dropped(DropReason::NoShiftWindow.as_str());
            dropped.push(DroppedSample {
                index,
                reason: DropReason::NoShiftWindow,
            });
            continue;
        };

        let key = BucketKey {
            device_id: sample.device_id,
            organization_id: sample.organization_id,
            shift_id: classified.shift_id,
            shift_date: classified.shift_date,
        };
        seed_bucket(&state, &key).await?;

        match state.aggregator.apply(classified) {
            Ok(snapshot) => {
                accepted_count += 1;
                // Later samples supersede earlier snapshots of the same bucket.
                final_snapshots.insert(key, snapshot);
            }
            Err(reason) => {
                record_sample_dropped(reason.as_str());
                dropped.push(DroppedSample { index, reason });
            }
        }
    }

    // One commit per touched bucket, not per sample.
    let bucket_repo = MetricBucketRepository::new(state.pool.clone());
    for snapshot in final_snapshots.values() {
        bucket_repo.commit(snapshot).await.map_err(|e| {
            ApiError::ServiceUnavailable(format!("Metrics storage unavailable: {}", e))
        })?;
    }

    record_samples_ingested(accepted_count);
    record_buckets_committed(final_snapshots.len());
    let touched: HashSet<Uuid> = verified_pairs.iter().map(|(device_id, _)| *device_id).collect();
    for device_id in touched {
        touch_last_seen(&state, device_id);
    }

    info!(
        accepted = accepted_count,
        dropped = dropped.len(),
        buckets = final_snapshots.len(),
        "Batch aggregated"
    );

    Ok(Json(BatchIngestResponse {
        accepted_count,
        dropped_count: dropped.len(),
        dropped,
    }))
}
