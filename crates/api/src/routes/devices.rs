//! Device registry endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use persistence::repositories::DeviceRepository;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::device::{DeviceSummary, RegisterDeviceRequest, RegisterDeviceResponse};
use domain::models::Device;

/// Register a device, upserting by device id.
///
/// POST /api/v1/organizations/:org_id/devices
pub async fn register_device(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<RegisterDeviceRequest>,
) -> Result<(StatusCode, Json<RegisterDeviceResponse>), ApiError> {
    request.validate()?;

    let repo = DeviceRepository::new(state.pool.clone());
    let entity = repo
        .upsert_device(
            request.device_id,
            org_id,
            &request.name,
            request.alias.as_deref(),
        )
        .await?;
    let device: Device = entity.into();

    info!(
        organization_id = %org_id,
        device_id = %device.device_id,
        name = %device.name,
        "Device registered"
    );

    Ok((StatusCode::CREATED, Json(device.into())))
}

/// List an organization's active devices.
///
/// GET /api/v1/organizations/:org_id/devices
pub async fn list_devices(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<DeviceSummary>>, ApiError> {
    let repo = DeviceRepository::new(state.pool.clone());
    let devices = repo.find_active_devices_by_org(org_id).await?;

    Ok(Json(
        devices
            .into_iter()
            .map(|entity| DeviceSummary::from(Device::from(entity)))
            .collect(),
    ))
}
