//! Shift definition endpoint handlers.
//!
//! All writes revalidate the organization's full live window set before
//! touching storage, so a rejected change is never partially applied. The
//! partial unique index on (organization_id, shift_type) backstops create
//! races as a 409.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use persistence::repositories::ShiftRepository;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::shift::{CreateShiftRequest, ShiftDefinition, ShiftResponse, UpdateShiftRequest};
use domain::services::shift_schedule::{validate_window_set, CandidateWindow};

async fn load_live_shifts(
    repo: &ShiftRepository,
    org_id: Uuid,
) -> Result<Vec<ShiftDefinition>, ApiError> {
    let entities = repo.find_live_by_org(org_id).await?;
    let shifts = entities
        .into_iter()
        .map(ShiftDefinition::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(shifts)
}

/// Create a shift definition.
///
/// POST /api/v1/organizations/:org_id/shifts
pub async fn create_shift(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Json(request): Json<CreateShiftRequest>,
) -> Result<(StatusCode, Json<ShiftResponse>), ApiError> {
    let repo = ShiftRepository::new(state.pool.clone());
    let existing = load_live_shifts(&repo, org_id).await?;

    let candidate = CandidateWindow {
        shift_type: request.shift_type,
        start_time: request.start_time,
        end_time: request.end_time,
    };
    validate_window_set(&existing, &candidate, None)?;

    let entity = repo
        .insert(
            org_id,
            &request.shift_type.to_string(),
            request.start_time,
            request.end_time,
            request.created_by,
        )
        .await?;
    let shift = ShiftDefinition::try_from(entity)?;

    info!(
        organization_id = %org_id,
        shift_id = %shift.id,
        shift_type = %shift.shift_type,
        "Shift definition created"
    );

    Ok((StatusCode::CREATED, Json(shift.into())))
}

/// List an organization's live shift definitions.
///
/// GET /api/v1/organizations/:org_id/shifts
pub async fn list_shifts(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> Result<Json<Vec<ShiftResponse>>, ApiError> {
    let repo = ShiftRepository::new(state.pool.clone());
    let shifts = load_live_shifts(&repo, org_id).await?;
    Ok(Json(shifts.into_iter().map(ShiftResponse::from).collect()))
}

/// Update a shift definition's window and/or type.
///
/// PUT /api/v1/organizations/:org_id/shifts/:shift_id
pub async fn update_shift(
    State(state): State<AppState>,
    Path((org_id, shift_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateShiftRequest>,
) -> Result<Json<ShiftResponse>, ApiError> {
    let repo = ShiftRepository::new(state.pool.clone());

    let current = repo
        .find_by_id(org_id, shift_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Shift definition not found".to_string()))?;
    let current = ShiftDefinition::try_from(current)?;

    // Unspecified fields keep their current values.
    let shift_type = request.shift_type.unwrap_or(current.shift_type);
    let start_time = request.start_time.unwrap_or(current.start_time);
    let end_time = request.end_time.unwrap_or(current.end_time);

    let existing = load_live_shifts(&repo, org_id).await?;
    let candidate = CandidateWindow {
        shift_type,
        start_time,
        end_time,
    };
    validate_window_set(&existing, &candidate, Some(shift_id))?;

    let entity = repo
        .update(
            org_id,
            shift_id,
            &shift_type.to_string(),
            start_time,
            end_time,
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Shift definition not found".to_string()))?;
    let shift = ShiftDefinition::try_from(entity)?;

    info!(
        organization_id = %org_id,
        shift_id = %shift_id,
        "Shift definition updated"
    );

    Ok(Json(shift.into()))
}

/// Soft-delete a shift definition.
///
/// DELETE /api/v1/organizations/:org_id/shifts/:shift_id
pub async fn delete_shift(
    State(state): State<AppState>,
    Path((org_id, shift_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let repo = ShiftRepository::new(state.pool.clone());
    let affected = repo.soft_delete(org_id, shift_id).await?;

    if affected == 0 {
        return Err(ApiError::NotFound("Shift definition not found".to_string()));
    }

    info!(
        organization_id = %org_id,
        shift_id = %shift_id,
        "Shift definition deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
