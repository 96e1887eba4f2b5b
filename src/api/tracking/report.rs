use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ErrorResponse};
use crate::models::{LastKnownPosition, PositionReport};

use super::TrackingState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LastPositionResponse {
    pub schedule_id: i64,
    /// Last accepted position, if the vehicle has reported yet
    pub position: Option<LastKnownPosition>,
}

/// Accept a GPS report from a vehicle's tracking device.
///
/// Reports with out-of-range coordinates are dropped and acknowledged
/// anyway; validation failures are not surfaced to the device.
#[utoipa::path(
    post,
    path = "/api/tracking/report",
    request_body = PositionReport,
    responses(
        (status = 200, description = "Report accepted or dropped", body = ReportResponse),
        (status = 404, description = "Unknown schedule", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "tracking"
)]
pub async fn report_position(
    State(state): State<TrackingState>,
    Json(report): Json<PositionReport>,
) -> Result<Json<ReportResponse>, ApiError> {
    state.hub.report(report).await?;
    Ok(Json(ReportResponse { ok: true }))
}

/// Last known position of a schedule's vehicle, for polling clients
#[utoipa::path(
    get,
    path = "/api/tracking/{schedule_id}/position",
    params(
        ("schedule_id" = i64, Path, description = "Schedule id")
    ),
    responses(
        (status = 200, description = "Last known position", body = LastPositionResponse),
        (status = 404, description = "Unknown schedule", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "tracking"
)]
pub async fn get_last_position(
    State(state): State<TrackingState>,
    Path(schedule_id): Path<i64>,
) -> Result<Json<LastPositionResponse>, ApiError> {
    let position = state.hub.last_known(schedule_id).await?;
    Ok(Json(LastPositionResponse {
        schedule_id,
        position,
    }))
}
