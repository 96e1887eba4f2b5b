use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ErrorResponse};

use super::SchedulesState;

/// One scheduled bus shown on the route's departure list
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct ScheduleSummary {
    pub id: i64,
    pub bus_name: String,
    /// Departure time as "HH:MM"
    pub departure_time: String,
    pub total_seats: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleListResponse {
    pub route_id: i64,
    pub schedules: Vec<ScheduleSummary>,
}

/// List schedules departing on a route
#[utoipa::path(
    get,
    path = "/api/schedules/by-route/{route_id}",
    params(
        ("route_id" = i64, Path, description = "Route id")
    ),
    responses(
        (status = 200, description = "Schedules for the route", body = ScheduleListResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "schedules"
)]
pub async fn list_schedules_by_route(
    State(state): State<SchedulesState>,
    Path(route_id): Path<i64>,
) -> Result<Json<ScheduleListResponse>, ApiError> {
    let schedules: Vec<ScheduleSummary> = sqlx::query_as(
        "SELECT id, bus_name, departure_time, total_seats \
         FROM schedules WHERE route_id = ? ORDER BY departure_time",
    )
    .bind(route_id)
    .fetch_all(&state.pool)
    .await
    .map_err(crate::services::BookingError::from)?;
    Ok(Json(ScheduleListResponse {
        route_id,
        schedules,
    }))
}
