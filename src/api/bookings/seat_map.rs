use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ErrorResponse};
use crate::services::booking::SeatAvailability;

use super::BookingsState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SeatMapRequest {
    pub schedule_id: i64,
    pub travel_date: NaiveDate,
    pub from_station: String,
    pub to_station: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeatMapResponse {
    pub schedule_id: i64,
    pub travel_date: NaiveDate,
    /// One entry per seat, in seat-number order
    pub seats: Vec<SeatAvailability>,
}

/// Seat availability for a segment and travel date
#[utoipa::path(
    post,
    path = "/api/bookings/seat-map",
    request_body = SeatMapRequest,
    responses(
        (status = 200, description = "Seat availability for the segment", body = SeatMapResponse),
        (status = 400, description = "Invalid segment", body = ErrorResponse),
        (status = 404, description = "Unknown schedule or station", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "bookings"
)]
pub async fn get_seat_map(
    State(state): State<BookingsState>,
    Json(request): Json<SeatMapRequest>,
) -> Result<Json<SeatMapResponse>, ApiError> {
    let seats = state
        .service
        .seat_map(
            request.schedule_id,
            request.travel_date,
            &request.from_station,
            &request.to_station,
        )
        .await?;
    Ok(Json(SeatMapResponse {
        schedule_id: request.schedule_id,
        travel_date: request.travel_date,
        seats,
    }))
}
