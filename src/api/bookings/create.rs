use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ErrorResponse};
use crate::services::booking::BookingRequest;

use super::BookingsState;

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingResponse {
    pub booking_id: i64,
    pub fare: f64,
}

/// Book a seat for a segment of the route
#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = BookingRequest,
    responses(
        (status = 200, description = "Booking confirmed", body = BookingResponse),
        (status = 400, description = "Invalid segment or request", body = ErrorResponse),
        (status = 404, description = "Unknown schedule or station", body = ErrorResponse),
        (status = 409, description = "Seat already booked for an overlapping segment", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "bookings"
)]
pub async fn create_booking(
    State(state): State<BookingsState>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let confirmation = state.service.create_booking(request).await?;
    Ok(Json(BookingResponse {
        booking_id: confirmation.booking_id,
        fare: confirmation.fare,
    }))
}
