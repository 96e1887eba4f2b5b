use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ErrorResponse};

use super::BookingsState;

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponse {
    pub ok: bool,
}

/// Cancel a confirmed booking, freeing its segment
#[utoipa::path(
    post,
    path = "/api/bookings/{id}/cancel",
    params(
        ("id" = i64, Path, description = "Booking id")
    ),
    responses(
        (status = 200, description = "Booking cancelled", body = CancelResponse),
        (status = 404, description = "Booking not found or already cancelled", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse)
    ),
    tag = "bookings"
)]
pub async fn cancel_booking(
    State(state): State<BookingsState>,
    Path(id): Path<i64>,
) -> Result<Json<CancelResponse>, ApiError> {
    state.service.cancel(id).await?;
    Ok(Json(CancelResponse { ok: true }))
}
