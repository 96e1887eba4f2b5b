use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::services::BookingError;

/// Standard error response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Wrapper mapping service errors onto HTTP responses
#[derive(Debug)]
pub struct ApiError(pub BookingError);

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError(err)
    }
}

fn status_for(err: &BookingError) -> StatusCode {
    match err {
        BookingError::UnknownStation { .. }
        | BookingError::ScheduleNotFound(_)
        | BookingError::BookingNotFound(_) => StatusCode::NOT_FOUND,
        BookingError::InvalidSegment { .. } | BookingError::InvalidRequest(_) => {
            StatusCode::BAD_REQUEST
        }
        BookingError::SeatConflict { .. } => StatusCode::CONFLICT,
        BookingError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self.0, "store unavailable");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
