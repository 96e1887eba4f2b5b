use thiserror::Error;

/// Errors surfaced by the reservation and tracking services.
///
/// Reservation-path errors are returned synchronously to the caller;
/// store failures fail closed with no partial writes.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("station '{station}' is not on route {route_id}")]
    UnknownStation { route_id: i64, station: String },
    #[error("invalid segment: boarding order {from_order} is not before alighting order {to_order}")]
    InvalidSegment { from_order: i64, to_order: i64 },
    #[error("seat {seat_number} already booked for orders {from_order}..{to_order}")]
    SeatConflict {
        seat_number: i64,
        /// Existing confirmed interval that overlaps the request
        from_order: i64,
        to_order: i64,
    },
    #[error("schedule {0} not found")]
    ScheduleNotFound(i64),
    #[error("booking {0} not found")]
    BookingNotFound(i64),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unknown_station() {
        let err = BookingError::UnknownStation {
            route_id: 3,
            station: "Kota".into(),
        };
        assert_eq!(err.to_string(), "station 'Kota' is not on route 3");
    }

    #[test]
    fn error_display_seat_conflict() {
        let err = BookingError::SeatConflict {
            seat_number: 5,
            from_order: 1,
            to_order: 3,
        };
        assert_eq!(err.to_string(), "seat 5 already booked for orders 1..3");
    }

    #[test]
    fn error_from_sqlx_error() {
        let err: BookingError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, BookingError::StoreUnavailable(_)));
    }
}
