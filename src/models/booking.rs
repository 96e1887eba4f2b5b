use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle state of a booking. Bookings are created confirmed and are
/// never deleted; cancellation flips the status and frees the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

/// Seat class, priced via the schedule's per-class rate table
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatClass {
    #[default]
    #[sqlx(rename = "SEATING")]
    Seating,
    #[sqlx(rename = "SLEEPER_SINGLE")]
    SleeperSingle,
    #[sqlx(rename = "SLEEPER_DOUBLE")]
    SleeperDouble,
    /// Used when the requested class is not recognized; priced as seating
    #[serde(other)]
    #[sqlx(rename = "UNKNOWN")]
    Unknown,
}

/// A confirmed or cancelled reservation of one seat for a sub-range of a
/// route, expressed as the half-open order interval [from_order, to_order)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SeatBooking {
    pub id: i64,
    pub schedule_id: i64,
    pub seat_number: i64,
    pub travel_date: NaiveDate,
    pub from_order: i64,
    pub to_order: i64,
    pub from_station: String,
    pub to_station: String,
    pub passenger_name: String,
    pub mobile: String,
    pub seat_class: SeatClass,
    pub fare: f64,
    pub status: BookingStatus,
}
