pub mod booking;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use booking::{BookingStatus, SeatBooking, SeatClass};

/// A stop on a route, ordered by its 1-based position within the route
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Station {
    pub id: i64,
    pub route_id: i64,
    pub name: String,
    /// 1-based position of the station within its route
    pub order_index: i64,
    /// Latitude, if known
    pub lat: Option<f64>,
    /// Longitude, if known
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct RouteSummary {
    pub id: i64,
    pub name: String,
    /// Nominal route length in km, if recorded
    pub distance_km: Option<i64>,
}

/// One scheduled departure of a vehicle on a route
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Schedule {
    pub id: i64,
    pub route_id: i64,
    pub bus_name: String,
    /// Departure time as "HH:MM"
    pub departure_time: String,
    pub total_seats: i64,
    /// Fare rate per km for seating class
    pub seating_rate: f64,
    /// Fare rate per km for single sleeper class
    pub single_sleeper_rate: f64,
    /// Fare rate per km for double sleeper class
    pub double_sleeper_rate: f64,
}

/// Last position reported by a schedule's vehicle
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LastKnownPosition {
    pub lat: f64,
    pub lng: f64,
    /// When the position was accepted (RFC 3339)
    pub updated_at: String,
}

/// One GPS sample submitted by a vehicle's tracking device
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PositionReport {
    pub schedule_id: i64,
    pub lat: f64,
    pub lng: f64,
    /// Reported speed, if the device provides one
    pub speed_kmh: Option<f64>,
    /// Sample time (RFC 3339); defaults to server receive time
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

/// Enriched position event fanned out to subscribers
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PositionUpdate {
    pub schedule_id: i64,
    pub lat: f64,
    pub lng: f64,
    pub speed_kmh: Option<f64>,
    /// Name of the upcoming station, if the route has one ahead
    pub next_station: Option<String>,
    /// Road distance to the next station in km (great-circle approximation)
    pub distance_to_next_km: Option<f64>,
    /// Minutes to the next station at the assumed average speed
    pub eta_minutes: Option<i64>,
    /// When the report was accepted (RFC 3339)
    pub timestamp: String,
}
