//! Distance-based fare pricing.
//!
//! A fare is the cumulative great-circle distance of the booked segment
//! multiplied by the schedule's per-km rate for the seat class.

use crate::models::{Schedule, SeatClass};
use crate::services::topology::CachedRoute;

/// Rate per km for a seat class from the schedule's rate table.
/// Unrecognized classes fall back to the seating rate.
pub fn rate_per_km(schedule: &Schedule, seat_class: SeatClass) -> f64 {
    match seat_class {
        SeatClass::Seating => schedule.seating_rate,
        SeatClass::SleeperSingle => schedule.single_sleeper_rate,
        SeatClass::SleeperDouble => schedule.double_sleeper_rate,
        SeatClass::Unknown => schedule.seating_rate,
    }
}

/// Price a segment of the route for the given seat class, rounded to
/// two decimals
pub fn quote(
    route: &CachedRoute,
    schedule: &Schedule,
    from_order: i64,
    to_order: i64,
    seat_class: SeatClass,
) -> f64 {
    let distance_km = route.cumulative_distance_km(from_order, to_order);
    round2(distance_km * rate_per_km(schedule, seat_class))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
