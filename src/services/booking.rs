//! Booking orchestration: resolves stations, quotes the fare, reserves the
//! segment, and notifies viewers.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use utoipa::ToSchema;

use crate::models::{Schedule, SeatClass};
use crate::services::ledger::{NewBooking, SeatLedger};
use crate::services::topology::RouteTopology;
use crate::services::{fare, BookingError};

/// Validated booking request, checked at the boundary before any store
/// access happens
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BookingRequest {
    pub schedule_id: i64,
    pub seat_number: i64,
    pub passenger_name: String,
    pub mobile: String,
    pub from_station: String,
    pub to_station: String,
    pub travel_date: NaiveDate,
    #[serde(default)]
    pub seat_class: SeatClass,
}

impl BookingRequest {
    fn validate(&self) -> Result<(), BookingError> {
        if self.passenger_name.trim().is_empty() {
            return Err(BookingError::InvalidRequest(
                "passenger name must not be empty".into(),
            ));
        }
        if self.mobile.trim().is_empty() {
            return Err(BookingError::InvalidRequest(
                "mobile number must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingConfirmation {
    pub booking_id: i64,
    pub fare: f64,
}

/// Availability of one seat for a queried segment and date
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeatAvailability {
    pub seat_number: i64,
    pub status: SeatStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Booked,
}

/// Event broadcast to WebSocket viewers when a seat is booked, so open
/// seat maps can refresh
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeatBookedEvent {
    pub schedule_id: i64,
    pub seat_number: i64,
    pub travel_date: NaiveDate,
}

pub type SeatBookedSender = broadcast::Sender<SeatBookedEvent>;

pub struct BookingService {
    pool: SqlitePool,
    topology: Arc<RouteTopology>,
    ledger: SeatLedger,
    seat_booked_tx: SeatBookedSender,
}

impl BookingService {
    pub fn new(pool: SqlitePool, topology: Arc<RouteTopology>) -> Self {
        let ledger = SeatLedger::new(pool.clone());
        // Viewers rebuild the seat map from the store on each event, so a
        // small buffer is enough
        let (seat_booked_tx, _) = broadcast::channel(64);
        Self {
            pool,
            topology,
            ledger,
            seat_booked_tx,
        }
    }

    /// Sender handle for passing seat-booked events to the WebSocket layer
    pub fn seat_booked_sender(&self) -> SeatBookedSender {
        self.seat_booked_tx.clone()
    }

    pub fn ledger(&self) -> &SeatLedger {
        &self.ledger
    }

    async fn schedule(&self, schedule_id: i64) -> Result<Schedule, BookingError> {
        let schedule: Option<Schedule> = sqlx::query_as(
            "SELECT id, route_id, bus_name, departure_time, total_seats, \
                    seating_rate, single_sleeper_rate, double_sleeper_rate \
             FROM schedules WHERE id = ?",
        )
        .bind(schedule_id)
        .fetch_optional(&self.pool)
        .await?;
        schedule.ok_or(BookingError::ScheduleNotFound(schedule_id))
    }

    /// Fulfill one booking request: resolve the segment, quote the fare,
    /// and reserve the seat with the fare in one write.
    pub async fn create_booking(
        &self,
        request: BookingRequest,
    ) -> Result<BookingConfirmation, BookingError> {
        request.validate()?;
        let schedule = self.schedule(request.schedule_id).await?;
        if request.seat_number < 1 || request.seat_number > schedule.total_seats {
            return Err(BookingError::InvalidRequest(format!(
                "seat {} is outside 1..={}",
                request.seat_number, schedule.total_seats
            )));
        }

        let route = self.topology.route(schedule.route_id).await?;
        let from_order =
            route
                .station_order(&request.from_station)
                .ok_or_else(|| BookingError::UnknownStation {
                    route_id: schedule.route_id,
                    station: request.from_station.trim().to_string(),
                })?;
        let to_order =
            route
                .station_order(&request.to_station)
                .ok_or_else(|| BookingError::UnknownStation {
                    route_id: schedule.route_id,
                    station: request.to_station.trim().to_string(),
                })?;
        if from_order >= to_order {
            return Err(BookingError::InvalidSegment {
                from_order,
                to_order,
            });
        }

        // Quote before reserving so the booking row is written complete;
        // a store failure can never strand a confirmed row without its fare
        let fare = fare::quote(&route, &schedule, from_order, to_order, request.seat_class);
        let booking_id = self
            .ledger
            .reserve(&NewBooking {
                schedule_id: request.schedule_id,
                seat_number: request.seat_number,
                travel_date: request.travel_date,
                from_order,
                to_order,
                from_station: request.from_station.clone(),
                to_station: request.to_station.clone(),
                passenger_name: request.passenger_name.clone(),
                mobile: request.mobile.clone(),
                seat_class: request.seat_class,
                fare,
            })
            .await?;

        let _ = self.seat_booked_tx.send(SeatBookedEvent {
            schedule_id: request.schedule_id,
            seat_number: request.seat_number,
            travel_date: request.travel_date,
        });
        tracing::info!(
            booking_id,
            schedule_id = request.schedule_id,
            seat = request.seat_number,
            fare,
            "seat booked"
        );

        Ok(BookingConfirmation { booking_id, fare })
    }

    pub async fn cancel(&self, booking_id: i64) -> Result<(), BookingError> {
        self.ledger.cancel(booking_id).await?;
        tracing::info!(booking_id, "booking cancelled");
        Ok(())
    }

    /// Seat availability for a segment and date, for rendering the seat map
    pub async fn seat_map(
        &self,
        schedule_id: i64,
        travel_date: NaiveDate,
        from_station: &str,
        to_station: &str,
    ) -> Result<Vec<SeatAvailability>, BookingError> {
        let schedule = self.schedule(schedule_id).await?;
        let from_order = self
            .topology
            .station_order(schedule.route_id, from_station)
            .await?;
        let to_order = self
            .topology
            .station_order(schedule.route_id, to_station)
            .await?;
        if from_order >= to_order {
            return Err(BookingError::InvalidSegment {
                from_order,
                to_order,
            });
        }

        let occupied = self
            .ledger
            .list_occupied(schedule_id, travel_date, from_order, to_order)
            .await?;

        Ok((1..=schedule.total_seats)
            .map(|seat_number| SeatAvailability {
                seat_number,
                status: if occupied.contains(&seat_number) {
                    SeatStatus::Booked
                } else {
                    SeatStatus::Available
                },
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn travel_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 14).unwrap()
    }

    async fn seed_route(pool: &SqlitePool) {
        sqlx::query("INSERT INTO routes (id, name) VALUES (1, 'Jaipur - Delhi')")
            .execute(pool)
            .await
            .unwrap();
        let stations = [
            ("Jaipur", 1, 26.9124, 75.7873),
            ("Behror", 2, 27.8882, 76.2801),
            ("Delhi", 3, 28.6139, 77.2090),
        ];
        for (name, order, lat, lng) in stations {
            sqlx::query(
                "INSERT INTO stations (route_id, name, order_index, lat, lng) \
                 VALUES (1, ?, ?, ?, ?)",
            )
            .bind(name)
            .bind(order)
            .bind(lat)
            .bind(lng)
            .execute(pool)
            .await
            .unwrap();
        }
        sqlx::query(
            "INSERT INTO schedules (id, route_id, bus_name, departure_time, total_seats) \
             VALUES (1, 1, 'Volvo AC', '08:00', 4)",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    fn service(pool: SqlitePool) -> BookingService {
        let topology = Arc::new(RouteTopology::new(pool.clone()));
        BookingService::new(pool, topology)
    }

    fn request(seat: i64, from: &str, to: &str) -> BookingRequest {
        BookingRequest {
            schedule_id: 1,
            seat_number: seat,
            passenger_name: "Ravi".into(),
            mobile: "9876543210".into(),
            from_station: from.into(),
            to_station: to.into(),
            travel_date: travel_date(),
            seat_class: SeatClass::Seating,
        }
    }

    #[sqlx::test]
    async fn booking_returns_positive_fare(pool: SqlitePool) {
        seed_route(&pool).await;
        let service = service(pool);

        let confirmation = service
            .create_booking(request(1, "Jaipur", "Delhi"))
            .await
            .unwrap();
        assert!(confirmation.fare > 0.0);

        let stored = service
            .ledger()
            .booking(confirmation.booking_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.fare, confirmation.fare);
        assert_eq!((stored.from_order, stored.to_order), (1, 3));
    }

    #[sqlx::test]
    async fn same_station_segment_is_rejected(pool: SqlitePool) {
        seed_route(&pool).await;
        let service = service(pool);

        let err = service
            .create_booking(request(1, "Jaipur", "Jaipur"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidSegment { .. }));
    }

    #[sqlx::test]
    async fn unknown_station_is_rejected_without_side_effect(pool: SqlitePool) {
        seed_route(&pool).await;
        let service = service(pool);

        let err = service
            .create_booking(request(1, "Jaipur", "Mumbai"))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::UnknownStation { .. }));

        let count = service.ledger().confirmed_count().await.unwrap();
        assert_eq!(count, 0);
    }

    #[sqlx::test]
    async fn seat_map_reflects_new_booking(pool: SqlitePool) {
        seed_route(&pool).await;
        let service = service(pool);

        service
            .create_booking(request(2, "Jaipur", "Behror"))
            .await
            .unwrap();

        let seats = service
            .seat_map(1, travel_date(), "Jaipur", "Delhi")
            .await
            .unwrap();
        assert_eq!(seats.len(), 4);
        assert_eq!(seats[1].seat_number, 2);
        assert_eq!(seats[1].status, SeatStatus::Booked);
        assert_eq!(seats[0].status, SeatStatus::Available);
    }

    #[sqlx::test]
    async fn touching_boundary_does_not_block_seat(pool: SqlitePool) {
        seed_route(&pool).await;
        let service = service(pool);

        service
            .create_booking(request(3, "Jaipur", "Behror"))
            .await
            .unwrap();

        // Behror onward is free for the same seat
        let seats = service
            .seat_map(1, travel_date(), "Behror", "Delhi")
            .await
            .unwrap();
        assert_eq!(seats[2].status, SeatStatus::Available);

        service
            .create_booking(request(3, "Behror", "Delhi"))
            .await
            .unwrap();
    }

    #[sqlx::test]
    async fn racing_identical_bookings_yield_one_success(pool: SqlitePool) {
        seed_route(&pool).await;
        let service = Arc::new(service(pool));

        let a = tokio::spawn({
            let service = service.clone();
            async move { service.create_booking(request(4, "Jaipur", "Delhi")).await }
        });
        let b = tokio::spawn({
            let service = service.clone();
            async move { service.create_booking(request(4, "Jaipur", "Delhi")).await }
        });

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(BookingError::SeatConflict { .. })))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
    }

    #[sqlx::test]
    async fn blank_passenger_name_is_rejected(pool: SqlitePool) {
        seed_route(&pool).await;
        let service = service(pool);

        let mut req = request(1, "Jaipur", "Delhi");
        req.passenger_name = "  ".into();
        let err = service.create_booking(req).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidRequest(_)));
    }

    #[sqlx::test]
    async fn unknown_schedule_is_rejected(pool: SqlitePool) {
        seed_route(&pool).await;
        let service = service(pool);

        let mut req = request(1, "Jaipur", "Delhi");
        req.schedule_id = 99;
        let err = service.create_booking(req).await.unwrap_err();
        assert!(matches!(err, BookingError::ScheduleNotFound(99)));
    }
}
