//! Segment seat ledger.
//!
//! Owns all seat reservations for a schedule/date and enforces the
//! no-overlap invariant: for a fixed (schedule, seat, travel date) key, no
//! two confirmed bookings may hold overlapping half-open order intervals.
//! Touching intervals (one ends where the other begins) do not conflict.
//!
//! The overlap check and the insert run as one atomic unit under an
//! in-process async lock keyed by (schedule_id, seat_number, travel_date),
//! so racing reserve calls for the same key are linearized while calls on
//! different keys proceed in parallel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::models::{SeatBooking, SeatClass};
use crate::services::BookingError;

/// Two half-open intervals [a1, a2) and [b1, b2) overlap iff neither lies
/// entirely at or past the other's end
pub fn intervals_overlap(a1: i64, a2: i64, b1: i64, b2: i64) -> bool {
    !(b2 <= a1 || b1 >= a2)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LedgerKey {
    schedule_id: i64,
    seat_number: i64,
    travel_date: NaiveDate,
}

/// A reservation to insert, fare already quoted. The whole booking is
/// written in one statement so a store failure leaves no partial row.
#[derive(Debug, Clone)]
pub struct NewBooking {
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
}

#[derive(Clone)]
pub struct SeatLedger {
    pool: SqlitePool,
    locks: Arc<Mutex<HashMap<LedgerKey, Arc<Mutex<()>>>>>,
}

impl SeatLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn key_lock(&self, key: &LedgerKey) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry once no reserve call holds or awaits it
    async fn release_key(&self, key: &LedgerKey) {
        let mut locks = self.locks.lock().await;
        if let Some(lock) = locks.get(key) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(key);
            }
        }
    }

    /// Reserve a seat for a segment. Returns the booking id, or
    /// `SeatConflict` carrying the existing interval that overlaps.
    pub async fn reserve(&self, booking: &NewBooking) -> Result<i64, BookingError> {
        let key = LedgerKey {
            schedule_id: booking.schedule_id,
            seat_number: booking.seat_number,
            travel_date: booking.travel_date,
        };
        let lock = self.key_lock(&key).await;
        let result = {
            let _guard = lock.lock().await;
            self.check_and_insert(booking).await
        };
        drop(lock);
        self.release_key(&key).await;
        result
    }

    async fn check_and_insert(&self, booking: &NewBooking) -> Result<i64, BookingError> {
        let existing: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT from_order, to_order FROM seat_bookings \
             WHERE schedule_id = ? AND seat_number = ? AND travel_date = ? \
               AND status = 'confirmed'",
        )
        .bind(booking.schedule_id)
        .bind(booking.seat_number)
        .bind(booking.travel_date)
        .fetch_all(&self.pool)
        .await?;

        for (from_order, to_order) in existing {
            if intervals_overlap(from_order, to_order, booking.from_order, booking.to_order) {
                return Err(BookingError::SeatConflict {
                    seat_number: booking.seat_number,
                    from_order,
                    to_order,
                });
            }
        }

        let result = sqlx::query(
            "INSERT INTO seat_bookings \
             (schedule_id, seat_number, travel_date, from_order, to_order, \
              from_station, to_station, passenger_name, mobile, seat_class, fare, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'confirmed')",
        )
        .bind(booking.schedule_id)
        .bind(booking.seat_number)
        .bind(booking.travel_date)
        .bind(booking.from_order)
        .bind(booking.to_order)
        .bind(&booking.from_station)
        .bind(&booking.to_station)
        .bind(&booking.passenger_name)
        .bind(&booking.mobile)
        .bind(booking.seat_class)
        .bind(booking.fare)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Cancel a confirmed booking, freeing its interval. The row is kept
    /// as an audit record with status 'cancelled'.
    pub async fn cancel(&self, booking_id: i64) -> Result<(), BookingError> {
        let result = sqlx::query(
            "UPDATE seat_bookings SET status = 'cancelled' \
             WHERE id = ? AND status = 'confirmed'",
        )
        .bind(booking_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(BookingError::BookingNotFound(booking_id));
        }
        Ok(())
    }

    /// Fetch one booking by id
    pub async fn booking(&self, booking_id: i64) -> Result<Option<SeatBooking>, BookingError> {
        let row: Option<SeatBooking> = sqlx::query_as(
            "SELECT id, schedule_id, seat_number, travel_date, from_order, to_order, \
                    from_station, to_station, passenger_name, mobile, seat_class, fare, status \
             FROM seat_bookings WHERE id = ?",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Seats with at least one confirmed booking overlapping the queried
    /// half-open order range
    pub async fn list_occupied(
        &self,
        schedule_id: i64,
        travel_date: NaiveDate,
        from_order: i64,
        to_order: i64,
    ) -> Result<HashSet<i64>, BookingError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT DISTINCT seat_number FROM seat_bookings \
             WHERE schedule_id = ? AND travel_date = ? AND status = 'confirmed' \
               AND from_order < ? AND to_order > ?",
        )
        .bind(schedule_id)
        .bind(travel_date)
        .bind(to_order)
        .bind(from_order)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(seat,)| seat).collect())
    }

    /// Total confirmed bookings (health reporting)
    pub async fn confirmed_count(&self) -> Result<i64, BookingError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM seat_bookings WHERE status = 'confirmed'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;

    fn travel_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 14).unwrap()
    }

    fn new_booking(seat: i64, from_order: i64, to_order: i64) -> NewBooking {
        NewBooking {
            schedule_id: 1,
            seat_number: seat,
            travel_date: travel_date(),
            from_order,
            to_order,
            from_station: "A".into(),
            to_station: "B".into(),
            passenger_name: "Ravi".into(),
            mobile: "9876543210".into(),
            seat_class: SeatClass::Seating,
            fare: 120.5,
        }
    }

    async fn seed_schedule(pool: &SqlitePool) {
        sqlx::query("INSERT INTO routes (id, name) VALUES (1, 'Test Route')")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO schedules (id, route_id, bus_name, departure_time) \
             VALUES (1, 1, 'Test Bus', '08:00')",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    #[test]
    fn overlap_rule_is_boundary_exclusive() {
        assert!(intervals_overlap(1, 3, 2, 4));
        assert!(intervals_overlap(1, 3, 1, 3));
        assert!(intervals_overlap(1, 4, 2, 3));
        // Touching endpoints do not conflict
        assert!(!intervals_overlap(1, 2, 2, 3));
        assert!(!intervals_overlap(2, 3, 1, 2));
        // Disjoint
        assert!(!intervals_overlap(1, 2, 3, 4));
    }

    #[sqlx::test]
    async fn touching_segments_share_a_seat(pool: SqlitePool) {
        seed_schedule(&pool).await;
        let ledger = SeatLedger::new(pool);

        // A(1)->B(2), then B(2)->C(3) on the same seat: both succeed
        ledger.reserve(&new_booking(1, 1, 2)).await.unwrap();
        ledger.reserve(&new_booking(1, 2, 3)).await.unwrap();

        // A(1)->C(3) now overlaps both
        let err = ledger.reserve(&new_booking(1, 1, 3)).await.unwrap_err();
        assert!(matches!(err, BookingError::SeatConflict { .. }));
    }

    #[sqlx::test]
    async fn conflict_reports_existing_interval(pool: SqlitePool) {
        seed_schedule(&pool).await;
        let ledger = SeatLedger::new(pool);

        ledger.reserve(&new_booking(7, 2, 5)).await.unwrap();
        match ledger.reserve(&new_booking(7, 3, 4)).await {
            Err(BookingError::SeatConflict {
                seat_number,
                from_order,
                to_order,
            }) => {
                assert_eq!(seat_number, 7);
                assert_eq!((from_order, to_order), (2, 5));
            }
            other => panic!("expected SeatConflict, got {other:?}"),
        }
    }

    #[sqlx::test]
    async fn reserve_writes_the_fare_with_the_reservation(pool: SqlitePool) {
        seed_schedule(&pool).await;
        let ledger = SeatLedger::new(pool);

        // One insert carries the whole booking; a confirmed row can never
        // exist without its quoted fare
        let id = ledger.reserve(&new_booking(2, 1, 3)).await.unwrap();
        let stored = ledger.booking(id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.fare, 120.5);
    }

    #[sqlx::test]
    async fn cancel_frees_the_interval(pool: SqlitePool) {
        seed_schedule(&pool).await;
        let ledger = SeatLedger::new(pool);

        let id = ledger.reserve(&new_booking(3, 1, 3)).await.unwrap();
        ledger.cancel(id).await.unwrap();

        // Same interval can be booked again
        ledger.reserve(&new_booking(3, 1, 3)).await.unwrap();

        // The cancelled row is retained for audit
        let cancelled = ledger.booking(id).await.unwrap().unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
    }

    #[sqlx::test]
    async fn cancel_unknown_booking_fails(pool: SqlitePool) {
        seed_schedule(&pool).await;
        let ledger = SeatLedger::new(pool);
        let err = ledger.cancel(999).await.unwrap_err();
        assert!(matches!(err, BookingError::BookingNotFound(999)));
    }

    #[sqlx::test]
    async fn list_occupied_matches_overlapping_range(pool: SqlitePool) {
        seed_schedule(&pool).await;
        let ledger = SeatLedger::new(pool);

        ledger.reserve(&new_booking(1, 1, 2)).await.unwrap();
        ledger.reserve(&new_booking(2, 2, 4)).await.unwrap();

        // Query range [2, 3): seat 1's [1,2) only touches, seat 2 overlaps
        let occupied = ledger
            .list_occupied(1, travel_date(), 2, 3)
            .await
            .unwrap();
        assert!(!occupied.contains(&1));
        assert!(occupied.contains(&2));
    }

    #[sqlx::test]
    async fn racing_reserves_on_one_key_linearize(pool: SqlitePool) {
        seed_schedule(&pool).await;
        let ledger = SeatLedger::new(pool);

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            tasks.spawn(async move { ledger.reserve(&new_booking(5, 1, 3)).await });
        }

        let mut successes = 0;
        let mut conflicts = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Ok(_) => successes += 1,
                Err(BookingError::SeatConflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 7);
    }

    #[sqlx::test]
    async fn different_keys_do_not_conflict(pool: SqlitePool) {
        seed_schedule(&pool).await;
        let ledger = SeatLedger::new(pool);

        // Same interval on different seats and dates
        ledger.reserve(&new_booking(1, 1, 3)).await.unwrap();
        ledger.reserve(&new_booking(2, 1, 3)).await.unwrap();
        let mut other_date = new_booking(1, 1, 3);
        other_date.travel_date = NaiveDate::from_ymd_opt(2026, 9, 15).unwrap();
        ledger.reserve(&other_date).await.unwrap();
    }
}
