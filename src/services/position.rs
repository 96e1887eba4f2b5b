//! Live position hub.
//!
//! Ingests GPS reports per schedule, keeps only the latest position, and
//! fans enriched updates out to subscribers. Fan-out is state-based and
//! best-effort: a slow subscriber may miss intermediate updates but a late
//! subscriber always receives the most recent position on subscribe.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::{broadcast, RwLock};

use crate::config::TrackingConfig;
use crate::models::{LastKnownPosition, PositionReport, PositionUpdate};
use crate::services::topology::{haversine_km, CachedRoute, RouteTopology};
use crate::services::BookingError;

struct ScheduleChannel {
    tx: broadcast::Sender<PositionUpdate>,
    latest: Option<PositionUpdate>,
}

pub struct PositionHub {
    pool: SqlitePool,
    topology: Arc<RouteTopology>,
    average_speed_kmh: f64,
    channel_capacity: usize,
    channels: RwLock<HashMap<i64, ScheduleChannel>>,
    dropped_reports: AtomicU64,
}

/// Estimated next stop for a position on a route
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NextStop {
    pub name: String,
    pub distance_km: f64,
    pub eta_minutes: i64,
}

/// Locate the nearest waypoint by squared planar distance (cheap
/// approximation, not geodesic), treat the following waypoint as the next
/// station, and estimate arrival from the haversine distance to it at the
/// given average speed.
pub(crate) fn next_stop_estimate(
    route: &CachedRoute,
    lat: f64,
    lng: f64,
    average_speed_kmh: f64,
) -> Option<NextStop> {
    let located: Vec<(&str, f64, f64)> = route
        .stations
        .iter()
        .filter_map(|s| Some((s.name.as_str(), s.lat?, s.lng?)))
        .collect();
    if located.is_empty() {
        return None;
    }

    let mut nearest = 0;
    let mut best = f64::INFINITY;
    for (i, (_, s_lat, s_lng)) in located.iter().enumerate() {
        let d = (s_lat - lat).powi(2) + (s_lng - lng).powi(2);
        if d < best {
            best = d;
            nearest = i;
        }
    }

    // Past the final waypoint there is no next station
    let (name, n_lat, n_lng) = located.get(nearest + 1)?;
    let distance_km = haversine_km(lat, lng, *n_lat, *n_lng);
    let eta_minutes = (distance_km / average_speed_kmh * 60.0).round() as i64;
    Some(NextStop {
        name: name.to_string(),
        distance_km,
        eta_minutes,
    })
}

impl PositionHub {
    pub fn new(pool: SqlitePool, topology: Arc<RouteTopology>, tracking: &TrackingConfig) -> Self {
        Self {
            pool,
            topology,
            average_speed_kmh: tracking.average_speed_kmh,
            channel_capacity: tracking.channel_capacity,
            channels: RwLock::new(HashMap::new()),
            dropped_reports: AtomicU64::new(0),
        }
    }

    /// Accept one GPS report. Out-of-range coordinates are dropped without
    /// touching the stored position; valid reports overwrite the
    /// schedule's last known position and are pushed to all subscribers.
    /// Returns the broadcast update, or `None` when the report was dropped.
    pub async fn report(
        &self,
        report: PositionReport,
    ) -> Result<Option<PositionUpdate>, BookingError> {
        if !(-90.0..=90.0).contains(&report.lat) || !(-180.0..=180.0).contains(&report.lng) {
            self.dropped_reports.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                schedule_id = report.schedule_id,
                lat = report.lat,
                lng = report.lng,
                "dropping position report with out-of-range coordinates"
            );
            return Ok(None);
        }

        let route_id: Option<(i64,)> =
            sqlx::query_as("SELECT route_id FROM schedules WHERE id = ?")
                .bind(report.schedule_id)
                .fetch_optional(&self.pool)
                .await?;
        let (route_id,) = route_id.ok_or(BookingError::ScheduleNotFound(report.schedule_id))?;
        let route = self.topology.route(route_id).await?;

        let timestamp = report.timestamp.unwrap_or_else(Utc::now);
        let next = next_stop_estimate(&route, report.lat, report.lng, self.average_speed_kmh);

        // Persist before publishing so a store failure leaves subscribers
        // and the snapshot untouched
        sqlx::query(
            "UPDATE schedules SET current_lat = ?, current_lng = ?, position_updated_at = ? \
             WHERE id = ?",
        )
        .bind(report.lat)
        .bind(report.lng)
        .bind(timestamp.to_rfc3339())
        .bind(report.schedule_id)
        .execute(&self.pool)
        .await?;

        let update = PositionUpdate {
            schedule_id: report.schedule_id,
            lat: report.lat,
            lng: report.lng,
            speed_kmh: report.speed_kmh,
            next_station: next.as_ref().map(|n| n.name.clone()),
            distance_to_next_km: next.as_ref().map(|n| n.distance_km),
            eta_minutes: next.as_ref().map(|n| n.eta_minutes),
            timestamp: timestamp.to_rfc3339(),
        };

        let mut channels = self.channels.write().await;
        let channel = channels
            .entry(report.schedule_id)
            .or_insert_with(|| self.new_channel());
        channel.latest = Some(update.clone());
        // Send fails when no subscriber is connected; that is fine
        let _ = channel.tx.send(update.clone());

        Ok(Some(update))
    }

    fn new_channel(&self) -> ScheduleChannel {
        let (tx, _) = broadcast::channel(self.channel_capacity);
        ScheduleChannel { tx, latest: None }
    }

    /// Subscribe to a schedule's position stream. Returns the latest known
    /// update (if any) for immediate delivery, plus the live receiver.
    /// Dropping the receiver unsubscribes.
    pub async fn subscribe(
        &self,
        schedule_id: i64,
    ) -> (Option<PositionUpdate>, broadcast::Receiver<PositionUpdate>) {
        let mut channels = self.channels.write().await;
        let channel = channels
            .entry(schedule_id)
            .or_insert_with(|| self.new_channel());
        (channel.latest.clone(), channel.tx.subscribe())
    }

    /// Last accepted position for a schedule; falls back to the stored
    /// cell so the value survives a restart
    pub async fn last_known(
        &self,
        schedule_id: i64,
    ) -> Result<Option<LastKnownPosition>, BookingError> {
        {
            let channels = self.channels.read().await;
            if let Some(update) = channels.get(&schedule_id).and_then(|c| c.latest.as_ref()) {
                return Ok(Some(LastKnownPosition {
                    lat: update.lat,
                    lng: update.lng,
                    updated_at: update.timestamp.clone(),
                }));
            }
        }

        let row: Option<(Option<f64>, Option<f64>, Option<String>)> = sqlx::query_as(
            "SELECT current_lat, current_lng, position_updated_at FROM schedules WHERE id = ?",
        )
        .bind(schedule_id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            None => Err(BookingError::ScheduleNotFound(schedule_id)),
            Some((Some(lat), Some(lng), updated_at)) => Ok(Some(LastKnownPosition {
                lat,
                lng,
                updated_at: updated_at.unwrap_or_default(),
            })),
            Some(_) => Ok(None),
        }
    }

    /// Reports dropped for invalid coordinates since startup
    pub fn dropped_report_count(&self) -> u64 {
        self.dropped_reports.load(Ordering::Relaxed)
    }
}
