use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::services::{PositionHub, RouteTopology, SeatLedger};

#[derive(Clone)]
pub struct HealthState {
    pub pool: SqlitePool,
    pub topology: Arc<RouteTopology>,
    pub hub: Arc<PositionHub>,
    pub ledger: SeatLedger,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the service is running
    pub healthy: bool,
    /// Number of routes in the store
    pub route_count: i64,
    /// Number of schedules in the store
    pub schedule_count: i64,
    /// Confirmed bookings across all schedules
    pub confirmed_bookings: i64,
    /// Routes currently held in the topology cache
    pub cached_routes: usize,
    /// Position reports dropped for invalid coordinates since startup
    pub dropped_position_reports: u64,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<HealthState>) -> Json<HealthResponse> {
    let route_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM routes")
        .fetch_one(&state.pool)
        .await
        .unwrap_or(0);
    let schedule_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schedules")
        .fetch_one(&state.pool)
        .await
        .unwrap_or(0);
    let confirmed_bookings = state.ledger.confirmed_count().await.unwrap_or(0);

    Json(HealthResponse {
        healthy: true,
        route_count,
        schedule_count,
        confirmed_bookings,
        cached_routes: state.topology.cached_route_count().await,
        dropped_position_reports: state.hub.dropped_report_count(),
    })
}

pub fn router(
    pool: SqlitePool,
    topology: Arc<RouteTopology>,
    hub: Arc<PositionHub>,
    ledger: SeatLedger,
) -> Router {
    let state = HealthState {
        pool,
        topology,
        hub,
        ledger,
    };
    Router::new().route("/", get(health_check)).with_state(state)
}
