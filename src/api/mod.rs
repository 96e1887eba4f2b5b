pub mod bookings;
pub mod error;
pub mod health;
pub mod routes;
pub mod schedules;
pub mod tracking;

pub use error::{ApiError, ErrorResponse};

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::services::{BookingService, PositionHub, RouteTopology};

pub fn router(
    pool: SqlitePool,
    topology: Arc<RouteTopology>,
    booking_service: Arc<BookingService>,
    hub: Arc<PositionHub>,
) -> Router {
    let ws_state = tracking::ws::WsState {
        hub: hub.clone(),
        seat_booked_tx: booking_service.seat_booked_sender(),
    };
    let ledger = booking_service.ledger().clone();

    Router::new()
        .nest("/routes", routes::router(pool.clone(), topology.clone()))
        .nest("/schedules", schedules::router(pool.clone()))
        .nest("/bookings", bookings::router(booking_service))
        .nest("/tracking", tracking::router(hub.clone()))
        .nest("/health", health::router(pool, topology, hub, ledger))
        .route("/ws/positions", get(tracking::ws::ws_positions).with_state(ws_state))
}
