mod list;

pub use list::*;

use axum::{routing::get, Router};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct SchedulesState {
    pub pool: SqlitePool,
}

pub fn router(pool: SqlitePool) -> Router {
    let state = SchedulesState { pool };
    Router::new()
        .route("/by-route/{route_id}", get(list_schedules_by_route))
        .with_state(state)
}
