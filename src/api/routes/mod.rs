mod list;

pub use list::*;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::services::RouteTopology;

#[derive(Clone)]
pub struct RoutesState {
    pub pool: SqlitePool,
    pub topology: Arc<RouteTopology>,
}

pub fn router(pool: SqlitePool, topology: Arc<RouteTopology>) -> Router {
    let state = RoutesState { pool, topology };
    Router::new()
        .route("/", get(list_routes))
        .route("/{id}/stations", get(get_route_stations))
        .with_state(state)
}
