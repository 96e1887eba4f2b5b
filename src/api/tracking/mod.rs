mod report;
pub mod ws;

pub use report::*;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::services::PositionHub;

#[derive(Clone)]
pub struct TrackingState {
    pub hub: Arc<PositionHub>,
}

pub fn router(hub: Arc<PositionHub>) -> Router {
    let state = TrackingState { hub };
    Router::new()
        .route("/report", post(report_position))
        .route("/{schedule_id}/position", get(get_last_position))
        .with_state(state)
}
