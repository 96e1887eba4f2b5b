mod cancel;
mod create;
mod seat_map;

pub use cancel::*;
pub use create::*;
pub use seat_map::*;

use axum::{routing::post, Router};
use std::sync::Arc;

use crate::services::BookingService;

#[derive(Clone)]
pub struct BookingsState {
    pub service: Arc<BookingService>,
}

pub fn router(service: Arc<BookingService>) -> Router {
    let state = BookingsState { service };
    Router::new()
        .route("/", post(create_booking))
        .route("/{id}/cancel", post(cancel_booking))
        .route("/seat-map", post(get_seat_map))
        .with_state(state)
}
