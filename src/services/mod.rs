//! Core reservation and tracking services.
//!
//! - [`topology`] resolves station names to order indices and measures
//!   segment distances (cached per route)
//! - [`fare`] prices a segment from the schedule's rate table
//! - [`ledger`] owns seat reservations and the no-overlap invariant
//! - [`booking`] orchestrates topology, ledger and fare for one request
//! - [`position`] ingests GPS reports and fans updates out to viewers

pub mod booking;
pub mod error;
pub mod fare;
pub mod ledger;
pub mod position;
pub mod topology;

pub use booking::{BookingService, SeatBookedSender};
pub use error::BookingError;
pub use ledger::SeatLedger;
pub use position::PositionHub;
pub use topology::RouteTopology;
