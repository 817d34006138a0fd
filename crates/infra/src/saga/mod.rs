//! Caller-level sagas composed on top of the stock counter.
//!
//! The counter itself never bundles multi-key work; compensation across
//! several ids lives here.

pub mod stock_reservation;

pub use stock_reservation::{Reservation, ReservationError, reserve_all};
