//! Domain models for the tracking simulation server.
//!
//! - `bus`: a simulated bus and its movement model.
//! - `bus_simulator`: background fleet generator and `BusEvent` broadcasting.
//! - `session`: per-connection subscription filter.

pub mod bus;
pub mod bus_simulator;
pub mod session;
