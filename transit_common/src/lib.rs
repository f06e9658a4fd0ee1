//!
//! Common types and utilities shared by the tracking client and server.
//!
//! This crate aggregates:
//! - `error`: unified error type `TransitError` used across the workspace.
//! - `result`: handy `Result<T, TransitError>` alias.
//! - `geo`: validated coordinates, haversine distance and formatting helpers.
//! - `fare`: autorickshaw fare estimation, peak surcharge and loyalty discount.
//! - `drivers`: driver records, file parsing and sort orders.
//! - `message`: JSON frames exchanged with the tracking service.
//! - `net`: networking constants and small helpers.
#![warn(missing_docs)]
pub mod drivers;
pub mod error;
pub mod fare;
pub mod geo;
pub mod message;
pub mod net;
pub mod result;

pub use error::TransitError;
pub use geo::Coordinate;
pub use message::{ControlMessage, LocationPayload, TrackingMessage};
pub use result::Result;
