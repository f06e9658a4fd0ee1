//! Error types shared between the tracking client, the simulation server and
//! the geo/fare helpers.
//!
//! `TransitError` covers I/O, JSON, transport and channel failures as well as
//! the domain errors raised by geo math (bad coordinates, negative durations,
//! fares that would turn negative), so every crate can propagate one type.
use std::io;

use thiserror::Error;

/// Unified error type for the workspace.
#[derive(Error, Debug)]
pub enum TransitError {
    /// I/O error originating from the standard library or sockets/files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Latitude/longitude outside the valid range or not finite.
    #[error("Invalid coordinate: latitude={latitude}, longitude={longitude}")]
    InvalidCoordinate {
        /// Rejected latitude in decimal degrees.
        latitude: f64,
        /// Rejected longitude in decimal degrees.
        longitude: f64,
    },

    /// Text that is not a `"lat,lon"` pair.
    #[error("Parse coordinate error: {0}")]
    ParseCoordinate(String),

    /// Duration that is negative or not a number.
    #[error("Invalid duration: {0} minutes")]
    InvalidDuration(f64),

    /// Distance that is negative or not a number.
    #[error("Invalid distance: {0}")]
    InvalidDistance(f64),

    /// Average speed that is zero, negative or not a number.
    #[error("Invalid average speed: {0} km/h")]
    InvalidSpeed(f64),

    /// Fare input that would produce a negative or non-finite fare.
    #[error("Invalid fare: {0}")]
    InvalidFare(String),

    /// Error while parsing a drivers file; carries the 1-based line number.
    #[error("Parse drivers file error at line {line}: {reason}")]
    ParseDrivers {
        /// Line that failed to parse.
        line: usize,
        /// Underlying parser message.
        reason: String,
    },

    /// WebSocket handshake or framing failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Crossbeam/channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),
}
