//! Command-line arguments for the tracking client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::{Parser, Subcommand};
use transit_common::Coordinate;
use transit_common::drivers::DriverOrder;
use transit_common::net::{DEFAULT_TRACKING_URL, RECONNECT_DELAY_MS};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

/// What to do.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow live bus positions until Ctrl+C.
    Track {
        /// WebSocket endpoint of the tracking service.
        #[arg(long, env = "TRACKING_URL", default_value = DEFAULT_TRACKING_URL)]
        url: String,

        /// Bus to follow; repeat for several buses.
        #[arg(long = "bus")]
        buses: Vec<String>,

        /// Also log every frame the service sends.
        #[arg(long)]
        all: bool,

        /// Delay before the first reconnect attempt, in milliseconds.
        #[arg(long, default_value_t = RECONNECT_DELAY_MS)]
        reconnect_ms: u64,

        /// Double the delay after each failed attempt, up to this many milliseconds.
        #[arg(long)]
        max_backoff_ms: Option<u64>,
    },

    /// Estimate an autorickshaw fare between two points.
    Fare {
        /// Pickup as "lat,lon".
        #[arg(long, allow_hyphen_values = true)]
        from: Coordinate,

        /// Drop-off as "lat,lon".
        #[arg(long, allow_hyphen_values = true)]
        to: Coordinate,

        /// Expected trip duration in minutes.
        #[arg(long, default_value_t = 15.0)]
        duration: f64,

        /// Apply the peak-hour surcharge.
        #[arg(long)]
        peak: bool,

        /// Loyalty points to redeem.
        #[arg(long, default_value_t = 0)]
        loyalty_points: u32,

        /// Flat starting fare.
        #[arg(long, default_value_t = 10.0)]
        base_fare: f64,

        /// Price per kilometre.
        #[arg(long, default_value_t = 8.0)]
        per_km: f64,

        /// Price per minute.
        #[arg(long, default_value_t = 0.5)]
        per_minute: f64,
    },

    /// List drivers from a JSON Lines file, nearest or best rated first.
    Drivers {
        /// Path to the drivers file (one JSON object per line).
        #[arg(long)]
        path: String,

        /// Rider position as "lat,lon".
        #[arg(long, allow_hyphen_values = true)]
        near: Coordinate,

        /// Sort order.
        #[arg(long, value_enum, default_value_t = DriverOrder::Distance)]
        order: DriverOrder,

        /// Hide drivers that are not taking rides.
        #[arg(long)]
        available_only: bool,
    },
}
