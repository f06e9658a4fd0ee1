//! Command-line arguments for the tracking simulation server.
use clap::Parser;
use transit_common::Coordinate;
use transit_common::net::{DEFAULT_SERVER_PORT, addr};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Address to accept WebSocket clients on.
    #[arg(long, env = "TRACKING_BIND", default_value_t = addr("0.0.0.0", DEFAULT_SERVER_PORT))]
    pub bind: String,

    /// Number of simulated buses.
    #[arg(long, default_value_t = 8)]
    pub buses: usize,

    /// Interval between position updates, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub tick_ms: u64,

    /// Centre of the simulated area as "lat,lon".
    #[arg(long, allow_hyphen_values = true, default_value = "13.0827,80.2707")]
    pub center: Coordinate,
}
