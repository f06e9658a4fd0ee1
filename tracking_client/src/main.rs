//! Tracking Client: follows live bus positions from the real-time tracking
//! service and offers the rider-side helpers of the transit app on the command line.
//!
//! Usage examples (CLI):
//! ```bash
//! tracking_client track --url ws://127.0.0.1:9001/tracking --bus 21G --bus 5C
//! tracking_client fare --from 13.0827,80.2707 --to 13.0067,80.2206 --duration 25 --peak
//! tracking_client drivers --path ./drivers.jsonl --near 13.05,80.25 --order rating
//! ```
//!
//! `track` keeps reconnecting after the service drops the connection until
//! Ctrl+C is pressed.
#![warn(missing_docs)]
mod args;

use crate::args::{Args, Command};
use clap::Parser;
use log::{info, warn};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use tracking_client::{ClientConfig, ReconnectPolicy, TrackingClient, WsConnector, ws};
use transit_common::drivers::{Driver, DriverOrder, DriverParser, sort_by_distance, sort_by_rating};
use transit_common::fare::FareTariff;
use transit_common::geo::{
    DEFAULT_AVERAGE_SPEED_KMH, distance_km, estimate_travel_time, format_distance, format_travel_time,
};
use transit_common::{Coordinate, Result, TransitError, TrackingMessage};

fn main() -> Result<(), TransitError> {
    init_logger();
    let args = Args::parse();

    match args.command {
        Command::Track {
            url,
            buses,
            all,
            reconnect_ms,
            max_backoff_ms,
        } => {
            let reconnect = match max_backoff_ms {
                Some(max) => ReconnectPolicy::exponential(
                    Duration::from_millis(reconnect_ms),
                    Duration::from_millis(max),
                ),
                None => ReconnectPolicy::fixed(Duration::from_millis(reconnect_ms)),
            };
            let config = ClientConfig {
                reconnect,
                ..ClientConfig::new(url.trim())
            };
            track(config, &buses, all)
        }
        Command::Fare {
            from,
            to,
            duration,
            peak,
            loyalty_points,
            base_fare,
            per_km,
            per_minute,
        } => {
            let tariff = FareTariff {
                base_fare,
                per_km_rate: per_km,
                per_minute_rate: per_minute,
            };
            fare(&tariff, &from, &to, duration, peak, loyalty_points)
        }
        Command::Drivers {
            path,
            near,
            order,
            available_only,
        } => drivers(&normalize_path(&path), &near, order, available_only),
    }
}

fn track(config: ClientConfig, buses: &[String], all: bool) -> Result<()> {
    if buses.is_empty() && !all {
        warn!("No --bus given and --all not set; nothing will be printed.");
    }
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down client...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| TransitError::Transport(format!("Error setting Ctrl+C handler: {}", e)))?;
    }

    ws::install_tls_provider();
    let mut client = TrackingClient::new(config, WsConnector::new());
    for bus_id in buses {
        let bus = bus_id.clone();
        client.subscribe(bus_id, move |update| {
            let next = update.next_stop.as_deref().unwrap_or("-");
            let eta = update
                .estimated_arrival
                .map(format_travel_time)
                .unwrap_or_else(|| String::from("-"));
            info!(
                "BUS: {} Lat={:.5} Lon={:.5} Next={} ETA={}",
                bus, update.latitude, update.longitude, next, eta
            );
        });
    }
    if all {
        client.subscribe_to_all(|message: &TrackingMessage| match message.to_json() {
            Ok(json) => info!("FRAME: {}", json),
            Err(e) => warn!("Cannot render frame {:?}: {}", message, e),
        });
    }

    client.connect();
    info!("Client is running. Press Ctrl+C to exit.");
    client.run(&shutdown);
    Ok(())
}

fn fare(
    tariff: &FareTariff,
    from: &Coordinate,
    to: &Coordinate,
    duration: f64,
    peak: bool,
    loyalty_points: u32,
) -> Result<()> {
    let km = distance_km(from, to);
    let estimate = tariff
        .estimate_fare(from, to, duration)?
        .apply_peak_surcharge(peak)
        .apply_loyalty_discount(loyalty_points)?;
    let travel = estimate_travel_time(km, DEFAULT_AVERAGE_SPEED_KMH)?;

    info!(
        "Distance {} (about {} at {} km/h)",
        format_distance(km * 1000.0),
        format_travel_time(travel),
        DEFAULT_AVERAGE_SPEED_KMH
    );
    println!("{}", serde_json::to_string_pretty(&estimate)?);
    Ok(())
}

fn drivers(path: &PathBuf, near: &Coordinate, order: DriverOrder, available_only: bool) -> Result<()> {
    if !is_file_exist(path) {
        return Err(TransitError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("drivers file not found: {}", path.display()),
        )));
    }
    let reader = BufReader::new(File::open(path)?);
    let mut drivers = Driver::parse_from_reader(reader)?;
    if available_only {
        drivers.retain(|d| d.is_available);
    }
    match order {
        DriverOrder::Distance => sort_by_distance(&mut drivers, near),
        DriverOrder::Rating => sort_by_rating(&mut drivers),
    }
    info!("{} driver(s) sorted by {}", drivers.len(), order);

    for driver in &drivers {
        println!(
            "{:<8} {:<16} {:>3.1} ({:>4} reviews) {:<12} {:>9}",
            driver.id,
            driver.name,
            driver.rating,
            driver.reviews,
            driver.vehicle_number,
            format_distance(near.distance_to(&driver.current_location)),
        );
    }
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

/// Returns `true` if the provided path exists and is a regular file.
fn is_file_exist(path: &PathBuf) -> bool {
    path.exists() && path.is_file()
}
