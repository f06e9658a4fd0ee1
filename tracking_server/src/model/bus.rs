//! Simulated bus and its movement model.
//!
//! Each `SimulatedBus` drives in a slowly wandering direction at a jittering
//! speed and counts down to its next stop. `advance` moves it by one tick and
//! returns the `LocationPayload` that is broadcast to subscribers.

use chrono::Utc;
use rand::Rng;
use std::time::Duration;
use transit_common::geo::EARTH_RADIUS_M;
use transit_common::{Coordinate, LocationPayload};

/// Route numbers handed out to the first buses of a fleet.
const ROUTE_NUMBERS: [&str; 8] = ["21G", "5C", "23C", "12B", "29C", "47A", "M70", "570"];
/// Stops cycled through by every simulated bus.
const STOPS: [&str; 6] = [
    "Central",
    "Egmore",
    "T. Nagar",
    "Saidapet",
    "Guindy",
    "Adyar",
];

/// One bus of the simulated fleet.
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    /// Route number used as the bus id on the wire.
    pub id: String,
    /// Current position.
    pub position: Coordinate,
    /// Direction of travel in degrees clockwise from north.
    pub heading: f64,
    /// Current ground speed.
    pub speed_kmh: f64,
    next_stop: usize,
    seconds_to_stop: f64,
}

impl SimulatedBus {
    /// Create a bus at `position` heading `heading` degrees at `speed_kmh`.
    pub fn new(id: &str, position: Coordinate, heading: f64, speed_kmh: f64) -> Self {
        Self {
            id: String::from(id),
            position,
            heading,
            speed_kmh,
            next_stop: 0,
            seconds_to_stop: 180.0,
        }
    }

    /// Build `count` buses scattered within roughly 2 km of `center`.
    pub fn fleet<R: Rng>(center: Coordinate, count: usize, rng: &mut R) -> Vec<Self> {
        (0..count)
            .map(|i| {
                let id = ROUTE_NUMBERS
                    .get(i)
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| format!("BUS{}", i + 1));
                let lat = center.latitude() + rng.random_range(-0.02..0.02);
                let lon = center.longitude() + rng.random_range(-0.02..0.02);
                let position = Coordinate::new(lat, lon).unwrap_or(center);
                let mut bus = Self::new(
                    &id,
                    position,
                    rng.random_range(0.0..360.0),
                    rng.random_range(15.0..35.0),
                );
                bus.next_stop = i % STOPS.len();
                bus
            })
            .collect()
    }

    /// Name of the stop the bus is heading to.
    pub fn next_stop(&self) -> &str {
        STOPS[self.next_stop]
    }

    /// Move the bus forward by `tick` and report where it is now.
    pub fn advance<R: Rng>(&mut self, tick: Duration, rng: &mut R) -> LocationPayload {
        self.heading = (self.heading + rng.random_range(-10.0..10.0)).rem_euclid(360.0);
        self.speed_kmh = (self.speed_kmh + rng.random_range(-2.0..2.0)).clamp(5.0, 50.0);
        self.move_by(self.speed_kmh / 3.6 * tick.as_secs_f64());

        self.seconds_to_stop -= tick.as_secs_f64();
        if self.seconds_to_stop <= 0.0 {
            self.next_stop = (self.next_stop + 1) % STOPS.len();
            self.seconds_to_stop = rng.random_range(120.0..360.0);
        }

        self.payload()
    }

    /// Current state as a wire payload.
    pub fn payload(&self) -> LocationPayload {
        LocationPayload {
            latitude: self.position.latitude(),
            longitude: self.position.longitude(),
            speed_kmh: Some(self.speed_kmh),
            heading: Some(self.heading),
            next_stop: Some(self.next_stop().to_string()),
            estimated_arrival: Some((self.seconds_to_stop / 60.0).ceil() as u32),
            timestamp: Some(Utc::now().timestamp_millis() as u64),
        }
    }

    /// Move `meters` along the current heading; turns around instead of
    /// leaving the valid coordinate range.
    fn move_by(&mut self, meters: f64) {
        let heading = self.heading.to_radians();
        let lat = self.position.latitude();
        let dlat = (meters * heading.cos() / EARTH_RADIUS_M).to_degrees();
        let dlon = (meters * heading.sin() / (EARTH_RADIUS_M * lat.to_radians().cos())).to_degrees();

        match Coordinate::new(lat + dlat, self.position.longitude() + dlon) {
            Ok(next) => self.position = next,
            Err(_) => self.heading = (self.heading + 180.0).rem_euclid(360.0),
        }
    }
}
