//! Autorickshaw drivers and the orderings offered to riders.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use strum_macros::{Display, EnumString};

use crate::error::TransitError;
use crate::geo::{Coordinate, distance_meters};

/// A driver available for booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    /// Driver identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Average rating, 0 to 5.
    pub rating: f32,
    /// Number of reviews behind `rating`.
    pub reviews: u32,
    /// Registration plate.
    pub vehicle_number: String,
    /// Kind of vehicle (e.g. `auto`, `e-auto`).
    pub vehicle_type: String,
    /// Last reported position.
    pub current_location: Coordinate,
    /// Whether the driver currently accepts rides.
    pub is_available: bool,
}

/// Trait providing file parsing for drivers.
pub trait DriverParser {
    /// Parses drivers from JSON Lines: one JSON object per non-empty line.
    ///
    /// Returns an error naming the first line that cannot be parsed.
    fn parse_from_reader<R: BufRead>(reader: R) -> Result<Vec<Driver>, TransitError>;
}

impl DriverParser for Driver {
    fn parse_from_reader<R: BufRead>(reader: R) -> Result<Vec<Self>, TransitError> {
        let mut drivers = Vec::new();

        for (index, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(TransitError::Io)?;
            let trimmed_line = line.trim();
            if trimmed_line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Self>(trimmed_line) {
                Ok(driver) => drivers.push(driver),
                Err(e) => {
                    return Err(TransitError::ParseDrivers {
                        line: index + 1,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(drivers)
    }
}

/// Orderings for a list of drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display, EnumString)]
#[clap(rename_all = "lower")]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum DriverOrder {
    /// Nearest first.
    Distance,
    /// Best rated first.
    Rating,
}

/// Sorts `drivers` nearest-first relative to `origin`; ties keep their input order.
pub fn sort_by_distance(drivers: &mut [Driver], origin: &Coordinate) {
    drivers.sort_by(|a, b| {
        let distance_a = distance_meters(origin, &a.current_location);
        let distance_b = distance_meters(origin, &b.current_location);
        distance_a.total_cmp(&distance_b)
    });
}

/// Sorts `drivers` best-rated first; ties keep their input order.
pub fn sort_by_rating(drivers: &mut [Driver]) {
    drivers.sort_by(|a, b| b.rating.total_cmp(&a.rating));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor, Write};

    fn driver(id: &str, rating: f32, lat: f64, lon: f64) -> Driver {
        Driver {
            id: id.to_string(),
            name: format!("Driver {}", id),
            rating,
            reviews: 10,
            vehicle_number: format!("TN-01-{}", id),
            vehicle_type: "auto".to_string(),
            current_location: Coordinate::new(lat, lon).unwrap(),
            is_available: true,
        }
    }

    fn ids(drivers: &[Driver]) -> Vec<&str> {
        drivers.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn sorts_nearest_first_and_keeps_ties_stable() {
        let origin = Coordinate::new(13.0, 80.0).unwrap();
        let mut drivers = vec![
            driver("far", 4.0, 13.1, 80.0),
            driver("tie-a", 4.0, 13.01, 80.0),
            driver("near", 4.0, 13.0, 80.001),
            driver("tie-b", 4.0, 13.01, 80.0),
        ];
        sort_by_distance(&mut drivers, &origin);
        assert_eq!(ids(&drivers), vec!["near", "tie-a", "tie-b", "far"]);
    }

    #[test]
    fn sorts_best_rated_first_and_keeps_ties_stable() {
        let mut drivers = vec![
            driver("a", 4.2, 0.0, 0.0),
            driver("b", 4.8, 0.0, 0.0),
            driver("c", 4.2, 0.0, 0.0),
            driver("d", 3.9, 0.0, 0.0),
        ];
        sort_by_rating(&mut drivers);
        assert_eq!(ids(&drivers), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn parses_json_lines_skipping_blank_lines() {
        let input = concat!(
            r#"{"id":"1","name":"Ravi","rating":4.5,"reviews":120,"vehicleNumber":"TN-01-1234","vehicleType":"auto","currentLocation":{"latitude":13.08,"longitude":80.27},"isAvailable":true}"#,
            "\n\n",
            r#"{"id":"2","name":"Kumar","rating":4.1,"reviews":80,"vehicleNumber":"TN-01-5678","vehicleType":"e-auto","currentLocation":{"latitude":13.05,"longitude":80.25},"isAvailable":false}"#,
            "\n"
        );
        let drivers = Driver::parse_from_reader(Cursor::new(input)).unwrap();
        assert_eq!(ids(&drivers), vec!["1", "2"]);
        assert!(!drivers[1].is_available);
    }

    #[test]
    fn reports_the_failing_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"id":"1","name":"Ravi","rating":4.5,"reviews":1,"vehicleNumber":"X","vehicleType":"auto","currentLocation":{{"latitude":13.08,"longitude":80.27}},"isAvailable":true}}"#
        )
        .unwrap();
        writeln!(
            file,
            r#"{{"id":"2","name":"Bad","rating":4.5,"reviews":1,"vehicleNumber":"X","vehicleType":"auto","currentLocation":{{"latitude":130.0,"longitude":80.27}},"isAvailable":true}}"#
        )
        .unwrap();

        let reader = BufReader::new(file.reopen().unwrap());
        match Driver::parse_from_reader(reader) {
            Err(TransitError::ParseDrivers { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn order_parses_case_insensitively() {
        assert_eq!("Rating".parse::<DriverOrder>().unwrap(), DriverOrder::Rating);
        assert_eq!(DriverOrder::Distance.to_string(), "distance");
    }
}
