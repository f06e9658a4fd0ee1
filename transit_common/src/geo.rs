//! Great-circle distance and distance/travel-time formatting.
//!
//! All distances are computed with one canonical Earth radius expressed in
//! metres (`EARTH_RADIUS_M`); kilometre values are derived from it so the two
//! units can never disagree.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TransitError;
use crate::result::Result;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
/// Default allowed distance for a geofence check, in metres.
pub const DEFAULT_GEOFENCE_METERS: f64 = 500.0;
/// Default average vehicle speed for travel time estimates, in km/h.
pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 30.0;

/// Latitude/longitude pair in decimal degrees.
///
/// Always holds finite values with latitude in `[-90, 90]` and longitude in
/// `[-180, 180]`; the only ways to build one (`new`, `FromStr`, serde) validate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = TransitError;

    fn try_from(raw: RawCoordinate) -> Result<Self> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Creates a coordinate, rejecting NaN, infinities and out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(TransitError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Distance to `other` in metres.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance_meters(self, other)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Parses `"lat,lon"` (whitespace around either number is ignored).
impl FromStr for Coordinate {
    type Err = TransitError;

    fn from_str(s: &str) -> Result<Self> {
        let (lat, lon) = s.split_once(',').ok_or_else(|| {
            TransitError::ParseCoordinate(format!("expected \"lat,lon\", got \"{}\"", s))
        })?;
        let parse = |part: &str| {
            part.trim().parse::<f64>().map_err(|e| {
                TransitError::ParseCoordinate(format!("bad coordinate component \"{}\": {}", part, e))
            })
        };
        Coordinate::new(parse(lat)?, parse(lon)?)
    }
}

/// Haversine great-circle distance between `a` and `b`, in metres.
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // rounding can push h slightly above 1 for antipodal points
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Haversine distance between `a` and `b`, in kilometres.
pub fn distance_km(a: &Coordinate, b: &Coordinate) -> f64 {
    distance_meters(a, b) / 1000.0
}

/// `true` if `a` and `b` are at most `allowed_meters` apart.
pub fn is_within_distance(a: &Coordinate, b: &Coordinate, allowed_meters: f64) -> bool {
    distance_meters(a, b) <= allowed_meters
}

/// Human readable distance: whole metres below one kilometre, otherwise
/// kilometres with two decimals.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.0} m", meters)
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

/// Travel time in whole minutes for `distance_km` at `average_speed_kmh`.
pub fn estimate_travel_time(distance_km: f64, average_speed_kmh: f64) -> Result<u32> {
    if !distance_km.is_finite() || distance_km < 0.0 {
        return Err(TransitError::InvalidDistance(distance_km));
    }
    if !average_speed_kmh.is_finite() || average_speed_kmh <= 0.0 {
        return Err(TransitError::InvalidSpeed(average_speed_kmh));
    }
    let minutes = (distance_km / average_speed_kmh * 60.0).round();
    if minutes > u32::MAX as f64 {
        return Err(TransitError::InvalidDistance(distance_km));
    }
    Ok(minutes as u32)
}

/// `"45 min"` under an hour, `"1h 30m"` otherwise.
pub fn format_travel_time(minutes: u32) -> String {
    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn one_degree_of_longitude_on_the_equator() {
        let d = distance_meters(&coord(0.0, 0.0), &coord(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 50.0, "got {}", d);
    }

    #[test]
    fn chennai_landmarks_are_a_few_km_apart() {
        let central = coord(13.0827, 80.2707);
        let guindy = coord(13.0067, 80.2206);
        let km = distance_km(&central, &guindy);
        assert!(km > 9.0 && km < 11.0, "got {}", km);
    }

    #[test]
    fn antipodal_points_do_not_produce_nan() {
        let d = distance_meters(&coord(0.0, 0.0), &coord(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }

    #[test]
    fn rejects_out_of_range_and_nan() {
        assert!(matches!(
            Coordinate::new(90.1, 0.0),
            Err(TransitError::InvalidCoordinate { .. })
        ));
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn parses_lat_lon_pairs() {
        let c: Coordinate = " 13.08, 80.27 ".parse().unwrap();
        assert_eq!(c, coord(13.08, 80.27));
        assert!("13.08".parse::<Coordinate>().is_err());
        assert!("abc,1".parse::<Coordinate>().is_err());
        assert!("100,1".parse::<Coordinate>().is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Coordinate = serde_json::from_str(r#"{"latitude":1.5,"longitude":2.5}"#).unwrap();
        assert_eq!(ok.latitude(), 1.5);
        let bad = serde_json::from_str::<Coordinate>(r#"{"latitude":91,"longitude":0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn formats_distances() {
        assert_eq!(format_distance(500.0), "500 m");
        assert_eq!(format_distance(2500.0), "2.50 km");
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(1000.0), "1.00 km");
    }

    #[test]
    fn geofence_uses_inclusive_boundary() {
        let office = coord(12.9716, 77.5946);
        let nearby = coord(12.9730, 77.5950);
        assert!(is_within_distance(&office, &nearby, DEFAULT_GEOFENCE_METERS));
        let d = distance_meters(&office, &nearby);
        assert!(is_within_distance(&office, &nearby, d));
        assert!(!is_within_distance(&office, &coord(13.0827, 80.2707), DEFAULT_GEOFENCE_METERS));
    }

    #[test]
    fn travel_time_estimates() {
        assert_eq!(estimate_travel_time(15.0, DEFAULT_AVERAGE_SPEED_KMH).unwrap(), 30);
        assert_eq!(estimate_travel_time(45.0, DEFAULT_AVERAGE_SPEED_KMH).unwrap(), 90);
        assert_eq!(format_travel_time(30), "30 min");
        assert_eq!(format_travel_time(90), "1h 30m");
        assert_eq!(format_travel_time(120), "2h 0m");
        assert!(matches!(
            estimate_travel_time(-1.0, 30.0),
            Err(TransitError::InvalidDistance(_))
        ));
        assert!(matches!(
            estimate_travel_time(1.0, 0.0),
            Err(TransitError::InvalidSpeed(_))
        ));
    }

    proptest! {
        #[test]
        fn distance_to_self_is_zero(lat in -90.0..=90.0_f64, lon in -180.0..=180.0_f64) {
            let a = coord(lat, lon);
            prop_assert_eq!(distance_meters(&a, &a), 0.0);
        }

        #[test]
        fn distance_is_symmetric_and_non_negative(
            lat1 in -90.0..=90.0_f64,
            lon1 in -180.0..=180.0_f64,
            lat2 in -90.0..=90.0_f64,
            lon2 in -180.0..=180.0_f64,
        ) {
            let a = coord(lat1, lon1);
            let b = coord(lat2, lon2);
            let ab = distance_meters(&a, &b);
            let ba = distance_meters(&b, &a);
            prop_assert!(ab >= 0.0);
            prop_assert!((ab - ba).abs() < 1e-6, "ab={} ba={}", ab, ba);
        }
    }
}
