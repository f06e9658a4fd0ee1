//! Autorickshaw fare estimation.
//!
//! A `FareTariff` turns a trip (distance plus expected duration) into a
//! `FareEstimate`. Every monetary field is rounded to two decimals half-up;
//! the total is computed from the unrounded parts before rounding.
use serde::{Deserialize, Serialize};

use crate::error::TransitError;
use crate::geo::{Coordinate, distance_km};
use crate::result::Result;

/// Peak-hour multiplier applied to the total fare.
pub const PEAK_SURCHARGE_MULTIPLIER: f64 = 1.25;
/// Loyalty points worth one currency unit.
pub const POINTS_PER_UNIT: f64 = 100.0;
/// Largest share of the total a loyalty discount may remove.
pub const MAX_LOYALTY_DISCOUNT_SHARE: f64 = 0.2;

/// Rounds to two decimals, halves away from zero.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pricing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareTariff {
    /// Flat starting fare.
    pub base_fare: f64,
    /// Price per kilometre.
    pub per_km_rate: f64,
    /// Price per minute of expected travel.
    pub per_minute_rate: f64,
}

impl Default for FareTariff {
    fn default() -> Self {
        Self {
            base_fare: 10.0,
            per_km_rate: 8.0,
            per_minute_rate: 0.5,
        }
    }
}

/// Price breakdown for a single trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareEstimate {
    /// Flat starting fare.
    pub base_fare: f64,
    /// Distance in kilometres times the per-km rate.
    pub distance_fare: f64,
    /// Duration times the per-minute rate.
    pub time_fare: f64,
    /// Amount the rider pays, after any surcharge or discount.
    pub total_fare: f64,
    /// Expected trip duration in minutes.
    #[serde(rename = "estimatedDuration")]
    pub estimated_duration_minutes: f64,
}

impl FareTariff {
    /// Estimates the fare between `pickup` and `drop` for a trip expected to
    /// last `duration_minutes`.
    pub fn estimate_fare(
        &self,
        pickup: &Coordinate,
        drop: &Coordinate,
        duration_minutes: f64,
    ) -> Result<FareEstimate> {
        self.quote(distance_km(pickup, drop), duration_minutes)
    }

    /// Prices a trip of `distance_km` lasting `duration_minutes`.
    pub fn quote(&self, distance_km: f64, duration_minutes: f64) -> Result<FareEstimate> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(TransitError::InvalidDistance(distance_km));
        }
        if !duration_minutes.is_finite() || duration_minutes < 0.0 {
            return Err(TransitError::InvalidDuration(duration_minutes));
        }
        self.validate()?;

        let distance_fare = distance_km * self.per_km_rate;
        let time_fare = duration_minutes * self.per_minute_rate;
        let total_fare = self.base_fare + distance_fare + time_fare;

        Ok(FareEstimate {
            base_fare: round_currency(self.base_fare),
            distance_fare: round_currency(distance_fare),
            time_fare: round_currency(time_fare),
            total_fare: round_currency(total_fare),
            estimated_duration_minutes: duration_minutes,
        })
    }

    fn validate(&self) -> Result<()> {
        let rates = [self.base_fare, self.per_km_rate, self.per_minute_rate];
        if rates.iter().any(|r| !r.is_finite() || *r < 0.0) {
            return Err(TransitError::InvalidFare(format!(
                "tariff rates must be finite and non-negative: {:?}",
                self
            )));
        }
        Ok(())
    }
}

impl FareEstimate {
    /// Adds the 25% peak-hour surcharge to the total; returns `self` unchanged off-peak.
    pub fn apply_peak_surcharge(self, is_peak: bool) -> FareEstimate {
        if !is_peak {
            return self;
        }
        FareEstimate {
            total_fare: round_currency(self.total_fare * PEAK_SURCHARGE_MULTIPLIER),
            ..self
        }
    }

    /// Subtracts `loyalty_points / 100` from the total, capped at 20% of it.
    ///
    /// Fails instead of producing a negative fare when the total itself is
    /// negative or not finite.
    pub fn apply_loyalty_discount(self, loyalty_points: u32) -> Result<FareEstimate> {
        if !self.total_fare.is_finite() || self.total_fare < 0.0 {
            return Err(TransitError::InvalidFare(format!(
                "cannot discount a total of {}",
                self.total_fare
            )));
        }
        let discount = (loyalty_points as f64 / POINTS_PER_UNIT)
            .min(self.total_fare * MAX_LOYALTY_DISCOUNT_SHARE);
        Ok(FareEstimate {
            total_fare: round_currency(self.total_fare - discount),
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hundred() -> FareEstimate {
        let tariff = FareTariff {
            base_fare: 100.0,
            per_km_rate: 0.0,
            per_minute_rate: 0.0,
        };
        tariff.quote(0.0, 0.0).unwrap()
    }

    #[test]
    fn five_km_fifteen_minutes() {
        let fare = FareTariff::default().quote(5.0, 15.0).unwrap();
        assert_eq!(fare.base_fare, 10.0);
        assert_eq!(fare.distance_fare, 40.0);
        assert_eq!(fare.time_fare, 7.5);
        assert_eq!(fare.total_fare, 57.5);
        assert_eq!(fare.estimated_duration_minutes, 15.0);
    }

    #[test]
    fn estimate_from_coordinates_uses_km() {
        let a = Coordinate::new(0.0, 0.0).unwrap();
        let b = Coordinate::new(0.0, 0.01).unwrap();
        // about 1.11 km
        let fare = FareTariff::default().estimate_fare(&a, &b, 0.0).unwrap();
        assert_eq!(fare.distance_fare, 8.9);
        assert_eq!(fare.total_fare, 18.9);
    }

    #[test]
    fn monetary_fields_are_rounded_to_cents() {
        let fare = FareTariff::default().quote(1.23456, 3.337).unwrap();
        assert_eq!(fare.distance_fare, 9.88);
        assert_eq!(fare.time_fare, 1.67);
        // total rounds the unrounded sum 10 + 9.87648 + 1.6685
        assert_eq!(fare.total_fare, 21.54);
    }

    #[test]
    fn rejects_bad_durations_and_distances() {
        let tariff = FareTariff::default();
        assert!(matches!(
            tariff.quote(1.0, -1.0),
            Err(TransitError::InvalidDuration(_))
        ));
        assert!(matches!(
            tariff.quote(1.0, f64::NAN),
            Err(TransitError::InvalidDuration(_))
        ));
        assert!(matches!(
            tariff.quote(f64::NAN, 1.0),
            Err(TransitError::InvalidDistance(_))
        ));
        let broken = FareTariff {
            per_km_rate: -8.0,
            ..FareTariff::default()
        };
        assert!(matches!(broken.quote(1.0, 1.0), Err(TransitError::InvalidFare(_))));
    }

    #[test]
    fn peak_surcharge() {
        assert_eq!(hundred().apply_peak_surcharge(true).total_fare, 125.0);
        assert_eq!(hundred().apply_peak_surcharge(false), hundred());
    }

    #[test]
    fn loyalty_discount_is_capped_at_twenty_percent() {
        let fare = hundred().apply_loyalty_discount(3000).unwrap();
        assert_eq!(fare.total_fare, 80.0);
        let small = hundred().apply_loyalty_discount(550).unwrap();
        assert_eq!(small.total_fare, 94.5);
        assert_eq!(hundred().apply_loyalty_discount(0).unwrap(), hundred());
    }

    #[test]
    fn loyalty_discount_refuses_negative_totals() {
        let negative = FareEstimate {
            total_fare: -5.0,
            ..hundred()
        };
        assert!(matches!(
            negative.apply_loyalty_discount(100),
            Err(TransitError::InvalidFare(_))
        ));
    }

    #[test]
    fn serializes_with_camel_case_names() {
        let json = serde_json::to_value(FareTariff::default().quote(5.0, 15.0).unwrap()).unwrap();
        assert_eq!(json["totalFare"], 57.5);
        assert_eq!(json["estimatedDuration"], 15.0);
    }
}
