use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub const CURRENCY: &str = "EUR";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RideRequest {
    #[serde(alias = "pickupAddress")]
    pub pickup: String,
    #[serde(alias = "dropoffAddress")]
    pub dropoff: String,
}

/// A single driving leg as reported by the directions provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub distance_meters: u64,
    pub duration_seconds: u64,
    pub distance_text: String,
    pub duration_text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub base: Decimal,
    pub per_km: Decimal,
    pub per_minute: Decimal,
    pub minimum: Decimal,
}

impl Tariff {
    /// `max(base + per_km * km + per_minute * minutes, minimum)`, rounded half-up to cents.
    pub fn fare(&self, distance_meters: u64, duration_seconds: u64) -> Decimal {
        let km = Decimal::from(distance_meters) / Decimal::new(1000, 0);
        let minutes = Decimal::from(duration_seconds) / Decimal::new(60, 0);

        let metered = self.base + self.per_km * km + self.per_minute * minutes;

        round_cents(metered.max(self.minimum))
    }
}

pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Amount in cents, as payment processors expect it.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (round_cents(amount) * Decimal::new(100, 0)).to_i64()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(rename = "price", with = "rust_decimal::serde::float")]
    pub price_amount: Decimal,
    pub currency: String,
    #[serde(rename = "distanceValue")]
    pub distance_meters: u64,
    #[serde(rename = "durationValue")]
    pub duration_seconds: u64,
    pub distance_text: String,
    pub duration_text: String,
}

impl Quote {
    pub fn new(tariff: &Tariff, leg: RouteLeg) -> Self {
        Self {
            price_amount: tariff.fare(leg.distance_meters, leg.duration_seconds),
            currency: CURRENCY.into(),
            distance_meters: leg.distance_meters,
            duration_seconds: leg.duration_seconds,
            distance_text: leg.distance_text,
            duration_text: leg.duration_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn tariff() -> Tariff {
        Tariff {
            base: Decimal::from_str("4.50").unwrap(),
            per_km: Decimal::from_str("1.55").unwrap(),
            per_minute: Decimal::from_str("0.55").unwrap(),
            minimum: Decimal::from_str("14.00").unwrap(),
        }
    }

    #[test]
    fn fare_is_metered_above_minimum() {
        // 4.50 + 1.55 * 12 + 0.55 * 20
        assert_eq!(tariff().fare(12_000, 1_200), Decimal::from_str("34.10").unwrap());
    }

    #[test]
    fn fare_is_floored_at_minimum() {
        assert_eq!(tariff().fare(1_000, 120), Decimal::from_str("14.00").unwrap());
        assert_eq!(tariff().fare(0, 0), Decimal::from_str("14.00").unwrap());
    }

    #[test]
    fn fare_rounds_half_up_to_cents() {
        // 4.50 + 1.55 * 10.001 + 0.55 * 15 = 28.25155
        assert_eq!(tariff().fare(10_001, 900), Decimal::from_str("28.25").unwrap());
        // 4.50 + 1.55 * 10.003 + 0.55 * 15 = 28.25465
        assert_eq!(tariff().fare(10_003, 900), Decimal::from_str("28.25").unwrap());
        // 4.50 + 1.55 * 10.0 + 0.55 * 15.5 = 28.525 exactly
        assert_eq!(tariff().fare(10_000, 930), Decimal::from_str("28.53").unwrap());
    }

    #[test]
    fn fare_matches_formula_within_a_cent() {
        let t = tariff();

        for (meters, seconds) in [(5_432u64, 611u64), (87_000, 4_020), (23_999, 1_799)] {
            let km = meters as f64 / 1000.0;
            let minutes = seconds as f64 / 60.0;
            let expected = (4.5 + 1.55 * km + 0.55 * minutes).max(14.0);
            let fare = t.fare(meters, seconds).to_f64().unwrap();

            assert!((fare - expected).abs() <= 0.01, "{} vs {}", fare, expected);
        }
    }

    #[test]
    fn minor_units_are_cents() {
        assert_eq!(to_minor_units(Decimal::from_str("34.10").unwrap()), Some(3410));
        assert_eq!(to_minor_units(Decimal::from_str("14").unwrap()), Some(1400));
    }

    #[test]
    fn quote_serializes_with_wire_names() {
        let quote = Quote::new(
            &tariff(),
            RouteLeg {
                distance_meters: 12_000,
                duration_seconds: 1_200,
                distance_text: "12,0 km".into(),
                duration_text: "20 min".into(),
            },
        );

        let value = serde_json::to_value(&quote).unwrap();

        assert_eq!(value["price"], serde_json::json!(34.1));
        assert_eq!(value["distanceValue"], serde_json::json!(12_000));
        assert_eq!(value["durationValue"], serde_json::json!(1_200));
        assert_eq!(value["distanceText"], serde_json::json!("12,0 km"));
        assert_eq!(value["currency"], serde_json::json!("EUR"));
    }
}
