use chrono::{DateTime, Utc};
use oso::PolarClass;
use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;

/// Last known position of the driver. All fields stay null until the driver
/// reports for the first time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, PolarClass)]
pub struct DriverLocation {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(rename = "timestamp")]
    pub timestamp_millis: Option<i64>,
}

impl DriverLocation {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(coordinates: Coordinates, at: DateTime<Utc>) -> Self {
        Self {
            lat: Some(coordinates.lat),
            lng: Some(coordinates.lng),
            timestamp_millis: Some(at.timestamp_millis()),
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }
}

#[test]
fn empty_location_serializes_as_nulls() {
    let value = serde_json::to_value(DriverLocation::empty()).unwrap();

    assert_eq!(
        value,
        serde_json::json!({ "lat": null, "lng": null, "timestamp": null })
    );
}
