use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDateTime;
use lettre::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::civil_time::{format_civil_date_time, parse_civil_date_time};
use crate::entities::quote::round_cents;
use crate::error::{invalid_input_error, Error};

// limits imposed by the payment processor on session metadata
pub const MAX_METADATA_KEYS: usize = 50;
pub const MAX_METADATA_KEY_LEN: usize = 40;
pub const MAX_METADATA_VALUE_LEN: usize = 500;

pub const MAX_PASSENGERS: u32 = 8;

/// Longest ride a single booking may block in the calendar.
pub const MAX_RIDE_SECONDS: i64 = 24 * 60 * 60;

mod keys {
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const PICKUP: &str = "pickup";
    pub const DROPOFF: &str = "dropoff";
    pub const PASSENGERS: &str = "passengers";
    pub const SPECIAL_REQUESTS: &str = "specialRequests";
    pub const BOOKING_TIME: &str = "bookingTime";
    pub const DURATION: &str = "durationValue";
    pub const DISTANCE: &str = "distanceValue";
    pub const PRICE: &str = "price";
}

/// Everything needed to finalize a booking. Travels through the payment
/// processor as a flat string map, see [`BookingMetadata::to_metadata`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingMetadata {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub passengers: u32,
    pub special_requests: Option<String>,
    pub booking_local_time: NaiveDateTime,
    pub duration_seconds: Option<i64>,
    pub distance_meters: Option<u64>,
    pub price_amount: Decimal,
}

impl BookingMetadata {
    pub fn validate(&self) -> Result<(), Error> {
        for (field, value) in [
            (keys::NAME, &self.name),
            (keys::EMAIL, &self.email),
            (keys::PICKUP, &self.pickup_address),
            (keys::DROPOFF, &self.dropoff_address),
        ] {
            if value.trim().is_empty() {
                return Err(invalid_input_error(format!("{} is required", field)));
            }
        }

        if self.email.trim().parse::<Address>().is_err() {
            return Err(invalid_input_error("email is malformed"));
        }

        if self.passengers == 0 || self.passengers > MAX_PASSENGERS {
            return Err(invalid_input_error(format!(
                "passengers must be between 1 and {}",
                MAX_PASSENGERS
            )));
        }

        if self.price_amount <= Decimal::ZERO {
            return Err(invalid_input_error("price must be positive"));
        }

        if let Some(seconds) = self.duration_seconds {
            if seconds <= 0 {
                return Err(invalid_input_error("duration must be positive"));
            }
            if seconds > MAX_RIDE_SECONDS {
                return Err(invalid_input_error(format!(
                    "duration must not exceed {} seconds",
                    MAX_RIDE_SECONDS
                )));
            }
        }

        Ok(())
    }

    /// Event length, falling back to `default_seconds` when the ride duration
    /// was not carried along.
    pub fn ride_seconds(&self, default_seconds: i64) -> i64 {
        self.duration_seconds
            .filter(|seconds| *seconds > 0)
            .unwrap_or(default_seconds)
    }

    pub fn to_metadata(&self) -> Result<HashMap<String, String>, Error> {
        self.validate()?;

        let mut metadata = HashMap::new();

        metadata.insert(keys::NAME.into(), self.name.trim().into());
        metadata.insert(keys::EMAIL.into(), self.email.trim().into());
        metadata.insert(keys::PHONE.into(), self.phone.trim().into());
        metadata.insert(keys::PICKUP.into(), self.pickup_address.trim().into());
        metadata.insert(keys::DROPOFF.into(), self.dropoff_address.trim().into());
        metadata.insert(keys::PASSENGERS.into(), self.passengers.to_string());
        metadata.insert(
            keys::BOOKING_TIME.into(),
            format_civil_date_time(&self.booking_local_time),
        );
        metadata.insert(keys::PRICE.into(), round_cents(self.price_amount).to_string());

        if let Some(requests) = &self.special_requests {
            metadata.insert(keys::SPECIAL_REQUESTS.into(), requests.trim().into());
        }
        if let Some(seconds) = self.duration_seconds {
            metadata.insert(keys::DURATION.into(), seconds.to_string());
        }
        if let Some(meters) = self.distance_meters {
            metadata.insert(keys::DISTANCE.into(), meters.to_string());
        }

        check_metadata_limits(&metadata)?;

        Ok(metadata)
    }

    /// Parses and re-validates metadata coming back from the payment
    /// processor. Nothing in it is trusted until it passes [`Self::validate`].
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Result<Self, Error> {
        let required = |key: &str| -> Result<String, Error> {
            metadata
                .get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| invalid_input_error(format!("metadata is missing {}", key)))
        };
        let optional = |key: &str| -> Option<String> {
            metadata
                .get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let passengers = match optional(keys::PASSENGERS) {
            Some(value) => value.parse::<u32>().map_err(|_| {
                invalid_input_error(format!("passengers {:?} is not a number", value))
            })?,
            None => 1,
        };

        let price = required(keys::PRICE)?;
        let price_amount = Decimal::from_str(&price)
            .map_err(|_| invalid_input_error(format!("price {:?} is not a number", price)))?;

        // a missing or unreadable duration falls back to the default length,
        // a readable but non-positive one is rejected by validate()
        let duration_seconds = optional(keys::DURATION).and_then(|value| value.parse::<i64>().ok());
        let distance_meters = optional(keys::DISTANCE).and_then(|value| value.parse::<u64>().ok());

        let booking = Self {
            name: required(keys::NAME)?,
            email: required(keys::EMAIL)?,
            phone: optional(keys::PHONE).unwrap_or_default(),
            pickup_address: required(keys::PICKUP)?,
            dropoff_address: required(keys::DROPOFF)?,
            passengers,
            special_requests: optional(keys::SPECIAL_REQUESTS),
            booking_local_time: parse_civil_date_time(&required(keys::BOOKING_TIME)?)?,
            duration_seconds,
            distance_meters,
            price_amount,
        };

        booking.validate()?;

        Ok(booking)
    }
}

fn check_metadata_limits(metadata: &HashMap<String, String>) -> Result<(), Error> {
    if metadata.len() > MAX_METADATA_KEYS {
        return Err(invalid_input_error("too many booking fields"));
    }

    for (key, value) in metadata {
        if key.chars().count() > MAX_METADATA_KEY_LEN
            || value.chars().count() > MAX_METADATA_VALUE_LEN
        {
            return Err(invalid_input_error(format!("{} is too long", key)));
        }
    }

    Ok(())
}

fn default_passengers() -> u32 {
    1
}

/// Booking form as posted by the website, shared by the checkout and
/// pay-on-board endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingParams {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(alias = "pickupAddress")]
    pub pickup: String,
    #[serde(alias = "dropoffAddress")]
    pub dropoff: String,
    #[serde(default = "default_passengers")]
    pub passengers: u32,
    #[serde(default)]
    pub special_requests: Option<String>,
    pub booking_time: String,
    #[serde(default)]
    pub duration_value: Option<i64>,
    #[serde(default)]
    pub distance_value: Option<u64>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl TryFrom<BookingParams> for BookingMetadata {
    type Error = Error;

    fn try_from(params: BookingParams) -> Result<Self, Self::Error> {
        let booking = Self {
            name: params.name.trim().into(),
            email: params.email.trim().into(),
            phone: params.phone.trim().into(),
            pickup_address: params.pickup.trim().into(),
            dropoff_address: params.dropoff.trim().into(),
            passengers: params.passengers,
            special_requests: params
                .special_requests
                .map(|requests| requests.trim().to_string())
                .filter(|requests| !requests.is_empty()),
            booking_local_time: parse_civil_date_time(&params.booking_time)?,
            duration_seconds: params.duration_value,
            distance_meters: params.distance_value,
            price_amount: round_cents(params.price),
        };

        booking.validate()?;

        Ok(booking)
    }
}
