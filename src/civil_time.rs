//! Turns civil (wall-clock, zone-less) timestamps into absolute instants.
//!
//! Every place that needs the instant of a booking goes through
//! [`resolve_naive`] so the calendar entry, the voucher and the trip ledger
//! all agree on the same moment.

use std::str::FromStr;

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{
    ambiguous_local_time_error,
    configuration_error,
    invalid_input_error,
    nonexistent_local_time_error,
    Error,
};

const CIVIL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// What to do with a wall-clock time that occurs twice (autumn fall-back).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disambiguation {
    Earliest,
    Reject,
}

impl FromStr for Disambiguation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "earliest" => Ok(Self::Earliest),
            "reject" => Ok(Self::Reject),
            _ => Err(configuration_error("AMBIGUOUS_LOCAL_TIME")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedInstant {
    pub instant: DateTime<Utc>,
    pub zone: Tz,
}

impl ResolvedInstant {
    pub fn local(&self) -> DateTime<Tz> {
        self.instant.with_timezone(&self.zone)
    }
}

pub fn parse_zone(zone_id: &str) -> Result<Tz, Error> {
    zone_id
        .parse::<Tz>()
        .map_err(|_| invalid_input_error(format!("unknown time zone {}", zone_id)))
}

pub fn parse_civil_date_time(civil: &str) -> Result<NaiveDateTime, Error> {
    let civil = civil.trim();

    CIVIL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(civil, format).ok())
        .ok_or_else(|| {
            invalid_input_error(format!(
                "{:?} is not a civil date-time (expected YYYY-MM-DDTHH:MM without offset)",
                civil
            ))
        })
}

pub fn format_civil_date_time(civil: &NaiveDateTime) -> String {
    if civil.nanosecond() != 0 {
        civil.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    } else if civil.second() != 0 {
        civil.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        civil.format("%Y-%m-%dT%H:%M").to_string()
    }
}

/// Interprets `civil` as wall-clock time in `zone_id`, taking the earlier
/// instant when the time occurs twice.
pub fn resolve_civil_date_time(civil: &str, zone_id: &str) -> Result<ResolvedInstant, Error> {
    let zone = parse_zone(zone_id)?;
    let civil = parse_civil_date_time(civil)?;

    resolve_naive(civil, zone, Disambiguation::Earliest)
}

pub fn resolve_naive(
    civil: NaiveDateTime,
    zone: Tz,
    policy: Disambiguation,
) -> Result<ResolvedInstant, Error> {
    let local = match zone.from_local_datetime(&civil) {
        LocalResult::Single(local) => local,
        LocalResult::Ambiguous(first, second) => match policy {
            Disambiguation::Earliest => {
                if first.with_timezone(&Utc) <= second.with_timezone(&Utc) {
                    first
                } else {
                    second
                }
            }
            Disambiguation::Reject => {
                return Err(ambiguous_local_time_error(format_civil_date_time(
                    &civil,
                )))
            }
        },
        LocalResult::None => {
            return Err(nonexistent_local_time_error(format_civil_date_time(
                &civil,
            )))
        }
    };

    Ok(ResolvedInstant {
        instant: local.with_timezone(&Utc),
        zone,
    })
}
