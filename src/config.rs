use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use dotenv::dotenv;
use rust_decimal::Decimal;

use crate::civil_time::{parse_zone, Disambiguation};
use crate::entities::{Coordinates, Tariff};
use crate::error::{configuration_error, env_var_error, Error};

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub database_url: Option<String>,
    pub upstream_timeout: Duration,
    pub finalization_lease: Duration,
    pub booking: BookingPolicy,
    pub company: CompanyProfile,
    pub driver_api_secret: String,
    pub google: GoogleConfig,
    pub stripe: StripeConfig,
    pub smtp: SmtpConfig,
}

/// Service area, tariff and scheduling rules.
#[derive(Clone, Debug)]
pub struct BookingPolicy {
    pub service_center: Coordinates,
    pub service_radius_meters: f64,
    pub check_dropoff_zone: bool,
    pub enforce_zone_on_direct_booking: bool,
    pub tariff: Tariff,
    pub time_zone: Tz,
    pub ambiguous_local_time: Disambiguation,
    pub default_ride_seconds: i64,
    pub home_address: String,
}

#[derive(Clone, Debug)]
pub struct CompanyProfile {
    pub name: String,
    pub contact: String,
    pub driver_name: String,
    pub vtc_register_number: String,
    pub email_sender: String,
    pub email_receiver: String,
}

#[derive(Clone, Debug)]
pub struct GoogleConfig {
    pub maps_api_base: String,
    pub maps_api_key: String,
    pub client_email: String,
    pub private_key: String,
    pub calendar_id: String,
    pub sheet_id: String,
    pub sheet_name: String,
}

#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub api_base: String,
    pub secret_key: String,
    pub webhook_secret: String,
    pub webhook_tolerance: Duration,
    pub public_base_url: String,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

fn required(name: &str) -> Result<String, Error> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| env_var_error(name))
}

fn or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(name: &str, default: &str) -> Result<T, Error> {
    or_default(name, default)
        .trim()
        .parse()
        .map_err(|_| configuration_error(name))
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let tariff = Tariff {
            base: parsed::<Decimal>("PRICE_BASE", "4.50")?,
            per_km: parsed::<Decimal>("PRICE_PER_KM", "1.55")?,
            per_minute: parsed::<Decimal>("PRICE_PER_MINUTE", "0.55")?,
            minimum: parsed::<Decimal>("PRICE_MINIMUM", "14.00")?,
        };

        let time_zone = parse_zone(&or_default("BUSINESS_TIME_ZONE", "Europe/Paris"))
            .map_err(|_| configuration_error("BUSINESS_TIME_ZONE"))?;

        let booking = BookingPolicy {
            service_center: Coordinates::new(
                parsed("SERVICE_CENTER_LAT", "45.188529")?,
                parsed("SERVICE_CENTER_LNG", "5.724524")?,
            ),
            service_radius_meters: parsed("SERVICE_RADIUS_METERS", "110000")?,
            check_dropoff_zone: parsed("CHECK_DROPOFF_ZONE", "true")?,
            enforce_zone_on_direct_booking: parsed("ENFORCE_ZONE_ON_DIRECT_BOOKING", "false")?,
            tariff,
            time_zone,
            ambiguous_local_time: parsed("AMBIGUOUS_LOCAL_TIME", "earliest")?,
            default_ride_seconds: parsed("DEFAULT_RIDE_SECONDS", "3600")?,
            home_address: required("HOME_ADDRESS")?,
        };

        let company_name = required("COMPANY_NAME")?;
        let email_user = required("EMAIL_USER")?;

        let company = CompanyProfile {
            email_sender: format!("{} <{}>", company_name, email_user),
            name: company_name,
            contact: or_default("COMPANY_CONTACT", ""),
            driver_name: or_default("DRIVER_NAME", ""),
            vtc_register_number: or_default("VTC_REGISTER_NUMBER", ""),
            email_receiver: required("EMAIL_RECEIVER")?,
        };

        let google = GoogleConfig {
            maps_api_base: or_default("GOOGLE_MAPS_API_BASE", "maps.googleapis.com"),
            maps_api_key: required("GOOGLE_MAPS_API_KEY")?,
            client_email: required("GOOGLE_CLIENT_EMAIL")?,
            // keys pasted into .env files keep their newlines escaped
            private_key: required("GOOGLE_PRIVATE_KEY")?.replace("\\n", "\n"),
            calendar_id: required("GOOGLE_CALENDAR_ID")?,
            sheet_id: required("GOOGLE_SHEET_ID")?,
            sheet_name: or_default("GOOGLE_SHEET_NAME", "Feuille 1"),
        };

        let stripe = StripeConfig {
            api_base: or_default("STRIPE_API_BASE", "api.stripe.com"),
            secret_key: required("STRIPE_SECRET_KEY")?,
            webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            webhook_tolerance: Duration::from_secs(parsed("STRIPE_WEBHOOK_TOLERANCE_SECS", "300")?),
            public_base_url: required("PUBLIC_BASE_URL")?,
        };

        let smtp = SmtpConfig {
            host: required("EMAIL_HOST")?,
            port: parsed("EMAIL_PORT", "465")?,
            username: email_user,
            password: required("EMAIL_PASSWORD")?,
        };

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            listen_addr: parsed("LISTEN_ADDR", "127.0.0.1:3000")?,
            log_level: or_default("LOG_LEVEL", "info"),
            database_url,
            upstream_timeout: Duration::from_secs(parsed("UPSTREAM_TIMEOUT_SECS", "10")?),
            finalization_lease: Duration::from_secs(parsed("FINALIZATION_LEASE_SECS", "300")?),
            booking,
            company,
            driver_api_secret: required("DRIVER_API_SECRET")?,
            google,
            stripe,
            smtp,
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "debug".into(),
            database_url: None,
            upstream_timeout: Duration::from_millis(200),
            finalization_lease: Duration::from_secs(300),
            booking: BookingPolicy {
                service_center: Coordinates::new(45.188529, 5.724524),
                service_radius_meters: 110_000.0,
                check_dropoff_zone: true,
                enforce_zone_on_direct_booking: false,
                tariff: Tariff {
                    base: Decimal::new(450, 2),
                    per_km: Decimal::new(155, 2),
                    per_minute: Decimal::new(55, 2),
                    minimum: Decimal::new(1400, 2),
                },
                time_zone: chrono_tz::Europe::Paris,
                ambiguous_local_time: Disambiguation::Earliest,
                default_ride_seconds: 3600,
                home_address: "Sinard".into(),
            },
            company: CompanyProfile {
                name: "Chauffeur Alpes".into(),
                contact: "contact@chauffeur-alpes.test".into(),
                driver_name: "Sandrine".into(),
                vtc_register_number: "EVTC038000000".into(),
                email_sender: "Chauffeur Alpes <reservations@chauffeur-alpes.test>".into(),
                email_receiver: "bureau@chauffeur-alpes.test".into(),
            },
            driver_api_secret: "driver-secret".into(),
            google: GoogleConfig {
                maps_api_base: "maps.googleapis.test".into(),
                maps_api_key: "maps-key".into(),
                client_email: "calendar@project.iam.gserviceaccount.test".into(),
                private_key: String::new(),
                calendar_id: "primary".into(),
                sheet_id: "sheet".into(),
                sheet_name: "Feuille 1".into(),
            },
            stripe: StripeConfig {
                api_base: "api.stripe.test".into(),
                secret_key: "sk_test".into(),
                webhook_secret: "whsec_test".into(),
                webhook_tolerance: Duration::from_secs(300),
                public_base_url: "https://chauffeur-alpes.test".into(),
            },
            smtp: SmtpConfig {
                host: "smtp.chauffeur-alpes.test".into(),
                port: 465,
                username: "reservations@chauffeur-alpes.test".into(),
                password: "password".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_falls_back_to_default() {
        let radius: f64 = parsed("CALECHE_TEST_UNSET_RADIUS", "110000").unwrap();

        assert_eq!(radius, 110_000.0);
    }

    #[test]
    fn unparsable_value_names_the_variable() {
        env::set_var("CALECHE_TEST_BAD_PORT", "smtp");

        let err = parsed::<u16>("CALECHE_TEST_BAD_PORT", "465").unwrap_err();

        assert!(err.message.contains("CALECHE_TEST_BAD_PORT"));
    }

    #[test]
    fn blank_secret_counts_as_missing() {
        env::set_var("CALECHE_TEST_BLANK_SECRET", "  ");

        assert!(required("CALECHE_TEST_BLANK_SECRET").is_err());
    }
}
