use axum::extract::rejection::JsonRejection;
use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;
use std::fmt::{self, Debug, Display};

use crate::entities::Endpoint;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

const ENV_VAR: i32 = 1;
const DATABASE: i32 = 2;
const UPSTREAM_UNAVAILABLE: i32 = 3;
const UPSTREAM_TIMEOUT: i32 = 4;
const CALENDAR_WRITE_FAILED: i32 = 5;
const EMAIL_SEND_FAILED: i32 = 6;
const TRIP_LOG_FAILED: i32 = 7;
const FINALIZATION_IN_PROGRESS: i32 = 8;
const UNEXPECTED: i32 = 9;

const INVALID_INPUT: i32 = 100;
const OUT_OF_SERVICE_AREA: i32 = 101;
const ROUTE_NOT_FOUND: i32 = 102;
const ADDRESS_NOT_FOUND: i32 = 103;
const NONEXISTENT_LOCAL_TIME: i32 = 104;
const AMBIGUOUS_LOCAL_TIME: i32 = 105;
const INVALID_SIGNATURE: i32 = 106;
const UNAUTHORIZED: i32 = 107;

impl Error {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_invalid_input_error(&self) -> bool {
        self.code == INVALID_INPUT
    }

    pub fn is_out_of_service_area_error(&self) -> bool {
        self.code == OUT_OF_SERVICE_AREA
    }

    pub fn is_route_not_found_error(&self) -> bool {
        self.code == ROUTE_NOT_FOUND
    }

    pub fn is_address_not_found_error(&self) -> bool {
        self.code == ADDRESS_NOT_FOUND
    }

    pub fn is_nonexistent_local_time_error(&self) -> bool {
        self.code == NONEXISTENT_LOCAL_TIME
    }

    pub fn is_ambiguous_local_time_error(&self) -> bool {
        self.code == AMBIGUOUS_LOCAL_TIME
    }

    pub fn is_invalid_signature_error(&self) -> bool {
        self.code == INVALID_SIGNATURE
    }

    pub fn is_unauthorized_error(&self) -> bool {
        self.code == UNAUTHORIZED
    }

    pub fn is_upstream_unavailable_error(&self) -> bool {
        self.code == UPSTREAM_UNAVAILABLE
    }

    pub fn is_upstream_timeout_error(&self) -> bool {
        self.code == UPSTREAM_TIMEOUT
    }

    pub fn is_calendar_write_failed_error(&self) -> bool {
        self.code == CALENDAR_WRITE_FAILED
    }

    pub fn is_email_send_failed_error(&self) -> bool {
        self.code == EMAIL_SEND_FAILED
    }

    pub fn is_finalization_in_progress_error(&self) -> bool {
        self.code == FINALIZATION_IN_PROGRESS
    }

    /// Server-side failures; the caller may retry the same request.
    pub fn is_internal(&self) -> bool {
        (1..=99).contains(&self.code)
    }

    pub fn status(&self) -> StatusCode {
        match self.code {
            UPSTREAM_TIMEOUT => StatusCode::BAD_GATEWAY,
            1..=99 => StatusCode::INTERNAL_SERVER_ERROR,
            UNAUTHORIZED => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

pub fn env_var_error(detail: impl Display) -> Error {
    Error::new(ENV_VAR, format!("environment variable error: {}", detail))
}

pub fn configuration_error(name: &str) -> Error {
    Error::new(ENV_VAR, format!("invalid configuration value: {}", name))
}

pub fn database_error<T: Debug>(err: T) -> Error {
    tracing::error!("database error: {:?}", err);
    Error::new(DATABASE, "database error")
}

pub fn upstream_unavailable_error(detail: impl Display) -> Error {
    Error::new(UPSTREAM_UNAVAILABLE, format!("upstream unavailable: {}", detail))
}

pub fn upstream_timeout_error() -> Error {
    Error::new(UPSTREAM_TIMEOUT, "upstream timeout")
}

pub fn calendar_write_failed_error(detail: impl Display) -> Error {
    Error::new(
        CALENDAR_WRITE_FAILED,
        format!("calendar write failed: {}", detail),
    )
}

pub fn email_send_failed_error(detail: impl Display) -> Error {
    Error::new(EMAIL_SEND_FAILED, format!("email send failed: {}", detail))
}

pub fn trip_log_failed_error(detail: impl Display) -> Error {
    Error::new(TRIP_LOG_FAILED, format!("trip log failed: {}", detail))
}

pub fn finalization_in_progress_error() -> Error {
    Error::new(
        FINALIZATION_IN_PROGRESS,
        "finalization already in progress for this session",
    )
}

pub fn unexpected_error(detail: impl Display) -> Error {
    Error::new(UNEXPECTED, format!("unexpected error: {}", detail))
}

pub fn invalid_input_error(detail: impl Display) -> Error {
    Error::new(INVALID_INPUT, format!("invalid input: {}", detail))
}

pub fn out_of_service_area_error(which: Endpoint) -> Error {
    Error::new(
        OUT_OF_SERVICE_AREA,
        format!("the {} address is outside of our service area", which),
    )
}

pub fn route_not_found_error() -> Error {
    Error::new(ROUTE_NOT_FOUND, "no driving route between these addresses")
}

pub fn address_not_found_error(which: Endpoint) -> Error {
    Error::new(
        ADDRESS_NOT_FOUND,
        format!("the {} address could not be found", which),
    )
}

pub fn nonexistent_local_time_error(civil: impl Display) -> Error {
    Error::new(
        NONEXISTENT_LOCAL_TIME,
        format!("{} does not exist in the business time zone", civil),
    )
}

pub fn ambiguous_local_time_error(civil: impl Display) -> Error {
    Error::new(
        AMBIGUOUS_LOCAL_TIME,
        format!("{} occurs twice in the business time zone", civil),
    )
}

pub fn invalid_signature_error() -> Error {
    Error::new(INVALID_SIGNATURE, "invalid webhook signature")
}

pub fn unauthorized_error() -> Error {
    Error::new(UNAUTHORIZED, "unauthorized")
}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return upstream_timeout_error();
        }

        upstream_unavailable_error(err)
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        upstream_timeout_error()
    }
}

impl From<oso::OsoError> for Error {
    fn from(err: oso::OsoError) -> Self {
        unexpected_error(err)
    }
}

impl From<JsonRejection> for Error {
    fn from(err: JsonRejection) -> Self {
        invalid_input_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match status {
            StatusCode::BAD_GATEWAY => "Upstream Timeout",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => self.message.as_str(),
        };

        if self.is_internal() {
            tracing::error!("request failed: {}", self);
        }

        let body = Json(json!({
            "code": self.code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[test]
fn status_mapping_test() {
    assert_eq!(
        invalid_input_error("x").status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        out_of_service_area_error(Endpoint::Pickup).status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        invalid_signature_error().status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        unauthorized_error().status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        upstream_timeout_error().status(),
        StatusCode::BAD_GATEWAY
    );
    assert_eq!(
        calendar_write_failed_error("x").status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        email_send_failed_error("x").status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn out_of_service_area_names_endpoint_test() {
    let err = out_of_service_area_error(Endpoint::Dropoff);

    assert!(err.is_out_of_service_area_error());
    assert!(err.message.contains("dropoff"));
}

#[test]
fn missing_variable_is_configuration_failure_test() {
    let err = Error::from(env::VarError::NotPresent);

    assert_eq!(err.code, ENV_VAR);
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
