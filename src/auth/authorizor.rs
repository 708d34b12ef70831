use oso::{Oso, PolarClass};

use crate::auth::User;
use crate::entities::{DriverLocation, PaymentSession};
use crate::error::Error;

pub fn new() -> Result<Oso, Error> {
    let mut o = Oso::new();

    o.register_class(User::get_polar_class())?;
    o.register_class(DriverLocation::get_polar_class())?;
    o.register_class(PaymentSession::get_polar_class())?;

    o.load_str(include_str!("rules.polar"))?;

    Ok(o)
}

#[cfg(test)]
fn session() -> PaymentSession {
    use crate::entities::PaymentStatus;

    PaymentSession {
        id: "cs_test_123".into(),
        status: None,
        payment_status: PaymentStatus::Paid,
        amount_paid_minor: Some(3410),
        metadata: Default::default(),
    }
}

#[test]
fn anyone_reads_driver_location_test() {
    let authorizor = new().unwrap();

    let result = authorizor.is_allowed(User::anonymous(), "read", DriverLocation::empty());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(User::new_driver(), "read", DriverLocation::empty());
    assert_eq!(result.unwrap(), true);
}

#[test]
fn only_driver_updates_location_test() {
    let authorizor = new().unwrap();

    let result = authorizor.is_allowed(User::anonymous(), "update", DriverLocation::empty());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(User::new_driver(), "update", DriverLocation::empty());
    assert_eq!(result.unwrap(), true);
}

#[test]
fn only_driver_replays_sessions_test() {
    let authorizor = new().unwrap();

    let result = authorizor.is_allowed(User::anonymous(), "replay", session());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(User::new_driver(), "replay", session());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(User::new_driver(), "delete", session());
    assert_eq!(result.unwrap(), false);
}
