//! Upstream collaborators. The engine only sees these traits; the
//! production clients live in the submodules and are constructed once in
//! `main`.

pub mod google_auth;
pub mod google_calendar;
pub mod google_maps;
pub mod google_sheets;
pub mod smtp;
pub mod stripe;

#[cfg(test)]
pub mod fakes;

use async_trait::async_trait;

use crate::entities::{
    CalendarEvent, CheckoutOrder, Coordinates, EmailMessage, PaymentSession, RouteLeg,
    SessionHandle, TripLogRow,
};
use crate::error::Error;

#[async_trait]
pub trait Maps: Send + Sync {
    /// `Ok(None)` when the address is unknown to the geocoder.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, Error>;

    /// `Ok(None)` when no driving route exists.
    async fn directions(
        &self,
        origin: &str,
        destination: &str,
        with_traffic: bool,
    ) -> Result<Option<RouteLeg>, Error>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, order: &CheckoutOrder) -> Result<SessionHandle, Error>;
    async fn retrieve_session(&self, session_id: &str) -> Result<PaymentSession, Error>;
}

#[async_trait]
pub trait Calendar: Send + Sync {
    /// Returns the id of the stored event. Inserting an event whose id is
    /// already taken succeeds and returns that id.
    async fn insert_event(&self, event: &CalendarEvent) -> Result<String, Error>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), Error>;
}

#[async_trait]
pub trait TripLedger: Send + Sync {
    async fn append(&self, row: &TripLogRow) -> Result<(), Error>;
}
