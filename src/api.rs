use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::User;
use crate::entities::{
    BookingMetadata, DriverLocation, FinalizationResult, PaymentRef, Quote, Receipt,
    RideRequest, SessionHandle,
};
use crate::error::Error;

#[async_trait]
pub trait QuoteAPI {
    async fn get_quote(&self, request: RideRequest) -> Result<Quote, Error>;
}

#[async_trait]
pub trait CheckoutAPI {
    /// Opens a checkout session carrying the booking as metadata. `origin`
    /// is the site the customer is returned to.
    async fn create_session(
        &self,
        booking: BookingMetadata,
        origin: Option<String>,
    ) -> Result<SessionHandle, Error>;

    /// Verifies and applies a payment webhook given its raw body.
    async fn handle_webhook(&self, payload: &str, signature: &str)
        -> Result<FinalizationResult, Error>;

    /// Re-runs finalization for a session from the processor's own record.
    async fn replay_session(&self, user: User, session_id: &str)
        -> Result<FinalizationResult, Error>;
}

#[async_trait]
pub trait BookingAPI {
    async fn finalize(
        &self,
        booking: BookingMetadata,
        payment: PaymentRef,
    ) -> Result<FinalizationResult, Error>;

    /// Books a ride paid on board: no payment session, no idempotency marker.
    async fn book_direct(&self, booking: BookingMetadata) -> Result<Receipt, Error>;
}

#[async_trait]
pub trait DriverLocationAPI {
    async fn find_driver_location(&self, user: User) -> Result<DriverLocation, Error>;

    async fn update_driver_location(
        &self,
        user: User,
        lat: f64,
        lng: f64,
    ) -> Result<DriverLocation, Error>;
}

pub trait API: QuoteAPI + CheckoutAPI + BookingAPI + DriverLocationAPI {
    /// Maps an `Authorization: Bearer` token to a user.
    fn identify(&self, bearer: Option<&str>) -> User;
}

pub type DynAPI = Arc<dyn API + Send + Sync>;
