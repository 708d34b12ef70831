mod booking;
mod calendar_event;
mod coordinates;
mod driver_location;
mod email;
mod finalization;
mod payment;
mod quote;
mod trip_log;

pub use booking::{BookingMetadata, BookingParams};
pub use calendar_event::CalendarEvent;
pub use coordinates::{Coordinates, Endpoint};
pub use driver_location::DriverLocation;
pub use email::EmailMessage;
pub use finalization::{
    calendar_event_id_for, Claim, FinalizationRecord, FinalizationResult, MarkerStatus, Receipt,
};
pub use payment::{
    CheckoutOrder, EventKind, PaymentRef, PaymentSession, PaymentStatus, SessionHandle,
    SessionStatus, WebhookEvent,
};
pub use quote::{round_cents, to_minor_units, Quote, RideRequest, RouteLeg, Tariff, CURRENCY};
pub use trip_log::TripLogRow;
