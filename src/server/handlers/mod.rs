pub mod bookings;
pub mod checkout;
pub mod driver_location;
pub mod quotes;
pub mod webhooks;
