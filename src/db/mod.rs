//! Persistent state: the driver's last position and one idempotency marker
//! per payment session.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::time::Duration;

use async_trait::async_trait;

use crate::entities::{Claim, DriverLocation, FinalizationRecord};
use crate::error::Error;

#[async_trait]
pub trait LocationStore: Send + Sync {
    /// The empty location until the driver has reported once.
    async fn load(&self) -> Result<DriverLocation, Error>;
    async fn save(&self, location: &DriverLocation) -> Result<(), Error>;
}

/// Markers move `pending -> in_progress -> finalized`. A marker left
/// `in_progress` by a crashed worker can be claimed again once its lease
/// has run out.
#[async_trait]
pub trait FinalizationStore: Send + Sync {
    /// Atomically takes the marker for `record.session_id`. On success the
    /// stored record is returned, carrying progress from earlier attempts.
    async fn claim(&self, record: FinalizationRecord, lease: Duration) -> Result<Claim, Error>;

    async fn save_progress(&self, record: &FinalizationRecord) -> Result<(), Error>;

    /// Gives the marker back as `pending` so a later delivery can retry.
    async fn release(&self, session_id: &str) -> Result<(), Error>;

    async fn complete(&self, record: &FinalizationRecord) -> Result<(), Error>;
}

fn lease_length(lease: Duration) -> chrono::Duration {
    chrono::Duration::from_std(lease).unwrap_or_else(|_| chrono::Duration::minutes(5))
}
