use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{lease_length, FinalizationStore, LocationStore};
use crate::entities::{Claim, DriverLocation, FinalizationRecord, MarkerStatus};
use crate::error::Error;

struct Marker {
    status: MarkerStatus,
    lease_until: DateTime<Utc>,
    record: FinalizationRecord,
}

/// Process-local state, used when no database is configured. Nothing
/// survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    location: Mutex<DriverLocation>,
    markers: Mutex<HashMap<String, Marker>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn load(&self) -> Result<DriverLocation, Error> {
        Ok(self.location.lock().await.clone())
    }

    async fn save(&self, location: &DriverLocation) -> Result<(), Error> {
        *self.location.lock().await = location.clone();
        Ok(())
    }
}

#[async_trait]
impl FinalizationStore for MemoryStore {
    async fn claim(&self, record: FinalizationRecord, lease: Duration) -> Result<Claim, Error> {
        let mut markers = self.markers.lock().await;
        let now = Utc::now();
        let lease_until = now + lease_length(lease);

        match markers.get_mut(&record.session_id) {
            None => {
                markers.insert(
                    record.session_id.clone(),
                    Marker {
                        status: MarkerStatus::InProgress,
                        lease_until,
                        record: record.clone(),
                    },
                );
                Ok(Claim::Acquired(record))
            }
            Some(marker) => match marker.status {
                MarkerStatus::Finalized => Ok(Claim::AlreadyFinalized),
                MarkerStatus::InProgress if marker.lease_until > now => Ok(Claim::InProgress),
                _ => {
                    marker.status = MarkerStatus::InProgress;
                    marker.lease_until = lease_until;
                    Ok(Claim::Acquired(marker.record.clone()))
                }
            },
        }
    }

    async fn save_progress(&self, record: &FinalizationRecord) -> Result<(), Error> {
        if let Some(marker) = self.markers.lock().await.get_mut(&record.session_id) {
            marker.record = record.clone();
        }
        Ok(())
    }

    async fn release(&self, session_id: &str) -> Result<(), Error> {
        if let Some(marker) = self.markers.lock().await.get_mut(session_id) {
            if marker.status == MarkerStatus::InProgress {
                marker.status = MarkerStatus::Pending;
            }
        }
        Ok(())
    }

    async fn complete(&self, record: &FinalizationRecord) -> Result<(), Error> {
        if let Some(marker) = self.markers.lock().await.get_mut(&record.session_id) {
            marker.status = MarkerStatus::Finalized;
            marker.record = record.clone();
        }
        Ok(())
    }
}
