use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const REFERENCE_PREFIX: &str = "SC-";

/// Lifecycle of the idempotency marker kept per payment session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStatus {
    Pending,
    InProgress,
    Finalized,
}

impl MarkerStatus {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "pending".into(),
            Self::InProgress => "in_progress".into(),
            Self::Finalized => "finalized".into(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "finalized" => Some(Self::Finalized),
            _ => None,
        }
    }
}

/// Progress of one booking through the finalization steps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizationRecord {
    pub session_id: String,
    pub booking_reference: String,
    pub calendar_event_id: Option<String>,
    pub email_sent: bool,
    pub trip_logged: bool,
}

impl FinalizationRecord {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.into(),
            booking_reference: booking_reference_for(session_id),
            calendar_event_id: None,
            email_sent: false,
            trip_logged: false,
        }
    }

    /// A record for a booking that has no payment session behind it.
    pub fn unpaid() -> Self {
        Self {
            session_id: String::new(),
            booking_reference: random_booking_reference(),
            calendar_event_id: None,
            email_sent: false,
            trip_logged: false,
        }
    }

    pub fn calendar_event_id(&self) -> Option<String> {
        if self.session_id.is_empty() {
            return None;
        }

        Some(calendar_event_id_for(&self.session_id))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Claim {
    Acquired(FinalizationRecord),
    InProgress,
    AlreadyFinalized,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub booking_reference: String,
    pub calendar_event_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub trip_logged: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "receipt", rename_all = "snake_case")]
pub enum FinalizationResult {
    Finalized(Receipt),
    AlreadyFinalized,
    Ignored,
}

pub fn booking_reference_for(session_id: &str) -> String {
    let digest = Sha256::digest(session_id.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);

    format!("{}{:06}", REFERENCE_PREFIX, u64::from_be_bytes(prefix) % 1_000_000)
}

pub fn random_booking_reference() -> String {
    let number: u32 = rand::thread_rng().gen_range(0..1_000_000);

    format!("{}{:06}", REFERENCE_PREFIX, number)
}

/// Calendar ids only allow base32hex characters; lowercase hex is a subset.
pub fn calendar_event_id_for(session_id: &str) -> String {
    hex::encode(Sha256::digest(session_id.as_bytes()))
}
