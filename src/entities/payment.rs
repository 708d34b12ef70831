use std::collections::HashMap;

use oso::PolarClass;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    #[serde(alias = "completed")]
    Complete,
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

/// Checkout session as owned by the payment processor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, PolarClass)]
pub struct PaymentSession {
    pub id: String,
    pub status: Option<SessionStatus>,
    pub payment_status: PaymentStatus,
    #[serde(rename = "amount_total", default)]
    pub amount_paid_minor: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentSession {
    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status,
            PaymentStatus::Paid | PaymentStatus::NoPaymentRequired
        )
    }

    pub fn payment_ref(&self) -> PaymentRef {
        PaymentRef {
            session_id: self.id.clone(),
            amount_paid_minor: self.amount_paid_minor,
        }
    }
}

/// Identity of the payment that triggered a finalization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRef {
    pub session_id: String,
    pub amount_paid_minor: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    pub session_id: String,
    pub url: Option<String>,
}

/// What we ask the payment processor to charge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutOrder {
    pub amount_minor: i64,
    pub currency: String,
    pub customer_email: String,
    pub product_name: String,
    pub product_description: String,
    pub metadata: HashMap<String, String>,
    pub success_url: String,
    pub cancel_url: String,
    pub idempotency_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    CheckoutSessionCompleted,
    CheckoutSessionAsyncPaymentSucceeded,
    Other(String),
}

impl EventKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "checkout.session.async_payment_succeeded" => {
                Self::CheckoutSessionAsyncPaymentSucceeded
            }
            other => Self::Other(other.into()),
        }
    }

    pub fn finalizes_booking(&self) -> bool {
        matches!(
            self,
            Self::CheckoutSessionCompleted | Self::CheckoutSessionAsyncPaymentSucceeded
        )
    }
}

/// A webhook delivery whose signature has been verified.
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookEvent {
    pub id: String,
    pub kind: EventKind,
    pub session: Option<PaymentSession>,
}

#[test]
fn session_deserializes_from_processor_json() {
    let session: PaymentSession = serde_json::from_value(serde_json::json!({
        "id": "cs_test_123",
        "object": "checkout.session",
        "status": "complete",
        "payment_status": "paid",
        "amount_total": 3410,
        "metadata": { "name": "Camille" }
    }))
    .unwrap();

    assert_eq!(session.status, Some(SessionStatus::Complete));
    assert_eq!(session.amount_paid_minor, Some(3410));
    assert!(session.is_paid());
    assert_eq!(session.payment_ref().session_id, "cs_test_123");
}
