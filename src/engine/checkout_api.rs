use super::Engine;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::{
    api::{BookingAPI, CheckoutAPI},
    auth::User,
    entities::{
        to_minor_units, BookingMetadata, CheckoutOrder, FinalizationResult, PaymentSession,
        PaymentStatus, SessionHandle, CURRENCY,
    },
    error::{invalid_input_error, Error},
    external::stripe::verify_webhook,
};

/// The same booking submitted twice maps to the same checkout session.
fn idempotency_key(metadata: &HashMap<String, String>, amount_minor: i64) -> String {
    let mut fields: Vec<_> = metadata.iter().collect();
    fields.sort();

    let mut hasher = Sha256::new();
    hasher.update(amount_minor.to_string().as_bytes());
    for (key, value) in fields {
        hasher.update(b"\0");
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }

    hex::encode(hasher.finalize())
}

fn return_base(origin: Option<String>, fallback: &str) -> String {
    origin
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| origin.starts_with("https://") || origin.starts_with("http://"))
        .unwrap_or_else(|| fallback.trim_end_matches('/').to_string())
}

impl Engine {
    async fn finalize_session(&self, session: PaymentSession) -> Result<FinalizationResult, Error> {
        if !session.is_paid() {
            tracing::info!("session {} is not paid yet", session.id);
            return Ok(FinalizationResult::Ignored);
        }

        let booking = BookingMetadata::from_metadata(&session.metadata)?;

        self.finalize(booking, session.payment_ref()).await
    }
}

#[async_trait]
impl CheckoutAPI for Engine {
    #[tracing::instrument(skip(self, booking))]
    async fn create_session(
        &self,
        booking: BookingMetadata,
        origin: Option<String>,
    ) -> Result<SessionHandle, Error> {
        let metadata = booking.to_metadata()?;

        let amount_minor = to_minor_units(booking.price_amount)
            .filter(|amount| *amount > 0)
            .ok_or_else(|| invalid_input_error("price is out of range"))?;

        let base = return_base(origin, &self.config.stripe.public_base_url);

        let order = CheckoutOrder {
            amount_minor,
            currency: CURRENCY.into(),
            customer_email: booking.email.clone(),
            product_name: format!(
                "Course VTC : {} → {}",
                booking.pickup_address, booking.dropoff_address
            ),
            product_description: format!(
                "Prise en charge le {}",
                booking.booking_local_time.format("%d/%m/%Y à %H:%M")
            ),
            idempotency_key: idempotency_key(&metadata, amount_minor),
            metadata,
            success_url: format!("{}/confirmation?payment=success", base),
            cancel_url: format!("{}/", base),
        };

        self.bounded(self.payments.create_checkout_session(&order))
            .await
    }

    #[tracing::instrument(skip_all)]
    async fn handle_webhook(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<FinalizationResult, Error> {
        let stripe = &self.config.stripe;
        let event = verify_webhook(
            payload,
            signature,
            &stripe.webhook_secret,
            stripe.webhook_tolerance,
            Utc::now(),
        )?;

        if !event.kind.finalizes_booking() {
            tracing::info!("ignoring event {} of kind {:?}", event.id, event.kind);
            return Ok(FinalizationResult::Ignored);
        }

        let session = event
            .session
            .ok_or_else(|| invalid_input_error("event carries no checkout session"))?;

        tracing::info!("event {} completes session {}", event.id, session.id);

        self.finalize_session(session).await
    }

    #[tracing::instrument(skip(self))]
    async fn replay_session(
        &self,
        user: User,
        session_id: &str,
    ) -> Result<FinalizationResult, Error> {
        let requested = PaymentSession {
            id: session_id.into(),
            status: None,
            payment_status: PaymentStatus::Unpaid,
            amount_paid_minor: None,
            metadata: HashMap::new(),
        };
        self.authorize(user, "replay", requested)?;

        let session = self
            .bounded(self.payments.retrieve_session(session_id))
            .await?;

        self.finalize_session(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_key_ignores_map_order() {
        let mut first = HashMap::new();
        first.insert("name".to_string(), "Camille".to_string());
        first.insert("price".to_string(), "34.10".to_string());

        let mut second = HashMap::new();
        second.insert("price".to_string(), "34.10".to_string());
        second.insert("name".to_string(), "Camille".to_string());

        assert_eq!(idempotency_key(&first, 3410), idempotency_key(&second, 3410));
        assert_ne!(idempotency_key(&first, 3410), idempotency_key(&first, 3411));
    }

    #[test]
    fn return_base_prefers_web_origin() {
        assert_eq!(
            return_base(Some("https://www.chauffeur-alpes.fr/".into()), "https://fallback.test"),
            "https://www.chauffeur-alpes.fr"
        );
        assert_eq!(
            return_base(Some("null".into()), "https://fallback.test/"),
            "https://fallback.test"
        );
        assert_eq!(return_base(None, "https://fallback.test"), "https://fallback.test");
    }
}
