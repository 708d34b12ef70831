use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::StatusCode;
use serde::Deserialize;
use sha2::Sha256;

use crate::{
    config::StripeConfig,
    entities::{CheckoutOrder, EventKind, PaymentSession, SessionHandle, WebhookEvent},
    error::{invalid_input_error, invalid_signature_error, upstream_unavailable_error, Error},
    external::PaymentGateway,
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct CreatedSession {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

pub struct StripeGateway {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(http: reqwest::Client, config: &StripeConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.clone(),
            secret_key: config.secret_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        let base = if self.api_base.starts_with("http") {
            self.api_base.clone()
        } else {
            format!("https://{}", self.api_base)
        };

        format!("{}/v1/{}", base, path)
    }

    async fn upstream_error(res: reqwest::Response) -> Error {
        let status = res.status();
        let message = res
            .json::<ApiError>()
            .await
            .ok()
            .and_then(|err| err.error.message)
            .unwrap_or_default();

        upstream_unavailable_error(format!("payments answered {} {}", status, message))
    }
}

/// Flattens an order into the bracketed form fields the checkout API takes.
fn checkout_form(order: &CheckoutOrder) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".into(), "card".into()),
        ("customer_email".into(), order.customer_email.clone()),
        ("success_url".into(), order.success_url.clone()),
        ("cancel_url".into(), order.cancel_url.clone()),
        ("line_items[0][quantity]".into(), "1".into()),
        (
            "line_items[0][price_data][currency]".into(),
            order.currency.to_lowercase(),
        ),
        (
            "line_items[0][price_data][unit_amount]".into(),
            order.amount_minor.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".into(),
            order.product_name.clone(),
        ),
        (
            "line_items[0][price_data][product_data][description]".into(),
            order.product_description.clone(),
        ),
    ];

    let mut metadata: Vec<_> = order.metadata.iter().collect();
    metadata.sort();

    for (key, value) in metadata {
        form.push((format!("metadata[{}]", key), value.clone()));
    }

    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[tracing::instrument(skip(self, order), fields(amount = order.amount_minor))]
    async fn create_checkout_session(&self, order: &CheckoutOrder) -> Result<SessionHandle, Error> {
        let res = self
            .http
            .post(self.url("checkout/sessions"))
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", &order.idempotency_key)
            .form(&checkout_form(order))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(Self::upstream_error(res).await);
        }

        let created: CreatedSession = res.json().await?;

        tracing::info!("created checkout session {}", created.id);

        Ok(SessionHandle {
            session_id: created.id,
            url: created.url,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn retrieve_session(&self, session_id: &str) -> Result<PaymentSession, Error> {
        let res = self
            .http
            .get(self.url(&format!("checkout/sessions/{}", session_id)))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        match res.status() {
            status if status.is_success() => Ok(res.json().await?),
            StatusCode::NOT_FOUND => Err(invalid_input_error(format!(
                "unknown payment session {}",
                session_id
            ))),
            _ => Err(Self::upstream_error(res).await),
        }
    }
}

/// Checks a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against
/// the raw request body and decodes the event it carries.
pub fn verify_webhook(
    payload: &str,
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: DateTime<Utc>,
) -> Result<WebhookEvent, Error> {
    let mut timestamp = None;
    let mut signatures = vec![];

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => {
                if let Ok(signature) = hex::decode(value) {
                    signatures.push(signature);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(invalid_signature_error)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| invalid_signature_error())?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());

    let matches = signatures
        .iter()
        .any(|signature| mac.clone().verify_slice(signature).is_ok());

    if !matches {
        return Err(invalid_signature_error());
    }

    let age = (now.timestamp() - timestamp).unsigned_abs();
    if age > tolerance.as_secs() {
        tracing::warn!("webhook signature is {}s old", age);
        return Err(invalid_signature_error());
    }

    let raw: RawEvent = serde_json::from_str(payload)
        .map_err(|err| invalid_input_error(format!("malformed event: {}", err)))?;

    let kind = EventKind::parse(&raw.kind);

    let session = if kind.finalizes_booking() {
        let session: PaymentSession = serde_json::from_value(raw.data.object)
            .map_err(|err| invalid_input_error(format!("malformed session: {}", err)))?;
        Some(session)
    } else {
        serde_json::from_value(raw.data.object).ok()
    };

    Ok(WebhookEvent {
        id: raw.id,
        kind,
        session,
    })
}

/// Builds the header a processor would send for `payload` at `timestamp`.
#[cfg(test)]
pub fn sign_payload(payload: &str, secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());

    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}
