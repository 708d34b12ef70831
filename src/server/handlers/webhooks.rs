use axum::extract::{Extension, Json, Path};
use axum::http::HeaderMap;
use serde_json::{json, Value};

use crate::api::{CheckoutAPI, DynAPI};
use crate::entities::FinalizationResult;
use crate::error::{invalid_signature_error, Error};
use crate::server::CurrentUser;

const SIGNATURE_HEADER: &str = "stripe-signature";

/// The body is taken as raw text: the signature covers the exact bytes sent.
pub async fn receive(
    Extension(api): Extension<DynAPI>,
    headers: HeaderMap,
    payload: String,
) -> Result<Json<Value>, Error> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(invalid_signature_error)?;

    api.handle_webhook(&payload, signature).await?;

    Ok(Json(json!({ "received": true })))
}

pub async fn replay(
    Extension(api): Extension<DynAPI>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<FinalizationResult>, Error> {
    let result = api.replay_session(user, &id).await?;

    Ok(result.into())
}
