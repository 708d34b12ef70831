use axum::extract::{rejection::JsonRejection, Extension, Json};
use axum::http::{header::ORIGIN, HeaderMap};

use crate::api::{CheckoutAPI, DynAPI};
use crate::entities::{BookingMetadata, BookingParams, SessionHandle};
use crate::error::Error;

pub async fn create(
    Extension(api): Extension<DynAPI>,
    headers: HeaderMap,
    payload: Result<Json<BookingParams>, JsonRejection>,
) -> Result<Json<SessionHandle>, Error> {
    let Json(params) = payload?;
    let booking = BookingMetadata::try_from(params)?;

    let origin = headers
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    let session = api.create_session(booking, origin).await?;

    Ok(session.into())
}
