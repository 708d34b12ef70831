use axum::extract::{rejection::JsonRejection, Extension, Json};

use crate::api::{BookingAPI, DynAPI};
use crate::entities::{BookingMetadata, BookingParams, Receipt};
use crate::error::Error;

pub async fn create(
    Extension(api): Extension<DynAPI>,
    payload: Result<Json<BookingParams>, JsonRejection>,
) -> Result<Json<Receipt>, Error> {
    let Json(params) = payload?;
    let booking = BookingMetadata::try_from(params)?;

    let receipt = api.book_direct(booking).await?;

    Ok(receipt.into())
}
