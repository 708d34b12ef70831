use axum::extract::{rejection::JsonRejection, Extension, Json};

use crate::api::{DynAPI, QuoteAPI};
use crate::entities::{Quote, RideRequest};
use crate::error::Error;

pub async fn create(
    Extension(api): Extension<DynAPI>,
    payload: Result<Json<RideRequest>, JsonRejection>,
) -> Result<Json<Quote>, Error> {
    let Json(request) = payload?;

    let quote = api.get_quote(request).await?;

    Ok(quote.into())
}
