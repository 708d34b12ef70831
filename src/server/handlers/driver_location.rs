use axum::extract::{rejection::JsonRejection, Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::{DriverLocationAPI, DynAPI};
use crate::entities::DriverLocation;
use crate::error::Error;
use crate::server::CurrentUser;

#[derive(Serialize, Deserialize)]
pub struct UpdateParams {
    lat: f64,
    lng: f64,
}

#[derive(Serialize, Deserialize)]
pub struct UpdateResponse {
    location: DriverLocation,
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<DriverLocation>, Error> {
    let location = api.find_driver_location(user).await?;

    Ok(location.into())
}

pub async fn update(
    Extension(api): Extension<DynAPI>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<UpdateParams>, JsonRejection>,
) -> Result<Json<UpdateResponse>, Error> {
    let Json(params) = payload?;

    let location = api
        .update_driver_location(user, params.lat, params.lng)
        .await?;

    Ok(Json(UpdateResponse { location }))
}
