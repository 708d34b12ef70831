use axum::{
    async_trait,
    extract::{FromRequest, RequestParts},
    http::header::AUTHORIZATION,
};

use crate::{
    api::{DynAPI, API},
    auth::User,
    error::{unexpected_error, Error},
};

/// The caller, identified from an optional `Authorization: Bearer` header.
/// Requests without a valid token are served as the anonymous user.
pub struct CurrentUser(pub User);

#[async_trait]
impl<B: Send> FromRequest<B> for CurrentUser {
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let api = req
            .extensions()
            .get::<DynAPI>()
            .cloned()
            .ok_or_else(|| unexpected_error("api extension is not installed"))?;

        let bearer = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim);

        Ok(Self(api.identify(bearer)))
    }
}
