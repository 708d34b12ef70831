mod handlers;
mod user;


use std::net::SocketAddr;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};

use crate::api::DynAPI;
use crate::error::{unexpected_error, Error};
use crate::server::handlers::{bookings, checkout, driver_location, quotes, webhooks};

pub use user::CurrentUser;

pub fn router(api: DynAPI) -> Router {
    Router::new()
        .route("/quote", post(quotes::create))
        .route("/checkout-session", post(checkout::create))
        .route("/payment-webhook", post(webhooks::receive))
        .route("/payment-sessions/:id/finalize", post(webhooks::replay))
        .route("/book", post(bookings::create))
        .route(
            "/driver-location",
            get(driver_location::find).post(driver_location::update),
        )
        .layer(Extension(api))
}

pub async fn serve(api: DynAPI, addr: SocketAddr) -> Result<(), Error> {
    let app = router(api);

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .map_err(unexpected_error)
}
