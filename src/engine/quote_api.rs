use super::{helpers::within_radius, Engine};

use async_trait::async_trait;

use crate::{
    api::QuoteAPI,
    entities::{Coordinates, Endpoint, Quote, RideRequest},
    error::{
        address_not_found_error,
        invalid_input_error,
        out_of_service_area_error,
        route_not_found_error,
        Error,
    },
};

impl Engine {
    /// Geocodes both addresses concurrently and checks them against the
    /// service radius. The dropoff is only checked when `check_dropoff` is set.
    pub(super) async fn check_service_area(
        &self,
        pickup: &str,
        dropoff: &str,
        check_dropoff: bool,
    ) -> Result<(Coordinates, Coordinates), Error> {
        let (pickup_at, dropoff_at) = futures::try_join!(
            self.bounded(self.maps.geocode(pickup)),
            self.bounded(self.maps.geocode(dropoff)),
        )?;

        let pickup_at = pickup_at.ok_or_else(|| address_not_found_error(Endpoint::Pickup))?;
        let dropoff_at =
            dropoff_at.ok_or_else(|| address_not_found_error(Endpoint::Dropoff))?;

        let policy = &self.config.booking;

        if !within_radius(policy.service_center, pickup_at, policy.service_radius_meters) {
            return Err(out_of_service_area_error(Endpoint::Pickup));
        }

        if check_dropoff
            && !within_radius(policy.service_center, dropoff_at, policy.service_radius_meters)
        {
            return Err(out_of_service_area_error(Endpoint::Dropoff));
        }

        Ok((pickup_at, dropoff_at))
    }
}

#[async_trait]
impl QuoteAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn get_quote(&self, request: RideRequest) -> Result<Quote, Error> {
        let pickup = request.pickup.trim();
        let dropoff = request.dropoff.trim();

        if pickup.is_empty() || dropoff.is_empty() {
            return Err(invalid_input_error("pickup and dropoff are required"));
        }

        self.check_service_area(pickup, dropoff, self.config.booking.check_dropoff_zone)
            .await?;

        let leg = self
            .bounded(self.maps.directions(pickup, dropoff, true))
            .await?
            .ok_or_else(route_not_found_error)?;

        let quote = Quote::new(&self.config.booking.tariff, leg);

        tracing::info!(
            "quoted {} EUR for {} m / {} s",
            quote.price_amount,
            quote.distance_meters,
            quote.duration_seconds
        );

        Ok(quote)
    }
}
