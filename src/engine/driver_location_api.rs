use super::Engine;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    api::DriverLocationAPI,
    auth::User,
    entities::{Coordinates, DriverLocation},
    error::{invalid_input_error, Error},
};

#[async_trait]
impl DriverLocationAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn find_driver_location(&self, user: User) -> Result<DriverLocation, Error> {
        let location = self.locations.load().await?;

        self.authorize(user, "read", location.clone())?;

        Ok(location)
    }

    #[tracing::instrument(skip(self))]
    async fn update_driver_location(
        &self,
        user: User,
        lat: f64,
        lng: f64,
    ) -> Result<DriverLocation, Error> {
        self.authorize(user, "update", DriverLocation::empty())?;

        let coordinates = Coordinates::new(lat, lng);

        if !coordinates.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
            return Err(invalid_input_error("lat and lng must be valid coordinates"));
        }

        let location = DriverLocation::new(coordinates, Utc::now());
        self.locations.save(&location).await?;

        Ok(location)
    }
}
