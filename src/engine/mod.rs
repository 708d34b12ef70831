mod booking_api;
mod checkout_api;
mod driver_location_api;
mod helpers;
mod quote_api;
mod voucher;


use std::future::Future;
use std::sync::Arc;

use oso::Oso;
use tera::Tera;

use crate::{
    api::API,
    auth::{authorizor, User},
    config::Config,
    db::{FinalizationStore, LocationStore},
    error::{unauthorized_error, Error},
    external::{Calendar, Mailer, Maps, PaymentGateway, TripLedger},
};

/// Everything the engine talks to outside of its own process.
#[derive(Clone)]
pub struct Collaborators {
    pub maps: Arc<dyn Maps>,
    pub payments: Arc<dyn PaymentGateway>,
    pub calendar: Arc<dyn Calendar>,
    pub mailer: Arc<dyn Mailer>,
    pub ledger: Arc<dyn TripLedger>,
    pub locations: Arc<dyn LocationStore>,
    pub finalizations: Arc<dyn FinalizationStore>,
}

pub struct Engine {
    config: Config,
    maps: Arc<dyn Maps>,
    payments: Arc<dyn PaymentGateway>,
    calendar: Arc<dyn Calendar>,
    mailer: Arc<dyn Mailer>,
    ledger: Arc<dyn TripLedger>,
    locations: Arc<dyn LocationStore>,
    finalizations: Arc<dyn FinalizationStore>,
    templates: Tera,
    authorizor: Oso,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self, Error> {
        Ok(Self {
            config,
            maps: collaborators.maps,
            payments: collaborators.payments,
            calendar: collaborators.calendar,
            mailer: collaborators.mailer,
            ledger: collaborators.ledger,
            locations: collaborators.locations,
            finalizations: collaborators.finalizations,
            templates: voucher::templates()?,
            authorizor: authorizor::new()?,
        })
    }

    pub fn authorize<Actor, Action, Resource>(
        &self,
        actor: Actor,
        action: Action,
        resource: Resource,
    ) -> Result<(), Error>
    where
        Actor: oso::ToPolar,
        Action: oso::ToPolar,
        Resource: oso::ToPolar,
    {
        if self.authorizor.is_allowed(actor, action, resource)? {
            return Ok(());
        }

        Err(unauthorized_error())
    }

    /// Runs an upstream call under the configured timeout.
    async fn bounded<T, F>(&self, call: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        tokio::time::timeout(self.config.upstream_timeout, call).await?
    }
}

impl API for Engine {
    fn identify(&self, bearer: Option<&str>) -> User {
        User::from_bearer(bearer, &self.config.driver_api_secret)
    }
}
