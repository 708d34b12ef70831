use std::sync::Arc;

use caleche::api::DynAPI;
use caleche::config::Config;
use caleche::db::{FinalizationStore, LocationStore, MemoryStore, PgStore};
use caleche::engine::{Collaborators, Engine};
use caleche::error::{unexpected_error, Error};
use caleche::external::{
    google_auth::{ServiceAccount, CALENDAR_SCOPE, SHEETS_SCOPE},
    google_calendar::GoogleCalendar,
    google_maps::GoogleMaps,
    google_sheets::GoogleSheets,
    smtp::SmtpMailer,
    stripe::StripeGateway,
};
use caleche::server::serve;
use tracing_subscriber::EnvFilter;

async fn stores(
    config: &Config,
) -> Result<(Arc<dyn LocationStore>, Arc<dyn FinalizationStore>), Error> {
    match &config.database_url {
        Some(url) => {
            let store = Arc::new(PgStore::new(url, 5).await?);
            let locations: Arc<dyn LocationStore> = store.clone();
            let finalizations: Arc<dyn FinalizationStore> = store;
            Ok((locations, finalizations))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set, finalization markers will not survive a restart");
            let store = Arc::new(MemoryStore::new());
            let locations: Arc<dyn LocationStore> = store.clone();
            let finalizations: Arc<dyn FinalizationStore> = store;
            Ok((locations, finalizations))
        }
    }
}

async fn run() -> Result<(), Error> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let http = reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .build()
        .map_err(unexpected_error)?;

    let account = Arc::new(ServiceAccount::new(
        http.clone(),
        &config.google,
        &[CALENDAR_SCOPE, SHEETS_SCOPE],
    ));

    let (locations, finalizations) = stores(&config).await?;

    let collaborators = Collaborators {
        maps: Arc::new(GoogleMaps::new(http.clone(), &config.google)),
        payments: Arc::new(StripeGateway::new(http.clone(), &config.stripe)),
        calendar: Arc::new(GoogleCalendar::new(http.clone(), account.clone(), &config.google)),
        mailer: Arc::new(SmtpMailer::new(
            &config.smtp,
            &config.company.email_sender,
            config.upstream_timeout,
        )?),
        ledger: Arc::new(GoogleSheets::new(http, account, &config.google)),
        locations,
        finalizations,
    };

    let addr = config.listen_addr;
    let engine = Engine::new(config, collaborators)?;

    serve(Arc::new(engine) as DynAPI, addr).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("caleche: {}", err);
        std::process::exit(1);
    }
}
