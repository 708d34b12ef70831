//! In-process stand-ins for the upstream services.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    config::Config,
    db::MemoryStore,
    engine::{Collaborators, Engine},
    entities::{
        CalendarEvent, CheckoutOrder, Coordinates, EmailMessage, PaymentSession, RouteLeg,
        SessionHandle, TripLogRow,
    },
    error::{
        calendar_write_failed_error,
        email_send_failed_error,
        invalid_input_error,
        trip_log_failed_error,
        upstream_unavailable_error,
        Error,
    },
    external::{Calendar, Mailer, Maps, PaymentGateway, TripLedger},
};

pub const GRENOBLE_STATION: &str = "Gare de Grenoble";
pub const MEYLAN: &str = "Meylan";
pub const LYON: &str = "Lyon";
pub const PARIS: &str = "Paris";
pub const HOME: &str = "Sinard";

pub fn leg(distance_meters: u64, duration_seconds: u64) -> RouteLeg {
    RouteLeg {
        distance_meters,
        duration_seconds,
        distance_text: format!("{:.1} km", distance_meters as f64 / 1000.0),
        duration_text: format!("{} min", duration_seconds / 60),
    }
}

pub struct FakeMaps {
    places: HashMap<String, Coordinates>,
    routes: Mutex<HashMap<(String, String), RouteLeg>>,
    pub unroutable: Mutex<HashSet<(String, String)>>,
    pub down: AtomicBool,
    pub directions_calls: AtomicUsize,
}

impl FakeMaps {
    pub fn new() -> Self {
        let places = [
            (GRENOBLE_STATION, Coordinates::new(45.1915, 5.7146)),
            (MEYLAN, Coordinates::new(45.2096, 5.7803)),
            (LYON, Coordinates::new(45.7640, 4.8357)),
            (PARIS, Coordinates::new(48.8566, 2.3522)),
            (HOME, Coordinates::new(44.9469, 5.6556)),
        ]
        .into_iter()
        .map(|(name, at)| (name.to_string(), at))
        .collect();

        let maps = Self {
            places,
            routes: Mutex::new(HashMap::new()),
            unroutable: Mutex::new(HashSet::new()),
            down: AtomicBool::new(false),
            directions_calls: AtomicUsize::new(0),
        };

        maps.set_route(GRENOBLE_STATION, MEYLAN, leg(12_000, 1_200));
        maps.set_route(MEYLAN, HOME, leg(30_200, 1_800));

        maps
    }

    pub fn set_route(&self, origin: &str, destination: &str, route: RouteLeg) {
        self.routes
            .lock()
            .unwrap()
            .insert((origin.into(), destination.into()), route);
    }

    pub fn block_route(&self, origin: &str, destination: &str) {
        self.unroutable
            .lock()
            .unwrap()
            .insert((origin.into(), destination.into()));
    }
}

#[async_trait]
impl Maps for FakeMaps {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, Error> {
        if self.down.load(Ordering::SeqCst) {
            return Err(upstream_unavailable_error("OVER_QUERY_LIMIT"));
        }

        Ok(self.places.get(address).copied())
    }

    async fn directions(
        &self,
        origin: &str,
        destination: &str,
        _with_traffic: bool,
    ) -> Result<Option<RouteLeg>, Error> {
        self.directions_calls.fetch_add(1, Ordering::SeqCst);

        if self.down.load(Ordering::SeqCst) {
            return Err(upstream_unavailable_error("OVER_QUERY_LIMIT"));
        }

        let key = (origin.to_string(), destination.to_string());

        if self.unroutable.lock().unwrap().contains(&key) {
            return Ok(None);
        }

        if let Some(route) = self.routes.lock().unwrap().get(&key) {
            return Ok(Some(route.clone()));
        }

        if self.places.contains_key(origin) && self.places.contains_key(destination) {
            return Ok(Some(leg(25_000, 1_800)));
        }

        Ok(None)
    }
}

#[derive(Default)]
pub struct FakePayments {
    pub sessions: Mutex<HashMap<String, PaymentSession>>,
    pub orders: Mutex<Vec<CheckoutOrder>>,
}

#[async_trait]
impl PaymentGateway for FakePayments {
    async fn create_checkout_session(&self, order: &CheckoutOrder) -> Result<SessionHandle, Error> {
        let mut orders = self.orders.lock().unwrap();
        orders.push(order.clone());

        let session_id = format!("cs_test_{}", orders.len());

        Ok(SessionHandle {
            url: Some(format!("https://checkout.test/{}", session_id)),
            session_id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<PaymentSession, Error> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| invalid_input_error("unknown payment session"))
    }
}

/// Behaves like a calendar that rejects a second insert of the same id.
#[derive(Default)]
pub struct FakeCalendar {
    pub events: Mutex<Vec<CalendarEvent>>,
    pub fail: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
}

#[async_trait]
impl Calendar for FakeCalendar {
    async fn insert_event(&self, event: &CalendarEvent) -> Result<String, Error> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(calendar_write_failed_error("503 backend error"));
        }

        let mut events = self.events.lock().unwrap();

        if let Some(id) = &event.id {
            if events.iter().any(|stored| stored.id.as_ref() == Some(id)) {
                return Ok(id.clone());
            }
        }

        events.push(event.clone());

        Ok(event
            .id
            .clone()
            .unwrap_or_else(|| format!("evt_{}", events.len())))
    }
}

#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(email_send_failed_error("421 service not available"));
        }

        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeLedger {
    pub rows: Mutex<Vec<TripLogRow>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl TripLedger for FakeLedger {
    async fn append(&self, row: &TripLogRow) -> Result<(), Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(trip_log_failed_error("quota exceeded"));
        }

        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }
}

/// Fakes wired into an engine, kept around so tests can inspect them.
pub struct Harness {
    pub maps: Arc<FakeMaps>,
    pub payments: Arc<FakePayments>,
    pub calendar: Arc<FakeCalendar>,
    pub mailer: Arc<FakeMailer>,
    pub ledger: Arc<FakeLedger>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            maps: Arc::new(FakeMaps::new()),
            payments: Arc::new(FakePayments::default()),
            calendar: Arc::new(FakeCalendar::default()),
            mailer: Arc::new(FakeMailer::default()),
            ledger: Arc::new(FakeLedger::default()),
            store: Arc::new(MemoryStore::new()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            maps: self.maps.clone(),
            payments: self.payments.clone(),
            calendar: self.calendar.clone(),
            mailer: self.mailer.clone(),
            ledger: self.ledger.clone(),
            locations: self.store.clone(),
            finalizations: self.store.clone(),
        }
    }

    pub fn engine(&self) -> Engine {
        self.engine_with(Config::for_tests())
    }

    pub fn engine_with(&self, config: Config) -> Engine {
        Engine::new(config, self.collaborators()).unwrap()
    }

    pub fn event_count(&self) -> usize {
        self.calendar.events.lock().unwrap().len()
    }

    pub fn email_count(&self) -> usize {
        self.mailer.sent.lock().unwrap().len()
    }

    pub fn row_count(&self) -> usize {
        self.ledger.rows.lock().unwrap().len()
    }
}
