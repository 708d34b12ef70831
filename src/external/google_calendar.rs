use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{
    config::GoogleConfig,
    entities::CalendarEvent,
    error::{calendar_write_failed_error, Error},
    external::{google_auth::ServiceAccount, Calendar},
};

const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: String,
    time_zone: String,
}

#[derive(Debug, Serialize)]
struct EventBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    summary: &'a str,
    description: &'a str,
    start: EventTime,
    end: EventTime,
}

#[derive(Debug, Deserialize)]
struct InsertedEvent {
    id: String,
}

pub struct GoogleCalendar {
    http: reqwest::Client,
    account: Arc<ServiceAccount>,
    calendar_id: String,
}

impl GoogleCalendar {
    pub fn new(http: reqwest::Client, account: Arc<ServiceAccount>, config: &GoogleConfig) -> Self {
        Self {
            http,
            account,
            calendar_id: config.calendar_id.clone(),
        }
    }
}

fn event_body(event: &CalendarEvent) -> EventBody<'_> {
    EventBody {
        id: event.id.as_deref(),
        summary: &event.summary,
        description: &event.description,
        start: EventTime {
            date_time: event.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            time_zone: event.time_zone.clone(),
        },
        end: EventTime {
            date_time: event.end.to_rfc3339_opts(SecondsFormat::Secs, true),
            time_zone: event.time_zone.clone(),
        },
    }
}

#[async_trait]
impl Calendar for GoogleCalendar {
    #[tracing::instrument(skip(self, event), fields(id = ?event.id))]
    async fn insert_event(&self, event: &CalendarEvent) -> Result<String, Error> {
        let token = self.account.access_token().await?;

        let res = self
            .http
            .post(format!("{}/calendars/{}/events", CALENDAR_API, self.calendar_id))
            .bearer_auth(token)
            .json(&event_body(event))
            .send()
            .await
            .map_err(calendar_write_failed_error)?;

        match res.status() {
            status if status.is_success() => {
                let inserted: InsertedEvent = res
                    .json()
                    .await
                    .map_err(calendar_write_failed_error)?;
                Ok(inserted.id)
            }
            StatusCode::CONFLICT => match &event.id {
                Some(id) => {
                    tracing::info!("calendar event {} already exists", id);
                    Ok(id.clone())
                }
                None => Err(calendar_write_failed_error("conflict without event id")),
            },
            status => {
                let body = res.text().await.unwrap_or_default();
                Err(calendar_write_failed_error(format!("{} {}", status, body)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    #[test]
    fn body_carries_utc_instants_and_zone() {
        let event = CalendarEvent {
            id: Some("abc123".into()),
            summary: "Course - Camille Martin".into(),
            description: "Prise en charge : Gare de Grenoble".into(),
            start: DateTime::parse_from_rfc3339("2024-07-15T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            end: DateTime::parse_from_rfc3339("2024-07-15T13:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            time_zone: "Europe/Paris".into(),
        };

        let value = serde_json::to_value(event_body(&event)).unwrap();

        assert_eq!(value["id"], "abc123");
        assert_eq!(value["start"]["dateTime"], "2024-07-15T12:00:00Z");
        assert_eq!(value["start"]["timeZone"], "Europe/Paris");
        assert_eq!(value["end"]["dateTime"], "2024-07-15T13:00:00Z");
    }

    #[test]
    fn body_omits_missing_id() {
        let event = CalendarEvent {
            id: None,
            summary: "Course".into(),
            description: String::new(),
            start: Utc::now(),
            end: Utc::now(),
            time_zone: "Europe/Paris".into(),
        };

        let value = serde_json::to_value(event_body(&event)).unwrap();

        assert!(value.get("id").is_none());
    }
}
