use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    config::GoogleConfig,
    entities::{Coordinates, RouteLeg},
    error::{upstream_unavailable_error, Error},
    external::Maps,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Place {
    pub formatted_address: String,
    pub geometry: Geometry,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Geometry {
    pub location: Coordinates,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
    pub value: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Leg {
    pub distance: TextValue,
    pub duration: TextValue,
    pub duration_in_traffic: Option<TextValue>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectionsRoute {
    pub legs: Vec<Leg>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response<T> {
    status: String,
    results: Option<T>,
    routes: Option<T>,
    error_message: Option<String>,
}

pub struct GoogleMaps {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl GoogleMaps {
    pub fn new(http: reqwest::Client, config: &GoogleConfig) -> Self {
        Self {
            http,
            api_base: config.maps_api_base.clone(),
            api_key: config.maps_api_key.clone(),
        }
    }

    fn url(&self, service: &str) -> String {
        let base = if self.api_base.starts_with("http") {
            self.api_base.clone()
        } else {
            format!("https://{}", self.api_base)
        };

        format!("{}/maps/api/{}/json", base, service)
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        service: &str,
        query: &[(&str, &str)],
    ) -> Result<Response<T>, Error> {
        let res = self
            .http
            .get(self.url(service))
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status_code = res.status().as_u16();

        if status_code != 200 {
            return Err(upstream_unavailable_error(format!(
                "maps {} answered {}",
                service, status_code
            )));
        }

        Ok(res.json().await?)
    }
}

#[async_trait]
impl Maps for GoogleMaps {
    #[tracing::instrument(skip(self))]
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, Error> {
        let data: Response<Vec<Place>> = self
            .get("geocode", &[("address", address), ("region", "fr")])
            .await?;

        place_from_response(data)
    }

    #[tracing::instrument(skip(self))]
    async fn directions(
        &self,
        origin: &str,
        destination: &str,
        with_traffic: bool,
    ) -> Result<Option<RouteLeg>, Error> {
        let mut query = vec![
            ("origin", origin),
            ("destination", destination),
            ("language", "fr"),
            ("region", "fr"),
        ];

        if with_traffic {
            query.push(("departure_time", "now"));
        }

        let data: Response<Vec<DirectionsRoute>> = self.get("directions", &query).await?;

        leg_from_response(data)
    }
}

fn place_from_response(data: Response<Vec<Place>>) -> Result<Option<Coordinates>, Error> {
    match data.status.as_str() {
        "OK" => Ok(data
            .results
            .and_then(|places| places.into_iter().next())
            .map(|place| place.geometry.location)),
        "ZERO_RESULTS" | "INVALID_REQUEST" => Ok(None),
        _ => Err(upstream_status_error("geocode", data)),
    }
}

fn leg_from_response(data: Response<Vec<DirectionsRoute>>) -> Result<Option<RouteLeg>, Error> {
    match data.status.as_str() {
        "OK" => {
            let leg = data
                .routes
                .and_then(|routes| routes.into_iter().next())
                .and_then(|route| route.legs.into_iter().next());

            Ok(leg.map(|leg| {
                let duration = leg.duration_in_traffic.unwrap_or(leg.duration);

                RouteLeg {
                    distance_meters: leg.distance.value,
                    duration_seconds: duration.value,
                    distance_text: leg.distance.text,
                    duration_text: duration.text,
                }
            }))
        }
        "ZERO_RESULTS" | "NOT_FOUND" => Ok(None),
        _ => Err(upstream_status_error("directions", data)),
    }
}

fn upstream_status_error<T>(service: &str, data: Response<T>) -> Error {
    upstream_unavailable_error(format!(
        "maps {} status {} {}",
        service,
        data.status,
        data.error_message.unwrap_or_default()
    ))
}
