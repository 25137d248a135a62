use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("serde_json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct GeocodeResult {
    formatted: Option<String>,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

/// Coordinate to address lookup against the OpenCage geocoding API.
#[derive(Clone)]
pub struct ReverseGeocoder {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl ReverseGeocoder {
    pub fn new(client: Client, endpoint: Url, api_key: &str) -> Self {
        Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
        }
    }

    async fn lookup(&self, latitude: f64, longitude: f64) -> Result<Option<String>, Error> {
        // form encoding turns the space into the `+` separator
        let query = format!("{} {}", latitude, longitude);
        let body = self
            .client
            .get(self.endpoint.clone())
            .query(&[("q", query.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await?
            .text()
            .await?;

        let response: GeocodeResponse = serde_json::from_str(&body)?;
        Ok(response
            .results
            .into_iter()
            .next()
            .and_then(|result| result.formatted))
    }

    /// First formatted address for the coordinate, `None` on any failure.
    pub async fn resolve(&self, latitude: f64, longitude: f64) -> Option<String> {
        match self.lookup(latitude, longitude).await {
            Ok(Some(address)) => {
                info!(address = address, "reverse geocoded");
                Some(address)
            }
            Ok(None) => {
                info!(latitude, longitude, "reverse geocoding returned no results");
                None
            }
            Err(e) => {
                warn!(error = %e, "reverse geocoding failed");
                None
            }
        }
    }
}
