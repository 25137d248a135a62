use chrono::Utc;
use reqwest::Client;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::common::location::{Fix, LocationOutcome};

pub const FIELDS: &str = concat!(
    "status,message,country,countryCode,region,regionName,city,zip,",
    "lat,lon,timezone,isp,org,as,query"
);

#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("serde_json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("response is not an object")]
    NotAnObject,
}

/// IP-based location lookup against an ip-api compatible service.
#[derive(Clone)]
pub struct NetworkLocator {
    client: Client,
    endpoint: Url,
}

impl NetworkLocator {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    async fn fetch(&self) -> Result<Map<String, Value>, Error> {
        let body = self
            .client
            .get(self.endpoint.clone())
            .query(&[("fields", FIELDS)])
            .send()
            .await?
            .text()
            .await?;

        debug!(body = body, "ip geolocation response");
        match serde_json::from_str(&body)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::NotAnObject),
        }
    }

    pub async fn locate(&self) -> LocationOutcome {
        match self.fetch().await {
            Ok(response) => interpret(response),
            Err(e) => {
                warn!(error = %e, "ip geolocation request failed");
                LocationOutcome::error(e.to_string())
            }
        }
    }
}

fn interpret(mut response: Map<String, Value>) -> LocationOutcome {
    if response.get("status").and_then(Value::as_str) != Some("success") {
        let message = response
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown failure")
            .to_string();
        warn!(message = message, "ip geolocation failed");
        return LocationOutcome::error(message);
    }

    let coordinates = (
        response.get("lat").and_then(Value::as_f64),
        response.get("lon").and_then(Value::as_f64),
    );
    let (latitude, longitude) = match coordinates {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            warn!("ip geolocation succeeded without coordinates");
            return LocationOutcome::error("missing coordinates");
        }
    };

    for key in ["status", "message", "lat", "lon"] {
        response.remove(key);
    }

    info!(latitude, longitude, "ip geolocation acquired");
    let mut fix = Fix::new(latitude, longitude, Utc::now());
    fix.provider = response;
    LocationOutcome::Success(fix)
}
