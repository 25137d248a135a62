use std::{sync::Arc, time::Duration};

use tokio::time;
use tracing::{info, warn};

use crate::{
    adapter::{ipapi::NetworkLocator, opencage::ReverseGeocoder},
    common::location::{Fix, LocationOutcome},
    platform::{Platform, PositionOptions},
};

/// Message the platform reports when a position request times out.
pub const TIMEOUT_MESSAGE: &str = "Timeout expired";

/// Location attempts. Both always resolve to an outcome.
pub struct CapabilityAcquirer {
    platform: Arc<dyn Platform>,
    network: NetworkLocator,
    geocoder: Option<ReverseGeocoder>,
    position_timeout: Duration,
}

impl CapabilityAcquirer {
    pub fn new(
        platform: Arc<dyn Platform>,
        network: NetworkLocator,
        geocoder: Option<ReverseGeocoder>,
        position_timeout: Duration,
    ) -> Self {
        if geocoder.is_none() {
            warn!("reverse geocoding key not set, device locations carry coordinates only");
        }
        Self {
            platform,
            network,
            geocoder,
            position_timeout,
        }
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    pub async fn acquire_network_location(&self) -> LocationOutcome {
        self.network.locate().await
    }

    pub async fn acquire_device_location(&self) -> LocationOutcome {
        let provider = match self.platform.geolocation() {
            Some(provider) => provider,
            None => {
                warn!("platform has no location provider");
                return LocationOutcome::Unsupported;
            }
        };

        let options = PositionOptions::precise(self.position_timeout);
        let attempt = time::timeout(options.timeout, provider.current_position(&options));
        let position = match attempt.await {
            Ok(Ok(position)) => position,
            Ok(Err(e)) => {
                warn!(error = %e, "device location denied or failed");
                return LocationOutcome::denied(e.message);
            }
            Err(_) => {
                warn!(timeout_ms = options.timeout.as_millis() as u64, "device location timed out");
                return LocationOutcome::denied(TIMEOUT_MESSAGE);
            }
        };

        info!(
            latitude = position.latitude,
            longitude = position.longitude,
            accuracy = position.accuracy,
            "device location acquired"
        );

        let mut fix = Fix::new(position.latitude, position.longitude, position.timestamp);
        fix.accuracy = Some(position.accuracy);
        if let Some(ref geocoder) = self.geocoder {
            fix.resolved_address = geocoder.resolve(position.latitude, position.longitude).await;
        }

        LocationOutcome::Success(fix)
    }
}
