use tokio::sync::RwLock;
use tracing::debug;

use super::location::LocationOutcome;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LastKnown {
    pub network: Option<LocationOutcome>,
    pub device: Option<LocationOutcome>,
}

/// Most recent location outcomes of the page session. Each slot is
/// replaced whole, so readers never observe a partially written outcome.
#[derive(Debug, Default)]
pub struct SessionState {
    slots: RwLock<LastKnown>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_network(&self, outcome: LocationOutcome) {
        debug!(status = outcome.status(), "last network location updated");
        self.slots.write().await.network = Some(outcome);
    }

    pub async fn record_device(&self, outcome: LocationOutcome) {
        debug!(status = outcome.status(), "last device location updated");
        self.slots.write().await.device = Some(outcome);
    }

    pub async fn last_network(&self) -> Option<LocationOutcome> {
        self.slots.read().await.network.clone()
    }

    pub async fn last_device(&self) -> Option<LocationOutcome> {
        self.slots.read().await.device.clone()
    }

    pub async fn snapshot(&self) -> LastKnown {
        self.slots.read().await.clone()
    }
}
