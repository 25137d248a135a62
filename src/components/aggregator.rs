use std::sync::Arc;

use tracing::debug;

use crate::common::{
    record::{EventKind, EventRecord, Payload},
    session::SessionState,
};

use super::acquirer::CapabilityAcquirer;

/// Builds one flat event record per trigger.
pub struct EventAggregator {
    acquirer: Arc<CapabilityAcquirer>,
    session: Arc<SessionState>,
}

impl EventAggregator {
    pub fn new(acquirer: Arc<CapabilityAcquirer>, session: Arc<SessionState>) -> Self {
        Self { acquirer, session }
    }

    fn stamp(&self, event: EventKind, payload: Payload) -> EventRecord {
        EventRecord::new(event, self.acquirer.platform().environment(), payload)
    }

    /// Fresh network then device acquisition, each written back to the session.
    pub async fn build_event(&self, event: EventKind, payload: Payload) -> EventRecord {
        let mut record = self.stamp(event, payload);

        let network = self.acquirer.acquire_network_location().await;
        self.session.record_network(network.clone()).await;
        record.network_location = Some(network);

        let device = self.acquirer.acquire_device_location().await;
        self.session.record_device(device.clone()).await;
        record.device_location = Some(device);

        debug!(event = %event, "event built");
        record
    }

    /// Attaches the last known outcomes without querying any source.
    pub async fn build_with_last_known(&self, event: EventKind, payload: Payload) -> EventRecord {
        let mut record = self.stamp(event, payload);
        let last = self.session.snapshot().await;
        record.network_location = last.network;
        record.device_location = last.device;
        record
    }
}
