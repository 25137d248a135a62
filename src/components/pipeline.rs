use std::sync::Arc;

use reqwest::Client;
use tracing::debug;

use crate::{
    adapter::{
        endpoint::{DeliveryReport, Dispatcher},
        ipapi::NetworkLocator,
        opencage::ReverseGeocoder,
    },
    common::{
        broadcast::IdentifiedBroadcast,
        config::PipelineSettings,
        events::{Control, Event},
        record::{EventKind, EventRecord, Payload},
        session::SessionState,
    },
    platform::Platform,
};

use super::{acquirer::CapabilityAcquirer, aggregator::EventAggregator};

/// Aggregation plus dispatch, shared by every trigger handler.
pub struct Pipeline {
    aggregator: EventAggregator,
    dispatcher: Arc<Dispatcher>,
    platform: Arc<dyn Platform>,
    bus: Option<IdentifiedBroadcast<Event>>,
}

impl Pipeline {
    pub fn new(
        aggregator: EventAggregator,
        dispatcher: Arc<Dispatcher>,
        platform: Arc<dyn Platform>,
    ) -> Self {
        Self {
            aggregator,
            dispatcher,
            platform,
            bus: None,
        }
    }

    /// Wires acquirer, aggregator and dispatcher over one HTTP client.
    pub fn from_settings(
        settings: &PipelineSettings,
        platform: Arc<dyn Platform>,
        session: Arc<SessionState>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()?;

        let network = NetworkLocator::new(client.clone(), settings.ip_api_url.clone());
        let geocoder = settings
            .opencage_key
            .as_deref()
            .map(|key| ReverseGeocoder::new(client.clone(), settings.opencage_url.clone(), key));
        let acquirer = CapabilityAcquirer::new(
            platform.clone(),
            network,
            geocoder,
            settings.position_timeout,
        );
        let aggregator = EventAggregator::new(Arc::new(acquirer), session);
        let dispatcher = Dispatcher::new(client, settings.endpoint.clone());

        Ok(Self::new(aggregator, Arc::new(dispatcher), platform))
    }

    /// Publishes status changes and delivery reports on the given bus.
    pub fn with_bus(mut self, bus: IdentifiedBroadcast<Event>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn aggregator(&self) -> &EventAggregator {
        &self.aggregator
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    fn publish(&self, event: Event) {
        if let Some(ref bus) = self.bus {
            if let Err(e) = bus.send(event) {
                debug!(error = %e, "no bus listeners");
            }
        }
    }

    pub fn status(&self, control: Control, text: impl Into<String>) {
        self.publish(Event::Status {
            control,
            text: text.into(),
        });
    }

    async fn deliver(&self, record: EventRecord) -> DeliveryReport {
        let report = self.dispatcher.send(&record).await;
        self.publish(Event::Dispatched {
            event: record.event,
            report: report.clone(),
        });
        report
    }

    /// Re-acquires both locations, then sends.
    pub async fn emit(&self, event: EventKind, payload: Payload) -> DeliveryReport {
        let record = self.aggregator.build_event(event, payload).await;
        self.deliver(record).await
    }

    /// Sends with the session's last known locations.
    pub async fn emit_last_known(&self, event: EventKind, payload: Payload) -> DeliveryReport {
        let record = self.aggregator.build_with_last_known(event, payload).await;
        self.deliver(record).await
    }
}
