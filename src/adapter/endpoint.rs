use std::{fmt::Display, sync::Arc};

use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use url::Url;

use crate::common::record::EventRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryReport {
    Delivered { status: u16 },
    Rejected { status: u16 },
    Unreachable { message: String },
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

impl Display for DeliveryReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivered { status } => write!(f, "delivered ({})", status),
            Self::Rejected { status } => write!(f, "rejected ({})", status),
            Self::Unreachable { message } => write!(f, "unreachable: {}", message),
        }
    }
}

/// Posts event records to the collection endpoint. Delivery failures are
/// logged and reported, never raised.
#[derive(Clone)]
pub struct Dispatcher {
    client: Client,
    endpoint: Url,
}

impl Dispatcher {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub async fn send(&self, record: &EventRecord) -> DeliveryReport {
        let body = match serde_json::to_vec(record) {
            Ok(body) => body,
            Err(e) => {
                error!(event = %record.event, error = %e, "failed to serialize record");
                return DeliveryReport::Unreachable {
                    message: e.to_string(),
                };
            }
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                let status = response.status().as_u16();
                info!(event = %record.event, status, "event delivered");
                DeliveryReport::Delivered { status }
            }
            Ok(response) => {
                let status = response.status().as_u16();
                warn!(event = %record.event, status, "endpoint rejected event");
                DeliveryReport::Rejected { status }
            }
            Err(e) => {
                error!(event = %record.event, error = %e, "failed to send event");
                DeliveryReport::Unreachable {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Detached send; the returned handle may be dropped.
    pub fn spawn_send(self: &Arc<Self>, record: EventRecord) -> JoinHandle<DeliveryReport> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.send(&record).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::record::{Environment, EventKind, Payload};

    #[tokio::test]
    async fn unreachable_endpoint_is_reported_not_raised() {
        let dispatcher = Dispatcher::new(
            Client::new(),
            Url::parse("http://127.0.0.1:65535/log-data").unwrap(),
        );
        let record =
            EventRecord::new(EventKind::CameraDenied, Environment::default(), Payload::new());

        let report = dispatcher.send(&record).await;

        assert!(matches!(report, DeliveryReport::Unreachable { .. }));
    }

    #[tokio::test]
    async fn detached_send_completes() {
        let dispatcher = Arc::new(Dispatcher::new(
            Client::new(),
            Url::parse("http://127.0.0.1:65535/log-data").unwrap(),
        ));
        let record =
            EventRecord::new(EventKind::InitialPageLoad, Environment::default(), Payload::new());

        let report = dispatcher.spawn_send(record).await.unwrap();

        assert!(!report.is_delivered());
    }
}
