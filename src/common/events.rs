use std::{any::type_name, fmt::Display};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::{self, JoinHandle};
use tracing::{error, info};

use super::{broadcast::IdentifiedBroadcast, record::EventKind};
use crate::adapter::endpoint::DeliveryReport;

#[derive(Error, Debug)]
pub enum Error {
    #[error("component error: {0}")]
    Component(String),
}

/// Host interactions delivered to the bindings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum Trigger {
    ConsentGranted,
    ConsentTimeout,
    BeatToggled {
        name: String,
        artist: String,
        playing: bool,
    },
    ContactFormSubmitted {
        name: String,
        email: String,
        message: String,
    },
    MicrophoneRequested,
    CameraRequested,
    CameraCaptureRequested,
    CameraReleased,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    ConsentGranted,
    ConsentTimeout,
    BeatToggled,
    ContactFormSubmitted,
    MicrophoneRequested,
    CameraRequested,
    CameraCaptureRequested,
    CameraReleased,
}

impl Trigger {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::ConsentGranted => TriggerKind::ConsentGranted,
            Self::ConsentTimeout => TriggerKind::ConsentTimeout,
            Self::BeatToggled { .. } => TriggerKind::BeatToggled,
            Self::ContactFormSubmitted { .. } => TriggerKind::ContactFormSubmitted,
            Self::MicrophoneRequested => TriggerKind::MicrophoneRequested,
            Self::CameraRequested => TriggerKind::CameraRequested,
            Self::CameraCaptureRequested => TriggerKind::CameraCaptureRequested,
            Self::CameraReleased => TriggerKind::CameraReleased,
        }
    }
}

/// Activation control whose status text changed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Microphone,
    Camera,
    Beat,
    ContactForm,
}

/// Outcome of a media control action, rendered as its status text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationStatus {
    Activating,
    Active,
    Captured,
    Released,
    Denied(String),
    Unsupported,
    Failed(String),
    AlreadyActive,
    Busy,
    NoStream,
}

impl Display for ActivationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activating => write!(f, "Activating..."),
            Self::Active => write!(f, "Active"),
            Self::Captured => write!(f, "Capture complete"),
            Self::Released => write!(f, "Released"),
            Self::Denied(name) => write!(f, "Access denied: {}", name),
            Self::Unsupported => write!(f, "Not supported on this device"),
            Self::Failed(message) => write!(f, "Capture failed: {}", message),
            Self::AlreadyActive => write!(f, "Already active"),
            Self::Busy => write!(f, "Busy"),
            Self::NoStream => write!(f, "No active stream"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Event {
    Trigger(Trigger),
    Status {
        control: Control,
        text: String,
    },
    Dispatched {
        event: EventKind,
        report: DeliveryReport,
    },
    /// The trigger source is exhausted; no further triggers follow.
    InputClosed,
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trigger(Trigger::ContactFormSubmitted { name, .. }) => {
                write!(f, "Trigger(ContactFormSubmitted {{ name: {}, .. }})", name)
            }
            Self::Dispatched { event, report } => {
                write!(f, "Dispatched {{ event: {}, report: {} }}", event, report)
            }
            event => {
                write!(f, "{:?}", event)
            }
        }
    }
}

#[async_trait]
pub trait EventComponent {
    async fn run(&mut self, broadcast: IdentifiedBroadcast<Event>) -> Result<(), Error>;
}

pub struct EventSystem {
    broadcast: IdentifiedBroadcast<Event>,
    futures: Vec<Option<JoinHandle<Result<(), Error>>>>,
}

impl EventSystem {
    pub fn new(capacity: usize) -> Self {
        EventSystem {
            broadcast: IdentifiedBroadcast::new(capacity),
            futures: Vec::new(),
        }
    }

    /// Handle for publishing onto the bus from outside a component.
    pub fn handle(&self) -> IdentifiedBroadcast<Event> {
        self.broadcast.participate()
    }

    pub fn futures(&mut self) -> Vec<JoinHandle<Result<(), Error>>> {
        self.futures
            .drain(..)
            .filter_map(|ref mut f| f.take())
            .collect()
    }

    /// Runs a component whose exit ends the whole system.
    pub fn run<T: EventComponent + Send + 'static>(&mut self, component: T) {
        let handle = self.spawn(component);
        self.futures.push(Some(handle));
    }

    /// Runs a component and hands its task back to the caller.
    pub fn spawn<T: EventComponent + Send + 'static>(
        &self,
        mut component: T,
    ) -> JoinHandle<Result<(), Error>> {
        let broadcast = self.broadcast.participate();
        task::spawn(async move {
            let result = component.run(broadcast).await;
            match result {
                Ok(_) => info!(component = type_name::<T>(), "component finished"),
                Err(ref e) => error!(component = type_name::<T>(), "component exit: {:?}", e),
            }
            result
        })
    }
}
