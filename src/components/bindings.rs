use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::{select, sync::RwLock, task::JoinHandle, time};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::common::{
    broadcast::{self, IdentifiedBroadcast},
    events::{self, Control, Event, EventComponent, Trigger, TriggerKind},
    record::{EventKind, Payload},
};

use super::{camera::CameraCapture, microphone::MicrophoneCapture, pipeline::Pipeline};

#[derive(Error, Debug)]
pub enum Error {
    #[error("broadcast error: {0}")]
    Broadcast(#[from] broadcast::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingConsent,
    PassiveCollection,
    Active,
}

/// Everything a trigger handler may drive.
pub struct Context {
    pub pipeline: Arc<Pipeline>,
    pub microphone: MicrophoneCapture,
    pub camera: CameraCapture,
}

impl Context {
    pub fn new(pipeline: Arc<Pipeline>, microphone_window: Duration) -> Self {
        Self {
            microphone: MicrophoneCapture::new(pipeline.clone(), microphone_window),
            camera: CameraCapture::new(pipeline.clone()),
            pipeline,
        }
    }
}

pub type Handler = Arc<dyn Fn(Arc<Context>, Trigger) -> BoxFuture<'static, ()> + Send + Sync>;

/// Trigger to handler registry behind the consent state machine.
pub struct InteractionBindings {
    stage: Arc<RwLock<Stage>>,
    context: Arc<Context>,
    handlers: HashMap<TriggerKind, Handler>,
    consent_timeout: Option<Duration>,
    tasks: TaskTracker,
}

impl InteractionBindings {
    pub fn new(context: Arc<Context>) -> Self {
        Self {
            stage: Arc::new(RwLock::new(Stage::AwaitingConsent)),
            context,
            handlers: HashMap::new(),
            consent_timeout: None,
            tasks: TaskTracker::new(),
        }
    }

    pub fn standard(context: Arc<Context>) -> Self {
        let mut bindings = Self::new(context);

        bindings.register(TriggerKind::ConsentGranted, |ctx, _| async move {
            ctx.pipeline.emit(EventKind::InitialPageLoad, Payload::new()).await;
        });
        bindings.register(TriggerKind::ConsentTimeout, |ctx, _| async move {
            ctx.pipeline.emit(EventKind::PassivePageLoad, Payload::new()).await;
        });
        bindings.register(TriggerKind::BeatToggled, |ctx, trigger| async move {
            if let Trigger::BeatToggled { name, artist, playing } = trigger {
                let action = if playing { "played" } else { "paused" };
                info!(beat = name, artist = artist, action = action, "beat interaction");
                ctx.pipeline
                    .status(Control::Beat, if playing { "Playing" } else { "Paused" });
                let payload = Payload::new()
                    .with("beatName", name)
                    .with("beatArtist", artist)
                    .with("action", action);
                ctx.pipeline.emit(EventKind::BeatInteraction, payload).await;
            }
        });
        bindings.register(TriggerKind::ContactFormSubmitted, |ctx, trigger| async move {
            if let Trigger::ContactFormSubmitted { name, email, message } = trigger {
                let payload = Payload::new()
                    .with("name", name)
                    .with("email", email)
                    .with("message", message);
                ctx.pipeline.emit(EventKind::ContactFormSubmission, payload).await;
                ctx.pipeline.status(Control::ContactForm, "Message sent");
            }
        });
        bindings.register(TriggerKind::MicrophoneRequested, |ctx, _| async move {
            ctx.microphone.activate().await;
        });
        bindings.register(TriggerKind::CameraRequested, |ctx, _| async move {
            ctx.camera.activate().await;
        });
        bindings.register(TriggerKind::CameraCaptureRequested, |ctx, _| async move {
            ctx.camera.capture().await;
        });
        bindings.register(TriggerKind::CameraReleased, |ctx, _| async move {
            ctx.camera.release().await;
        });

        bindings
    }

    /// Emits `ConsentTimeout` by itself once this long passes without consent.
    pub fn with_consent_timeout(mut self, timeout: Duration) -> Self {
        self.consent_timeout = Some(timeout);
        self
    }

    pub fn register<F, Fut>(&mut self, kind: TriggerKind, handler: F)
    where
        F: Fn(Arc<Context>, Trigger) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let boxed: Handler = Arc::new(
            move |ctx: Arc<Context>, trigger: Trigger| -> BoxFuture<'static, ()> {
                Box::pin(handler(ctx, trigger))
            },
        );
        self.handlers.insert(kind, boxed);
    }

    pub async fn stage(&self) -> Stage {
        *self.stage.read().await
    }

    fn spawn(&self, trigger: Trigger) -> Option<JoinHandle<()>> {
        let kind = trigger.kind();
        match self.handlers.get(&kind) {
            Some(handler) => Some(self.tasks.spawn(handler(self.context.clone(), trigger))),
            None => {
                debug!(trigger = ?kind, "no handler registered");
                None
            }
        }
    }

    /// Advances the consent state and starts the trigger's handler.
    /// Returns `None` when the trigger is ignored in the current stage.
    pub async fn dispatch(&self, trigger: Trigger) -> Option<JoinHandle<()>> {
        let mut stage = self.stage.write().await;
        match (*stage, trigger.kind()) {
            (Stage::AwaitingConsent, TriggerKind::ConsentGranted) => {
                info!("consent granted");
                *stage = Stage::Active;
                self.spawn(trigger)
            }
            (Stage::AwaitingConsent, TriggerKind::ConsentTimeout) => {
                info!("consent timed out, collecting passively");
                *stage = Stage::PassiveCollection;
                let handler = self.spawn(trigger);
                let shared = self.stage.clone();
                Some(self.tasks.spawn(async move {
                    if let Some(handler) = handler {
                        if let Err(e) = handler.await {
                            warn!(error = %e, "passive collection task failed");
                        }
                    }
                    *shared.write().await = Stage::Active;
                }))
            }
            (_, TriggerKind::ConsentGranted | TriggerKind::ConsentTimeout) => {
                debug!(stage = ?*stage, trigger = ?trigger.kind(), "consent already resolved");
                None
            }
            (Stage::Active, _) => self.spawn(trigger),
            (stage, kind) => {
                debug!(stage = ?stage, trigger = ?kind, "interaction before active stage dropped");
                None
            }
        }
    }

    /// Waits for every handler started so far.
    pub async fn drain(&self) {
        self.tasks.close();
        if !self.tasks.is_empty() {
            info!(pending = self.tasks.len(), "waiting for trigger handlers");
        }
        self.tasks.wait().await;
    }

    async fn run_internal(
        &mut self,
        mut broadcast: IdentifiedBroadcast<Event>,
    ) -> Result<(), Error> {
        info!(handlers = self.handlers.len(), "start interaction bindings");

        let consent_deadline = self
            .consent_timeout
            .map(|timeout| time::Instant::now() + timeout);
        let mut timer_armed = consent_deadline.is_some();

        loop {
            select! {
                _ = time::sleep_until(consent_deadline.unwrap_or_else(time::Instant::now)),
                    if timer_armed =>
                {
                    timer_armed = false;
                    if self.stage().await == Stage::AwaitingConsent {
                        warn!("no consent interaction before timeout");
                        self.dispatch(Trigger::ConsentTimeout).await;
                    }
                }
                event = broadcast.recv() => {
                    match event? {
                        Event::Trigger(trigger) => {
                            self.dispatch(trigger).await;
                        }
                        Event::InputClosed => {
                            self.drain().await;
                            info!("trigger handlers drained");
                            return Ok(());
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

#[async_trait]
impl EventComponent for InteractionBindings {
    async fn run(&mut self, broadcast: IdentifiedBroadcast<Event>) -> Result<(), events::Error> {
        self.run_internal(broadcast)
            .await
            .map_err(|e| events::Error::Component(format!("bindings: {}", e)))
    }
}
