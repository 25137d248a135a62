use std::{sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    time::{self, Instant},
};
use tracing::{info, warn};

use crate::{
    common::{
        capture::MediaCapture,
        events::{ActivationStatus, Control},
        record::{EventKind, Payload},
    },
    platform::{AudioStream, Grant, PlatformError, ScopedStream},
};

use super::pipeline::Pipeline;

/// Records a short audio sample after the microphone is granted.
pub struct MicrophoneCapture {
    pipeline: Arc<Pipeline>,
    window: Duration,
    in_use: Mutex<()>,
}

impl MicrophoneCapture {
    pub fn new(pipeline: Arc<Pipeline>, window: Duration) -> Self {
        Self {
            pipeline,
            window,
            in_use: Mutex::new(()),
        }
    }

    fn status(&self, status: ActivationStatus) -> ActivationStatus {
        self.pipeline.status(Control::Microphone, status.to_string());
        status
    }

    pub async fn activate(&self) -> ActivationStatus {
        let _in_use = match self.in_use.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("microphone capture already running");
                return self.status(ActivationStatus::Busy);
            }
        };
        self.status(ActivationStatus::Activating);

        let grant = match self.pipeline.platform().media_devices() {
            Some(devices) => devices.open_audio().await,
            None => Grant::Unsupported,
        };

        let stream = match grant {
            Grant::Granted(stream) => ScopedStream::new(stream),
            Grant::Denied(e) => {
                let status = ActivationStatus::Denied(e.name.clone());
                return self.refused(e, "denied", status).await;
            }
            Grant::Unsupported => {
                let e = PlatformError::new("NotSupportedError", "media devices unavailable");
                return self.refused(e, "unsupported", ActivationStatus::Unsupported).await;
            }
            Grant::Failed(e) => {
                let status = ActivationStatus::Failed(e.message.clone());
                return self.refused(e, "error", status).await;
            }
        };

        self.status(ActivationStatus::Active);
        let (_, sample) = tokio::join!(
            self.pipeline
                .emit_last_known(EventKind::MicrophoneActivated, Payload::new()),
            record(stream, self.window)
        );

        match sample {
            Ok(capture) => {
                info!(bytes = capture.bytes.len(), "audio sample captured");
                let payload = Payload::new().with("base64Audio", capture.to_data_uri());
                self.pipeline
                    .emit_last_known(EventKind::MicrophoneCapture, payload)
                    .await;
                self.status(ActivationStatus::Captured)
            }
            Err(e) => {
                warn!(error = %e, "failed to encode audio sample");
                self.status(ActivationStatus::Failed(e.to_string()))
            }
        }
    }

    async fn refused(
        &self,
        error: PlatformError,
        reason: &str,
        status: ActivationStatus,
    ) -> ActivationStatus {
        warn!(error = %error, reason = reason, "microphone not available");
        let payload = Payload::new()
            .with("error", error.name)
            .with("message", error.message)
            .with("reason", reason);
        self.pipeline
            .emit_last_known(EventKind::MicrophoneDenied, payload)
            .await;
        self.status(status)
    }
}

/// Collects samples until the window closes or the stream ends, then stops
/// the tracks before encoding.
async fn record(
    mut stream: ScopedStream<dyn AudioStream>,
    window: Duration,
) -> Result<MediaCapture, hound::Error> {
    let deadline = Instant::now() + window;
    let mut samples = Vec::new();

    loop {
        match time::timeout_at(deadline, stream.next_chunk()).await {
            Ok(Some(chunk)) => samples.extend(chunk.samples),
            Ok(None) => break,
            Err(_) => break,
        }
    }

    let (sample_rate, channels) = (stream.sample_rate(), stream.channels());
    stream.release();

    MediaCapture::wav(&samples, sample_rate, channels)
}
