use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    common::{
        capture::MediaCapture,
        events::{ActivationStatus, Control},
        record::{EventKind, Payload},
    },
    platform::{Grant, PlatformError, ScopedStream, VideoStream},
};

use super::pipeline::Pipeline;

pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;
pub const JPEG_QUALITY: f32 = 0.8;

/// Keeps a live camera stream between activation and release.
pub struct CameraCapture {
    pipeline: Arc<Pipeline>,
    stream: Mutex<Option<ScopedStream<dyn VideoStream>>>,
}

impl CameraCapture {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            stream: Mutex::new(None),
        }
    }

    fn status(&self, status: ActivationStatus) -> ActivationStatus {
        self.pipeline.status(Control::Camera, status.to_string());
        status
    }

    pub async fn is_active(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    pub async fn activate(&self) -> ActivationStatus {
        // held across the prompt so a second request cannot open the device twice
        let mut slot = match self.stream.try_lock() {
            Ok(slot) => slot,
            Err(_) => {
                warn!("camera activation already in progress");
                return self.status(ActivationStatus::Busy);
            }
        };
        if slot.is_some() {
            return self.status(ActivationStatus::AlreadyActive);
        }
        self.status(ActivationStatus::Activating);

        let grant = match self.pipeline.platform().media_devices() {
            Some(devices) => devices.open_video(FRAME_WIDTH, FRAME_HEIGHT).await,
            None => Grant::Unsupported,
        };

        match grant {
            Grant::Granted(stream) => {
                let (width, height) = stream.dimensions();
                info!(width, height, "camera stream opened");
                *slot = Some(ScopedStream::new(stream));
                drop(slot);

                self.pipeline
                    .emit_last_known(EventKind::CameraActivated, Payload::new())
                    .await;
                self.status(ActivationStatus::Active)
            }
            Grant::Denied(e) => {
                drop(slot);
                let status = ActivationStatus::Denied(e.name.clone());
                self.refused(e, "denied", status).await
            }
            Grant::Unsupported => {
                drop(slot);
                let e = PlatformError::new("NotSupportedError", "media devices unavailable");
                self.refused(e, "unsupported", ActivationStatus::Unsupported).await
            }
            Grant::Failed(e) => {
                drop(slot);
                let status = ActivationStatus::Failed(e.message.clone());
                self.refused(e, "error", status).await
            }
        }
    }

    /// Grabs one still. Without a live stream nothing is sent.
    pub async fn capture(&self) -> ActivationStatus {
        let mut slot = self.stream.lock().await;
        let stream = match slot.as_mut() {
            Some(stream) => stream,
            None => {
                info!("image capture requested without an active camera");
                return ActivationStatus::NoStream;
            }
        };

        let frame = match stream.snapshot_jpeg(JPEG_QUALITY).await {
            Ok(bytes) => MediaCapture::jpeg(bytes),
            Err(e) => {
                warn!(error = %e, "failed to capture camera frame");
                return self.status(ActivationStatus::Failed(e.message));
            }
        };
        drop(slot);

        info!(bytes = frame.bytes.len(), "camera image captured");
        let payload = Payload::new().with("base64Image", frame.to_data_uri());
        self.pipeline
            .emit_last_known(EventKind::CameraImageCapture, payload)
            .await;
        self.status(ActivationStatus::Captured)
    }

    pub async fn release(&self) -> ActivationStatus {
        match self.stream.lock().await.take() {
            Some(stream) => {
                stream.release();
                info!("camera stream released");
                self.status(ActivationStatus::Released)
            }
            None => ActivationStatus::NoStream,
        }
    }

    async fn refused(
        &self,
        error: PlatformError,
        reason: &str,
        status: ActivationStatus,
    ) -> ActivationStatus {
        warn!(error = %error, reason = reason, "camera not available");
        let payload = Payload::new()
            .with("error", error.name)
            .with("message", error.message)
            .with("reason", reason);
        self.pipeline
            .emit_last_known(EventKind::CameraDenied, payload)
            .await;
        self.status(status)
    }
}
