//! Host capabilities the pipeline asks for.
//!
//! A browser host, a test double and the headless binary all implement
//! [`Platform`]. Each capability is optional: a platform without a
//! location provider or media devices returns `None` and the pipeline
//! reports the capability as unsupported.

pub mod headless;
pub mod media;

use std::{fmt::Display, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::record::Environment;
pub use media::{AudioChunk, AudioStream, MediaStream, ScopedStream, VideoStream};

/// Error reported by the host, e.g. `NotAllowedError` for a refused prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    pub name: String,
    pub message: String,
}

impl PlatformError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for PlatformError {}

/// Result of a permission-gated capability request.
#[derive(Debug)]
pub enum Grant<T> {
    Granted(T),
    Denied(PlatformError),
    Unsupported,
    Failed(PlatformError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl PositionOptions {
    /// One-shot precise fix, never served from cache.
    pub fn precise(timeout: Duration) -> Self {
        Self {
            enable_high_accuracy: true,
            timeout,
            maximum_age: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait PositionProvider: Send + Sync {
    /// Permission refusal and provider failures both come back as `Err`.
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, PlatformError>;
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn open_audio(&self) -> Grant<Box<dyn AudioStream>>;
    async fn open_video(&self, width: u32, height: u32) -> Grant<Box<dyn VideoStream>>;
}

pub trait Platform: Send + Sync {
    fn environment(&self) -> Environment;
    fn geolocation(&self) -> Option<Arc<dyn PositionProvider>>;
    fn media_devices(&self) -> Option<Arc<dyn MediaDevices>>;
}
