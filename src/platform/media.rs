use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use tracing::debug;

use super::PlatformError;

pub trait MediaStream: Send {
    /// Stops every underlying track. Must be idempotent.
    fn stop(&mut self);
    fn is_live(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<i16>,
}

#[async_trait]
pub trait AudioStream: MediaStream {
    fn sample_rate(&self) -> u32;
    fn channels(&self) -> u16;
    /// Next block of interleaved samples, `None` once the stream ended.
    async fn next_chunk(&mut self) -> Option<AudioChunk>;
}

#[async_trait]
pub trait VideoStream: MediaStream {
    fn dimensions(&self) -> (u32, u32);
    /// Rasterizes the current frame as JPEG at the given quality (0.0..=1.0).
    async fn snapshot_jpeg(&mut self, quality: f32) -> Result<Vec<u8>, PlatformError>;
}

/// Owns a granted stream and stops its tracks when dropped, so every exit
/// path of an attempt releases the device.
pub struct ScopedStream<S: MediaStream + ?Sized> {
    inner: Box<S>,
}

impl<S: MediaStream + ?Sized> ScopedStream<S> {
    pub fn new(inner: Box<S>) -> Self {
        Self { inner }
    }

    pub fn release(self) {
        drop(self)
    }
}

impl<S: MediaStream + ?Sized> Deref for ScopedStream<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: MediaStream + ?Sized> DerefMut for ScopedStream<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

impl<S: MediaStream + ?Sized> Drop for ScopedStream<S> {
    fn drop(&mut self) {
        if self.inner.is_live() {
            debug!("stopping media tracks");
        }
        self.inner.stop();
    }
}
