#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use httpmock::MockServer;
use url::Url;
use visitlog::{
    common::{config::PipelineSettings, record::Environment, session::SessionState},
    components::{bindings::Context, pipeline::Pipeline},
    platform::{
        AudioChunk, AudioStream, Grant, MediaDevices, MediaStream, Platform, PlatformError,
        Position, PositionOptions, PositionProvider, VideoStream,
    },
};

pub const ENDPOINT_PATH: &str = "/log-data";
pub const IP_API_PATH: &str = "/json/";
pub const GEOCODE_PATH: &str = "/geocode/v1/json";
pub const GEOCODE_KEY: &str = "test-key";

pub fn settings(server: &MockServer) -> PipelineSettings {
    let mut settings = PipelineSettings::new(Url::parse(&server.url(ENDPOINT_PATH)).unwrap());
    settings.ip_api_url = Url::parse(&server.url(IP_API_PATH)).unwrap();
    settings.opencage_url = Url::parse(&server.url(GEOCODE_PATH)).unwrap();
    settings.opencage_key = Some(GEOCODE_KEY.to_string());
    settings.position_timeout = Duration::from_millis(300);
    settings.microphone_window = Duration::from_millis(150);
    settings.request_timeout = Duration::from_secs(5);
    settings
}

pub fn environment() -> Environment {
    Environment {
        user_agent: Some("FakeBrowser/1.0".into()),
        screen_width: Some(1920),
        screen_height: Some(1080),
        language: Some("en-GB".into()),
        referrer: None,
    }
}

pub fn pipeline(
    settings: &PipelineSettings,
    platform: FakePlatform,
) -> (Arc<Pipeline>, Arc<SessionState>) {
    let session = Arc::new(SessionState::new());
    let pipeline = Pipeline::from_settings(settings, Arc::new(platform), session.clone()).unwrap();
    (Arc::new(pipeline), session)
}

pub fn context(settings: &PipelineSettings, platform: FakePlatform) -> Arc<Context> {
    let (pipeline, _) = pipeline(settings, platform);
    Arc::new(Context::new(pipeline, settings.microphone_window))
}

pub fn position(latitude: f64, longitude: f64) -> Position {
    Position {
        latitude,
        longitude,
        accuracy: 12.5,
        timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
    }
}

pub struct FakeGeolocation {
    pub result: Result<Position, PlatformError>,
    pub delay: Duration,
}

#[async_trait]
impl PositionProvider for FakeGeolocation {
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, PlatformError> {
        assert!(options.enable_high_accuracy);
        assert_eq!(options.maximum_age, Duration::ZERO);
        tokio::time::sleep(self.delay).await;
        self.result.clone()
    }
}

/// Counts opened and stopped media streams.
#[derive(Clone, Default)]
pub struct Tracks {
    opened: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
}

impl Tracks {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.stopped.load(Ordering::SeqCst)
    }
}

struct Track {
    live: bool,
    tracks: Tracks,
}

impl Track {
    fn open(tracks: &Tracks) -> Self {
        tracks.opened.fetch_add(1, Ordering::SeqCst);
        Self {
            live: true,
            tracks: tracks.clone(),
        }
    }

    fn stop(&mut self) {
        if self.live {
            self.live = false;
            self.tracks.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct FakeAudio {
    track: Track,
    chunks: VecDeque<Vec<i16>>,
    ends: bool,
}

impl MediaStream for FakeAudio {
    fn stop(&mut self) {
        self.track.stop();
    }

    fn is_live(&self) -> bool {
        self.track.live
    }
}

#[async_trait]
impl AudioStream for FakeAudio {
    fn sample_rate(&self) -> u32 {
        8000
    }

    fn channels(&self) -> u16 {
        1
    }

    async fn next_chunk(&mut self) -> Option<AudioChunk> {
        if let Some(samples) = self.chunks.pop_front() {
            return Some(AudioChunk { samples });
        }
        if self.ends {
            return None;
        }
        futures::future::pending().await
    }
}

struct FakeVideo {
    track: Track,
    dimensions: (u32, u32),
}

impl MediaStream for FakeVideo {
    fn stop(&mut self) {
        self.track.stop();
    }

    fn is_live(&self) -> bool {
        self.track.live
    }
}

#[async_trait]
impl VideoStream for FakeVideo {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    async fn snapshot_jpeg(&mut self, quality: f32) -> Result<Vec<u8>, PlatformError> {
        assert!((quality - 0.8).abs() < f32::EPSILON);
        Ok(vec![0xff, 0xd8, 0xff, 0xe0])
    }
}

#[derive(Clone)]
pub enum Behavior {
    Grant,
    Deny(&'static str),
    Fail(&'static str),
}

pub struct FakeMedia {
    pub audio: Behavior,
    pub video: Behavior,
    pub tracks: Tracks,
    pub chunks: Vec<Vec<i16>>,
    /// Whether the audio stream ends on its own after the queued chunks.
    pub audio_ends: bool,
    /// Time the permission prompt stays open before resolving.
    pub prompt_delay: Duration,
}

impl FakeMedia {
    pub fn granting() -> Self {
        Self {
            audio: Behavior::Grant,
            video: Behavior::Grant,
            tracks: Tracks::default(),
            chunks: vec![vec![1, 2, 3], vec![-4, -5]],
            audio_ends: false,
            prompt_delay: Duration::ZERO,
        }
    }

    pub fn denying() -> Self {
        Self {
            audio: Behavior::Deny("NotAllowedError"),
            video: Behavior::Deny("NotAllowedError"),
            ..Self::granting()
        }
    }
}

fn refuse<T>(behavior: &Behavior) -> Option<Grant<T>> {
    match behavior {
        Behavior::Grant => None,
        Behavior::Deny(name) => Some(Grant::Denied(PlatformError::new(*name, "Permission denied"))),
        Behavior::Fail(name) => Some(Grant::Failed(PlatformError::new(
            *name,
            "Could not start source",
        ))),
    }
}

#[async_trait]
impl MediaDevices for FakeMedia {
    async fn open_audio(&self) -> Grant<Box<dyn AudioStream>> {
        tokio::time::sleep(self.prompt_delay).await;
        if let Some(refusal) = refuse(&self.audio) {
            return refusal;
        }
        Grant::Granted(Box::new(FakeAudio {
            track: Track::open(&self.tracks),
            chunks: self.chunks.iter().cloned().collect(),
            ends: self.audio_ends,
        }))
    }

    async fn open_video(&self, width: u32, height: u32) -> Grant<Box<dyn VideoStream>> {
        tokio::time::sleep(self.prompt_delay).await;
        if let Some(refusal) = refuse(&self.video) {
            return refusal;
        }
        Grant::Granted(Box::new(FakeVideo {
            track: Track::open(&self.tracks),
            dimensions: (width, height),
        }))
    }
}

pub struct FakePlatform {
    pub environment: Environment,
    pub geolocation: Option<Arc<FakeGeolocation>>,
    pub media: Option<Arc<FakeMedia>>,
}

impl FakePlatform {
    pub fn bare() -> Self {
        Self {
            environment: environment(),
            geolocation: None,
            media: None,
        }
    }

    pub fn located(latitude: f64, longitude: f64) -> Self {
        Self {
            geolocation: Some(Arc::new(FakeGeolocation {
                result: Ok(position(latitude, longitude)),
                delay: Duration::ZERO,
            })),
            ..Self::bare()
        }
    }

    pub fn with_media(media: Arc<FakeMedia>) -> Self {
        Self {
            media: Some(media),
            ..Self::bare()
        }
    }
}

impl Platform for FakePlatform {
    fn environment(&self) -> Environment {
        self.environment.clone()
    }

    fn geolocation(&self) -> Option<Arc<dyn PositionProvider>> {
        self.geolocation
            .clone()
            .map(|provider| provider as Arc<dyn PositionProvider>)
    }

    fn media_devices(&self) -> Option<Arc<dyn MediaDevices>> {
        self.media.clone().map(|media| media as Arc<dyn MediaDevices>)
    }
}
