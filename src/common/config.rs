use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use super::record::Environment;

pub const IP_API_URL: &str = "http://ip-api.com/json/";
pub const OPENCAGE_URL: &str = "https://api.opencagedata.com/geocode/v1/json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error: config: invalid url '{0}': {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("Error: config: {0}")]
    Invalid(&'static str),
}

#[derive(Parser, Debug, Clone, Serialize)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Collection endpoint receiving every event record.
    #[arg(long, env = "VISITLOG_ENDPOINT")]
    pub endpoint: String,
    /// Reverse-geocoding key; addresses are skipped when empty.
    #[arg(long, env = "OPENCAGE_API_KEY", default_value = "")]
    #[serde(skip_serializing)]
    pub opencage_key: String,
    #[arg(long, env = "VISITLOG_IP_API_URL", default_value = IP_API_URL)]
    pub ip_api_url: String,
    #[arg(long, env = "VISITLOG_OPENCAGE_URL", default_value = OPENCAGE_URL)]
    pub opencage_url: String,
    #[arg(long, default_value_t = 5u64)]
    pub consent_timeout_secs: u64,
    #[arg(long, default_value_t = 7000u64)]
    pub position_timeout_ms: u64,
    #[arg(long, default_value_t = 3000u64)]
    pub microphone_window_ms: u64,
    #[arg(long, default_value_t = 10u64)]
    pub request_timeout_secs: u64,
    #[arg(long, default_value = "")]
    pub user_agent: String,
    #[arg(long)]
    pub screen_width: Option<u32>,
    #[arg(long)]
    pub screen_height: Option<u32>,
    #[arg(long, default_value = "")]
    pub language: String,
    #[arg(long, default_value = "")]
    pub referrer: String,
    #[arg(long, default_value = "debug")]
    pub log_level: String,
}

/// Timing and service settings consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub endpoint: Url,
    pub ip_api_url: Url,
    pub opencage_url: Url,
    pub opencage_key: Option<String>,
    pub consent_timeout: Duration,
    pub position_timeout: Duration,
    pub microphone_window: Duration,
    pub request_timeout: Duration,
}

impl PipelineSettings {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            ip_api_url: Url::parse(IP_API_URL).expect("valid ip-api url"),
            opencage_url: Url::parse(OPENCAGE_URL).expect("valid opencage url"),
            opencage_key: None,
            consent_timeout: Duration::from_secs(5),
            position_timeout: Duration::from_millis(7000),
            microphone_window: Duration::from_millis(3000),
            request_timeout: Duration::from_secs(10),
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(raw.to_string(), e))
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl Config {
    pub fn validate(&self) -> Result<PipelineSettings, ConfigError> {
        if self.position_timeout_ms == 0 {
            return Err(ConfigError::Invalid("position timeout must be positive"));
        }
        if self.microphone_window_ms == 0 {
            return Err(ConfigError::Invalid("microphone window must be positive"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request timeout must be positive"));
        }

        Ok(PipelineSettings {
            endpoint: parse_url(&self.endpoint)?,
            ip_api_url: parse_url(&self.ip_api_url)?,
            opencage_url: parse_url(&self.opencage_url)?,
            opencage_key: non_empty(&self.opencage_key),
            consent_timeout: Duration::from_secs(self.consent_timeout_secs),
            position_timeout: Duration::from_millis(self.position_timeout_ms),
            microphone_window: Duration::from_millis(self.microphone_window_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }

    pub fn environment(&self) -> Environment {
        Environment {
            user_agent: non_empty(&self.user_agent),
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            language: non_empty(&self.language),
            referrer: non_empty(&self.referrer),
        }
    }
}
