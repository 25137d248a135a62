use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::iso8601;

/// A resolved position, either from the network lookup or from the device.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_address: Option<String>,
    /// Raw provider fields (country, city, isp, ...) kept as returned.
    #[serde(flatten)]
    pub provider: Map<String, Value>,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            timestamp,
            resolved_address: None,
            provider: Map::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocationOutcome {
    Success(Fix),
    Denied {
        #[serde(rename = "message")]
        reason: String,
    },
    Unsupported,
    Error {
        message: String,
    },
}

impl LocationOutcome {
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn fix(&self) -> Option<&Fix> {
        match self {
            Self::Success(fix) => Some(fix),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Denied { .. } => "denied",
            Self::Unsupported => "unsupported",
            Self::Error { .. } => "error",
        }
    }
}
