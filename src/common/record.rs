use std::fmt::Display;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use super::location::LocationOutcome;

/// Keys owned by the record itself; payload entries with these names are dropped.
pub const RESERVED_KEYS: [&str; 4] = ["timestamp", "event", "networkLocation", "deviceLocation"];

pub mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InitialPageLoad,
    PassivePageLoad,
    BeatInteraction,
    ContactFormSubmission,
    MicrophoneActivated,
    MicrophoneCapture,
    MicrophoneDenied,
    CameraActivated,
    CameraImageCapture,
    CameraDenied,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitialPageLoad => "initial_page_load",
            Self::PassivePageLoad => "passive_page_load",
            Self::BeatInteraction => "beat_interaction",
            Self::ContactFormSubmission => "contact_form_submission",
            Self::MicrophoneActivated => "microphone_activated",
            Self::MicrophoneCapture => "microphone_capture",
            Self::MicrophoneDenied => "microphone_denied",
            Self::CameraActivated => "camera_activated",
            Self::CameraImageCapture => "camera_image_capture",
            Self::CameraDenied => "camera_denied",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of the visiting client. Unknown fields stay `None`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub event: EventKind,
    pub environment: Environment,
    pub network_location: Option<LocationOutcome>,
    pub device_location: Option<LocationOutcome>,
    pub payload: Payload,
}

impl EventRecord {
    pub fn new(event: EventKind, environment: Environment, payload: Payload) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
            environment,
            network_location: None,
            device_location: None,
            payload,
        }
    }

    /// Flat wire object: environment first, payload merged over it.
    pub fn to_wire(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut object = Map::new();
        object.insert(
            "timestamp".into(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        object.insert("event".into(), Value::String(self.event.to_string()));

        if let Value::Object(environment) = serde_json::to_value(&self.environment)? {
            object.extend(environment);
        }

        for (key, value) in self.payload.iter() {
            if RESERVED_KEYS.contains(&key.as_str()) {
                debug!(event = %self.event, key = key, "reserved payload key dropped");
                continue;
            }
            object.insert(key.clone(), value.clone());
        }

        if let Some(ref outcome) = self.network_location {
            object.insert("networkLocation".into(), serde_json::to_value(outcome)?);
        }
        if let Some(ref outcome) = self.device_location {
            object.insert("deviceLocation".into(), serde_json::to_value(outcome)?);
        }

        Ok(object)
    }
}

impl Serialize for EventRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let object = self.to_wire().map_err(serde::ser::Error::custom)?;
        let mut map = serializer.serialize_map(Some(object.len()))?;
        for (key, value) in object.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn environment() -> Environment {
        Environment {
            user_agent: Some("agent/1.0".into()),
            screen_width: Some(1280),
            screen_height: None,
            language: Some("en-US".into()),
            referrer: None,
        }
    }

    #[test]
    fn payload_overrides_environment_but_not_reserved_keys() {
        let payload = Payload::new()
            .with("userAgent", "override")
            .with("event", "spoofed")
            .with("timestamp", "yesterday")
            .with("beatName", "Night Drive");
        let record = EventRecord::new(EventKind::BeatInteraction, environment(), payload);

        let wire = serde_json::to_value(&record).unwrap();

        assert_eq!(wire["event"], json!("beat_interaction"));
        assert_ne!(wire["timestamp"], json!("yesterday"));
        assert_eq!(wire["userAgent"], json!("override"));
        assert_eq!(wire["beatName"], json!("Night Drive"));
        assert_eq!(wire["screenWidth"], json!(1280));
    }

    #[test]
    fn unknown_environment_fields_are_absent() {
        let record = EventRecord::new(EventKind::InitialPageLoad, environment(), Payload::new());

        let wire = record.to_wire().unwrap();

        assert!(!wire.contains_key("screenHeight"));
        assert!(!wire.contains_key("referrer"));
        assert!(!wire.contains_key("networkLocation"));
        assert!(!wire.contains_key("deviceLocation"));
    }

    #[test]
    fn location_slots_are_embedded() {
        let mut record =
            EventRecord::new(EventKind::InitialPageLoad, Environment::default(), Payload::new());
        record.network_location = Some(LocationOutcome::error("quota exceeded"));
        record.device_location = Some(LocationOutcome::Unsupported);

        let wire = serde_json::to_value(&record).unwrap();

        assert_eq!(
            wire["networkLocation"],
            json!({"status": "error", "message": "quota exceeded"})
        );
        assert_eq!(wire["deviceLocation"], json!({"status": "unsupported"}));
    }

    #[test]
    fn timestamp_is_iso8601_millis() {
        let record =
            EventRecord::new(EventKind::InitialPageLoad, Environment::default(), Payload::new());

        let wire = record.to_wire().unwrap();
        let raw = wire["timestamp"].as_str().unwrap();

        assert!(raw.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(raw).is_ok());
    }
}
