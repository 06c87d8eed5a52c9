//! Telemetry Models
//!
//! Live sensor state for the device currently on screen.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Latest known readings for the viewed device
///
/// Held only in memory for as long as the detail view and its session live.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    /// Degrees Celsius, `0.0` until the first reading
    pub temperature: f64,

    /// Soil humidity percentage, `0.0` until the first reading
    pub humidity: f64,

    /// Free-text status from the device (plant health verdict)
    pub status_message: String,

    /// Camera stream URL or inline frame payload
    pub stream_locator: String,

    /// When the last update was merged
    pub updated_at: Option<DateTime<Utc>>,
}

impl TelemetrySnapshot {
    /// Overwrite every field present in `update`; absent fields keep their value.
    ///
    /// Returns `true` when at least one field was present.
    pub fn merge(&mut self, update: &TelemetryUpdate) -> bool {
        if update.is_empty() {
            return false;
        }
        if let Some(temperature) = update.temperature {
            self.temperature = temperature;
        }
        if let Some(humidity) = update.humidity {
            self.humidity = humidity;
        }
        if let Some(message) = &update.status_message {
            self.status_message.clone_from(message);
        }
        if let Some(locator) = &update.stream_locator {
            self.stream_locator.clone_from(locator);
        }
        self.updated_at = Some(Utc::now());
        true
    }
}

/// One inbound telemetry message, reduced to the fields it actually carried
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryUpdate {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub status_message: Option<String>,
    pub stream_locator: Option<String>,
}

impl TelemetryUpdate {
    /// Decode a device payload leniently.
    ///
    /// Readings count only when they are JSON numbers, and text fields only
    /// when they are non-empty strings. Both `aiMessage`/`statusMessage` and
    /// `streamUrl`/`image` spellings are accepted.
    pub fn from_value(value: &Value) -> Self {
        let number = |key: &str| value.get(key).and_then(Value::as_f64);
        let text = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| value.get(*key).and_then(Value::as_str))
                .find(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            temperature: number("temperature"),
            humidity: number("humidity"),
            status_message: text(&["aiMessage", "statusMessage"]),
            stream_locator: text(&["streamUrl", "image"]),
        }
    }

    /// Wrap a raw JPEG frame as an inline `data:` locator.
    pub fn jpeg_frame(bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            stream_locator: Some(format!("data:image/jpeg;base64,{}", encoded)),
            ..Default::default()
        }
    }

    /// Update carrying only a stream locator.
    pub fn stream(locator: impl Into<String>) -> Self {
        Self {
            stream_locator: Some(locator.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.humidity.is_none()
            && self.status_message.is_none()
            && self.stream_locator.is_none()
    }
}
