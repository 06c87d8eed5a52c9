//! Control Models
//!
//! One-shot actuator commands and the device health check payload.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Actuator setting a control command changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Seconds between waterings
    WateringInterval,
    /// Light level
    Light,
    /// Target soil moisture level
    Moisture,
}

impl CommandKind {
    /// Value of the `type` field on the wire.
    ///
    /// Device servers treat an untyped command as a watering interval.
    pub fn wire_type(&self) -> Option<&'static str> {
        match self {
            CommandKind::WateringInterval => None,
            CommandKind::Light => Some("light"),
            CommandKind::Moisture => Some("moisture"),
        }
    }

    /// Accepted values for this setting.
    pub fn range(&self) -> RangeInclusive<i64> {
        match self {
            CommandKind::WateringInterval => 1..=14,
            CommandKind::Light | CommandKind::Moisture => 0..=10,
        }
    }
}

/// A validated control command for one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCommand {
    plant_id: String,
    kind: CommandKind,
    value: i64,
}

/// Body of `POST /data`
#[derive(Debug, Serialize)]
pub struct CommandBody<'a> {
    pub plant_id: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    pub value: i64,
}

impl ControlCommand {
    pub fn new(plant_id: impl Into<String>, kind: CommandKind, value: i64) -> Result<Self> {
        let range = kind.range();
        if !range.contains(&value) {
            return Err(Error::invalid_input(format!(
                "{:?} must be between {} and {}, got {}",
                kind,
                range.start(),
                range.end(),
                value
            )));
        }
        Ok(Self {
            plant_id: plant_id.into(),
            kind,
            value,
        })
    }

    pub fn plant_id(&self) -> &str {
        &self.plant_id
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn body(&self) -> CommandBody<'_> {
        CommandBody {
            plant_id: &self.plant_id,
            kind: self.kind.wire_type(),
            value: self.value,
        }
    }
}

/// Response of `GET /ping`
///
/// Device servers answer in snake_case; the struct serializes camelCase
/// towards the frontend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResponse {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub timestamp: Option<f64>,

    #[serde(default, alias = "server_ip")]
    pub server_ip: Option<String>,

    #[serde(default, alias = "stream_url")]
    pub stream_url: Option<String>,
}
