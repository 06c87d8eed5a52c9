//! Plant Monitor Configuration
//!
//! Configuration options loadable from `tauri.conf.json` or set
//! programmatically through the plugin builder.

use crate::core::ReconnectPolicy;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Plant Monitor Configuration
///
/// # Configuration in tauri.conf.json
///
/// ```json
/// {
///   "plugins": {
///     "plant": {
///       "defaultServerPort": 5000,
///       "reconnectAttempts": 5,
///       "reconnectDelayMs": 1000,
///       "imageBroker": "192.168.0.5:1883"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantConfig {
    /// SQLite file name inside the app data directory.
    ///
    /// Default: `"plants.db"`
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Storage key holding the serialized device list.
    ///
    /// Default: `"@SmartPlantApp:plants"`
    #[serde(default = "default_registry_key")]
    pub registry_key: String,

    /// Port used when a device server address has none.
    ///
    /// Default: `5000`
    #[serde(default = "default_server_port")]
    pub default_server_port: u16,

    /// Control command timeout in seconds.
    ///
    /// Default: `10`
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Health check timeout in seconds.
    ///
    /// Default: `5`
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,

    /// Socket.IO event name carrying sensor readings.
    ///
    /// Default: `"plant_data"`
    #[serde(default = "default_telemetry_event")]
    pub telemetry_event: String,

    /// Reconnect attempts after the first failed connect.
    ///
    /// Default: `5`
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,

    /// Delay before the first reconnect attempt, in milliseconds.
    ///
    /// Default: `1000`
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    /// Upper bound for the reconnect delay, in milliseconds.
    ///
    /// Default: `5000`
    #[serde(default = "default_reconnect_delay_max")]
    pub reconnect_delay_max_ms: u64,

    /// Growth factor between reconnect delays. `1.0` keeps the delay fixed.
    ///
    /// Default: `1.0`
    #[serde(default = "default_reconnect_multiplier")]
    pub reconnect_multiplier: f64,

    /// MQTT broker (`host[:port]`) publishing raw camera frames.
    ///
    /// Default: `None` (camera frames come only from the stream URL)
    #[serde(default)]
    pub image_broker: Option<String>,

    /// MQTT topic with raw JPEG frames.
    ///
    /// Default: `"plant/image"`
    #[serde(default = "default_image_topic")]
    pub image_topic: String,

    /// Log the resolved configuration at debug level when the plugin starts.
    ///
    /// Default: `false`
    #[serde(default)]
    pub debug: bool,
}

fn default_database_name() -> String {
    "plants.db".to_string()
}

fn default_registry_key() -> String {
    "@SmartPlantApp:plants".to_string()
}

fn default_server_port() -> u16 {
    5000
}

fn default_request_timeout() -> u64 {
    10
}

fn default_ping_timeout() -> u64 {
    5
}

fn default_telemetry_event() -> String {
    "plant_data".to_string()
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay() -> u64 {
    1000
}

fn default_reconnect_delay_max() -> u64 {
    5000
}

fn default_reconnect_multiplier() -> f64 {
    1.0
}

fn default_image_topic() -> String {
    "plant/image".to_string()
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            database_name: default_database_name(),
            registry_key: default_registry_key(),
            default_server_port: default_server_port(),
            request_timeout_seconds: default_request_timeout(),
            ping_timeout_seconds: default_ping_timeout(),
            telemetry_event: default_telemetry_event(),
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay(),
            reconnect_delay_max_ms: default_reconnect_delay_max(),
            reconnect_multiplier: default_reconnect_multiplier(),
            image_broker: None,
            image_topic: default_image_topic(),
            debug: false,
        }
    }
}

impl PlantConfig {
    /// Create a configuration for development against a local device server.
    pub fn development() -> Self {
        Self {
            image_broker: Some("localhost:1883".to_string()),
            debug: true,
            ..Default::default()
        }
    }

    /// Timeout applied to control commands.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Timeout applied to health checks.
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_seconds)
    }

    /// Reconnect policy for telemetry sessions.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.reconnect_attempts,
            initial_delay: Duration::from_millis(self.reconnect_delay_ms),
            max_delay: Duration::from_millis(self.reconnect_delay_max_ms),
            multiplier: self.reconnect_multiplier,
        }
    }

    /// Reject values that would make requests or retries meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_seconds == 0 || self.ping_timeout_seconds == 0 {
            return Err(Error::Config("timeouts must be at least one second".into()));
        }
        if self.reconnect_multiplier.is_nan() || self.reconnect_multiplier < 1.0 {
            return Err(Error::Config(format!(
                "reconnectMultiplier must be >= 1.0, got {}",
                self.reconnect_multiplier
            )));
        }
        if self.reconnect_delay_max_ms < self.reconnect_delay_ms {
            return Err(Error::Config(
                "reconnectDelayMaxMs must not be below reconnectDelayMs".into(),
            ));
        }
        if self.registry_key.is_empty() {
            return Err(Error::Config("registryKey must not be empty".into()));
        }
        if self.telemetry_event.is_empty() {
            return Err(Error::Config("telemetryEvent must not be empty".into()));
        }
        Ok(())
    }
}
