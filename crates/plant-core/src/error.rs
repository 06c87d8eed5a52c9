//! Plant Monitor Error Types
//!
//! One error type for registry, control and telemetry operations.

use serde::{Deserialize, Serialize};

/// Result type alias for plant monitor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Plant Monitor Error Types
///
/// Every failure in the core is local and recoverable by retrying the user
/// action. Errors are serializable so they can cross the Tauri IPC boundary
/// and be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", content = "message")]
pub enum Error {
    /// A device with this id is already registered
    #[error("Device id already registered: {0}")]
    DuplicateId(String),

    /// Persistent storage could not be written
    #[error("Storage error: {0}")]
    Storage(String),

    /// No device registered under this id
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Telemetry session gave up reconnecting
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Device server rejected a control command
    #[error("Command failed: {0}")]
    Command(String),

    /// Transport-level failure (refused, reset, DNS)
    #[error("Network error: {0}")]
    Network(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Invalid input parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed telemetry frame or handshake
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a storage error with context
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Create a network error with context
    pub fn network(msg: impl Into<String>) -> Self {
        Error::Network(msg.into())
    }

    /// Create a protocol error with context
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Create an invalid-input error with context
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Check if retrying the same action may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout(_) | Error::ConnectionFailed(_)
        )
    }

    /// Get the error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Error::DuplicateId(_) => "PLANT_DUPLICATE_ID",
            Error::Storage(_) => "PLANT_STORAGE",
            Error::DeviceNotFound(_) => "PLANT_DEVICE_NOT_FOUND",
            Error::ConnectionFailed(_) => "PLANT_CONNECTION_FAILED",
            Error::Command(_) => "PLANT_COMMAND",
            Error::Network(_) => "PLANT_NETWORK",
            Error::Timeout(_) => "PLANT_TIMEOUT",
            Error::InvalidInput(_) => "PLANT_INVALID_INPUT",
            Error::Protocol(_) => "PLANT_PROTOCOL",
            Error::Serialization(_) => "PLANT_SERIALIZATION",
            Error::Config(_) => "PLANT_CONFIG",
        }
    }
}

// Convert from various error types

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else if e.is_connect() {
            Error::Network(format!("Connection failed: {}", e))
        } else if e.is_decode() {
            Error::Serialization(e.to_string())
        } else {
            Error::Network(e.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Network(format!("WebSocket: {}", e))
    }
}

impl From<rumqttc::ClientError> for Error {
    fn from(e: rumqttc::ClientError) -> Self {
        Error::Network(format!("MQTT: {}", e))
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidInput(format!("Invalid URL: {}", e))
    }
}
