//! # Plant Core
//!
//! **Client core for networked plant-care devices**
//!
//! Each device runs a small server exposing live sensor readings, a camera
//! stream and a few actuators. This crate keeps the list of known devices,
//! streams telemetry from the one being viewed and sends control commands.
//!
//! ## Features
//!
//! - **Device Registry**: durable, insertion-ordered device list in one key-value entry
//! - **Telemetry Session**: Socket.IO readings with bounded reconnects and merge-on-update snapshots
//! - **Camera Frames**: optional MQTT subscription delivering inline JPEG frames
//! - **Control**: watering interval, light and moisture commands over HTTP
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plant_core::core::{transport, DeviceRegistry, SqliteStore, TelemetrySession};
//! use plant_core::PlantConfig;
//!
//! # async fn run() -> plant_core::Result<()> {
//! let config = PlantConfig::default();
//! let store = SqliteStore::open(std::path::Path::new("plants.db"))?;
//! let registry = DeviceRegistry::new(store, config.registry_key.clone());
//!
//! let mut session = TelemetrySession::new(
//!     transport::from_config(&config),
//!     config.reconnect_policy(),
//! );
//! if let Some(device) = registry.get("101") {
//!     session.open(device.address(config.default_server_port)?).await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod models;

pub use config::PlantConfig;
pub use error::{Error, Result};
