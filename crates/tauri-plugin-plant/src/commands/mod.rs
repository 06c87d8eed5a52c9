//! Tauri Commands
//!
//! All commands exposed to the frontend via Tauri IPC:
//!
//! - **devices**: device registry (list, add, remove)
//! - **telemetry**: the live session for the device on screen
//! - **control**: actuator commands and health checks

pub mod control;
pub mod devices;
pub mod telemetry;
