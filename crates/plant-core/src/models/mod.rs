//! Plant Monitor Data Models
//!
//! All data structures shared by the registry, the control client and the
//! telemetry session.

pub mod control;
pub mod device;
pub mod telemetry;

pub use control::*;
pub use device::*;
pub use telemetry::*;
