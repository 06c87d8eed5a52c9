//! Core functionality: persistence, device I/O and live telemetry.

pub mod network;
pub mod policy;
pub mod registry;
pub mod session;
pub mod storage;
pub mod transport;

pub use network::DeviceClient;
pub use policy::ReconnectPolicy;
pub use registry::DeviceRegistry;
pub use session::{SessionEvent, SessionState, TelemetrySession};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use transport::{
    CompositeTransport, MqttImageTransport, SocketIoTransport, TelemetryStream,
    TelemetryTransport,
};
