//! # Tauri Plugin Plant
//!
//! **Plant-care device monitoring for Tauri applications**
//!
//! Wraps [`plant_core`] for a Tauri frontend: the device registry lives in
//! the app data directory, telemetry for the device on screen is pushed to
//! the webview as events, and control commands are plain invoke calls.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(tauri_plugin_plant::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
//!
//! ## JavaScript/TypeScript API
//!
//! ```typescript
//! import { invoke } from '@tauri-apps/api/core';
//! import { listen } from '@tauri-apps/api/event';
//!
//! await invoke('plugin:plant|add_device', {
//!   device: { name: 'Fern', id: '101', serverAddress: '192.168.0.5:5000',
//!             initialMoisture: '5', initialLight: '5' },
//! });
//!
//! await listen('plant://telemetry', (e) => console.log(e.payload));
//! await invoke('plugin:plant|open_telemetry', { id: '101' });
//! await invoke('plugin:plant|send_command', { id: '101', kind: 'light', value: 7 });
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

use std::path::Path;
use std::sync::Arc;

use plant_core::core::{
    transport, DeviceClient, DeviceRegistry, SessionEvent, SqliteStore, TelemetrySession,
};
use tauri::{
    plugin::{Builder, TauriPlugin},
    AppHandle, Emitter, Manager, Runtime,
};
use tokio::sync::{broadcast, Mutex, RwLock};

pub mod commands;

pub use plant_core::{models, Error, PlantConfig, Result};

/// Event name carrying [`SessionEvent`]s to the webview.
pub const TELEMETRY_EVENT: &str = "plant://telemetry";

/// Plant Plugin State
///
/// # Thread Safety
///
/// Registry writes take the write lock, so add/remove never interleave.
/// The telemetry session sits behind an async mutex because open and close
/// await the connection driver.
pub struct PlantState {
    /// Registered devices, persisted in SQLite
    pub registry: Arc<RwLock<DeviceRegistry<SqliteStore>>>,

    /// HTTP client for control commands and health checks
    pub client: Arc<DeviceClient>,

    /// Live telemetry for the device on screen
    pub session: Arc<Mutex<TelemetrySession>>,

    /// Plugin configuration
    pub config: PlantConfig,

    /// Id of the device whose telemetry is open
    pub viewed_device: Arc<RwLock<Option<String>>>,
}

impl PlantState {
    /// Create plugin state with its database under `app_dir`.
    pub fn new(app_dir: &Path, config: PlantConfig) -> Result<Self> {
        config.validate()?;

        let db_path = app_dir.join(&config.database_name);
        let store = SqliteStore::open(&db_path)?;
        let registry = DeviceRegistry::new(store, config.registry_key.clone());

        let client = DeviceClient::new(&config)?;
        let session = TelemetrySession::new(transport::from_config(&config), config.reconnect_policy());

        log::info!(
            "Plant state initialized: db={}, devices={}, image_broker={:?}",
            db_path.display(),
            registry.len(),
            config.image_broker
        );

        Ok(Self {
            registry: Arc::new(RwLock::new(registry)),
            client: Arc::new(client),
            session: Arc::new(Mutex::new(session)),
            config,
            viewed_device: Arc::new(RwLock::new(None)),
        })
    }

    pub async fn viewed_device(&self) -> Option<String> {
        self.viewed_device.read().await.clone()
    }

    pub async fn set_viewed_device(&self, id: Option<String>) {
        *self.viewed_device.write().await = id;
    }

    /// Look up a registered device or fail with [`Error::DeviceNotFound`].
    pub async fn device(&self, id: &str) -> Result<models::DeviceRecord> {
        self.registry
            .read()
            .await
            .get(id)
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))
    }
}

/// Relay session events to the webview until the session goes away.
async fn forward_events<R: Runtime>(app: AppHandle<R>, mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Err(e) = app.emit(TELEMETRY_EVENT, &event) {
                    log::warn!("Failed to emit telemetry event: {}", e);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("Telemetry forwarder lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn setup<R: Runtime>(app: &AppHandle<R>, config: PlantConfig) -> Result<()> {
    if config.debug {
        log::debug!("Plant plugin config: {:?}", config);
    }

    let app_dir = app.path().app_data_dir().map_err(|e| {
        log::error!("Failed to get app data dir: {}", e);
        Error::Storage(format!("Failed to get app data dir: {}", e))
    })?;

    let state = PlantState::new(&app_dir, config)?;

    // Nothing else can hold the session yet.
    let events = state
        .session
        .try_lock()
        .map(|session| session.subscribe())
        .map_err(|e| Error::Config(format!("telemetry session busy during setup: {}", e)))?;
    tauri::async_runtime::spawn(forward_events(app.clone(), events));

    app.manage(state);
    Ok(())
}

macro_rules! plant_handlers {
    () => {
        tauri::generate_handler![
            // Device registry
            commands::devices::list_devices,
            commands::devices::get_device,
            commands::devices::add_device,
            commands::devices::remove_device,
            // Telemetry
            commands::telemetry::open_telemetry,
            commands::telemetry::close_telemetry,
            commands::telemetry::get_telemetry,
            commands::telemetry::get_session_state,
            // Control
            commands::control::send_command,
            commands::control::ping_device,
        ]
    };
}

/// Initialize the plant plugin.
///
/// Configuration is read from `plugins.plant` in `tauri.conf.json`; missing
/// or invalid entries fall back to [`PlantConfig::default`].
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::<R, ()>::new("plant")
        .invoke_handler(plant_handlers!())
        .setup(|app, _api| {
            let config = app
                .config()
                .plugins
                .0
                .get("plant")
                .and_then(|v| serde_json::from_value::<PlantConfig>(v.clone()).ok())
                .unwrap_or_default();

            setup(app, config)?;
            log::info!("Plant plugin initialized");
            Ok(())
        })
        .build()
}

/// Builder for custom plugin configuration.
///
/// # Example
///
/// ```rust,no_run
/// fn main() {
///     tauri::Builder::default()
///         .plugin(
///             tauri_plugin_plant::PlantBuilder::new()
///                 .default_server_port(8080)
///                 .reconnect(3, 2000)
///                 .image_broker("192.168.0.5:1883")
///                 .build()
///         )
///         .run(tauri::generate_context!())
///         .expect("error while running tauri application");
/// }
/// ```
pub struct PlantBuilder {
    config: PlantConfig,
}

impl PlantBuilder {
    pub fn new() -> Self {
        Self {
            config: PlantConfig::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: PlantConfig) -> Self {
        self.config = config;
        self
    }

    /// Port used when a stored server address has none.
    pub fn default_server_port(mut self, port: u16) -> Self {
        self.config.default_server_port = port;
        self
    }

    /// Reconnect attempts and the fixed delay between them.
    pub fn reconnect(mut self, attempts: u32, delay_ms: u64) -> Self {
        self.config.reconnect_attempts = attempts;
        self.config.reconnect_delay_ms = delay_ms;
        self.config.reconnect_delay_max_ms = self.config.reconnect_delay_max_ms.max(delay_ms);
        self
    }

    /// Subscribe to raw camera frames on this MQTT broker.
    pub fn image_broker(mut self, broker: impl Into<String>) -> Self {
        self.config.image_broker = Some(broker.into());
        self
    }

    pub fn image_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.image_topic = topic.into();
        self
    }

    /// Control command timeout in seconds.
    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.config.request_timeout_seconds = seconds;
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    pub fn build<R: Runtime>(self) -> TauriPlugin<R> {
        let config = self.config;

        Builder::<R, ()>::new("plant")
            .invoke_handler(plant_handlers!())
            .setup(move |app, _api| {
                setup(app, config.clone())?;
                log::info!("Plant plugin initialized with custom config");
                Ok(())
            })
            .build()
    }
}

impl Default for PlantBuilder {
    fn default() -> Self {
        Self::new()
    }
}
