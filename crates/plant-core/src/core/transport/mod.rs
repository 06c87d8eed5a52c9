//! Telemetry Transports
//!
//! A transport opens a live stream of [`TelemetryUpdate`]s from one device
//! server. The session owns reconnection; transports only connect once and
//! report how the stream ended.

use crate::config::PlantConfig;
use crate::error::Result;
use crate::models::{ServerAddress, TelemetryUpdate};
use async_trait::async_trait;
use std::sync::Arc;

pub mod mqtt;
pub mod socketio;

pub use mqtt::MqttImageTransport;
pub use socketio::SocketIoTransport;

/// Socket.IO readings, plus MQTT camera frames when a broker is configured.
pub fn from_config(config: &PlantConfig) -> Arc<dyn TelemetryTransport> {
    let readings: Arc<dyn TelemetryTransport> = Arc::new(SocketIoTransport::from_config(config));
    if config.image_broker.is_none() {
        return readings;
    }
    Arc::new(CompositeTransport::new(
        readings,
        Arc::new(MqttImageTransport::from_config(config)),
    ))
}

/// Opens telemetry streams
#[async_trait]
pub trait TelemetryTransport: Send + Sync {
    /// Connect to the device server at `address`.
    async fn connect(&self, address: &ServerAddress) -> Result<Box<dyn TelemetryStream>>;
}

/// A connected telemetry stream
#[async_trait]
pub trait TelemetryStream: Send {
    /// Next update in arrival order.
    ///
    /// `None` means the peer closed the stream; `Some(Err(_))` is a transport
    /// failure. Both end the stream.
    async fn next_update(&mut self) -> Option<Result<TelemetryUpdate>>;

    /// Release the connection. Safe to call more than once.
    async fn close(&mut self);
}

/// Readings from one transport plus camera frames from another
///
/// The primary stream must connect. The secondary is best-effort: when it
/// fails to connect or drops, the session keeps running on the primary alone.
pub struct CompositeTransport {
    primary: Arc<dyn TelemetryTransport>,
    secondary: Arc<dyn TelemetryTransport>,
}

impl CompositeTransport {
    pub fn new(primary: Arc<dyn TelemetryTransport>, secondary: Arc<dyn TelemetryTransport>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl TelemetryTransport for CompositeTransport {
    async fn connect(&self, address: &ServerAddress) -> Result<Box<dyn TelemetryStream>> {
        let primary = self.primary.connect(address).await?;
        let secondary = match self.secondary.connect(address).await {
            Ok(stream) => Some(stream),
            Err(e) => {
                tracing::warn!(%address, error = %e, "secondary telemetry channel unavailable");
                None
            }
        };
        Ok(Box::new(CompositeStream { primary, secondary }))
    }
}

struct CompositeStream {
    primary: Box<dyn TelemetryStream>,
    secondary: Option<Box<dyn TelemetryStream>>,
}

enum Next {
    Primary(Option<Result<TelemetryUpdate>>),
    Secondary(Option<Result<TelemetryUpdate>>),
}

#[async_trait]
impl TelemetryStream for CompositeStream {
    async fn next_update(&mut self) -> Option<Result<TelemetryUpdate>> {
        loop {
            let next = match self.secondary.as_mut() {
                Some(secondary) => tokio::select! {
                    item = self.primary.next_update() => Next::Primary(item),
                    item = secondary.next_update() => Next::Secondary(item),
                },
                None => Next::Primary(self.primary.next_update().await),
            };

            match next {
                Next::Primary(item) => return item,
                Next::Secondary(Some(Ok(update))) => return Some(Ok(update)),
                Next::Secondary(ended) => {
                    if let Some(Err(e)) = ended {
                        tracing::warn!(error = %e, "secondary telemetry channel failed");
                    }
                    if let Some(mut secondary) = self.secondary.take() {
                        secondary.close().await;
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut secondary) = self.secondary.take() {
            secondary.close().await;
        }
        self.primary.close().await;
    }
}
