//! MQTT camera frame transport.
//!
//! The device camera publishes raw JPEG frames to a topic. Each frame becomes
//! an update carrying only an inline `data:image/jpeg;base64,` stream locator.

use super::{TelemetryStream, TelemetryTransport};
use crate::config::PlantConfig;
use crate::error::{Error, Result};
use crate::models::{ServerAddress, TelemetryUpdate};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::time::timeout;

pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Subscribes to raw camera frames over MQTT
pub struct MqttImageTransport {
    broker: Option<String>,
    topic: String,
    connect_timeout: Duration,
}

impl MqttImageTransport {
    /// `broker` is `host[:port]`; when `None` the device server host is used
    /// on the standard MQTT port.
    pub fn new(broker: Option<String>, topic: impl Into<String>) -> Self {
        Self {
            broker,
            topic: topic.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(config: &PlantConfig) -> Self {
        let mut transport = Self::new(config.image_broker.clone(), config.image_topic.clone());
        transport.connect_timeout = config.request_timeout();
        transport
    }

    fn broker_for(&self, address: &ServerAddress) -> Result<ServerAddress> {
        match &self.broker {
            Some(broker) => ServerAddress::parse(broker, DEFAULT_MQTT_PORT),
            None => ServerAddress::parse(address.host(), DEFAULT_MQTT_PORT),
        }
    }
}

#[async_trait]
impl TelemetryTransport for MqttImageTransport {
    async fn connect(&self, address: &ServerAddress) -> Result<Box<dyn TelemetryStream>> {
        let broker = self.broker_for(address)?;
        let client_id = format!("plant_monitor_{}", uuid::Uuid::new_v4().simple());

        let mut options = MqttOptions::new(client_id, broker.host(), broker.port());
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        client.subscribe(self.topic.clone(), QoS::AtMostOnce).await?;

        let connack = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => {}
                    Err(e) => return Err(Error::network(format!("MQTT {}: {}", broker, e))),
                }
            }
        };
        timeout(self.connect_timeout, connack)
            .await
            .map_err(|_| Error::Timeout(format!("MQTT connect to {}", broker)))??;

        tracing::info!(%broker, topic = %self.topic, "camera frames subscribed");
        Ok(Box::new(MqttImageStream {
            client,
            eventloop,
            topic: self.topic.clone(),
            closed: false,
        }))
    }
}

struct MqttImageStream {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    closed: bool,
}

#[async_trait]
impl TelemetryStream for MqttImageStream {
    async fn next_update(&mut self) -> Option<Result<TelemetryUpdate>> {
        if self.closed {
            return None;
        }

        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == self.topic => {
                    if publish.payload.is_empty() {
                        continue;
                    }
                    return Some(Ok(TelemetryUpdate::jpeg_frame(&publish.payload)));
                }
                Ok(Event::Incoming(Packet::Disconnect)) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(Error::network(format!("MQTT: {}", e)))),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.client.disconnect().await {
            tracing::debug!(error = %e, "MQTT disconnect");
            return;
        }
        // Flush the queued DISCONNECT.
        let _ = timeout(Duration::from_millis(500), self.eventloop.poll()).await;
    }
}
