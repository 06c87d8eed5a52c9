//! Socket.IO Telemetry Transport
//!
//! Speaks just enough Engine.IO v4 / Socket.IO v5 over a plain websocket to
//! receive events on the default namespace:
//!
//! ```text
//! server  0{"sid":..,"pingInterval":25000,"pingTimeout":20000}   engine open
//! client  40                                                     namespace connect
//! server  40{"sid":..}                                           connected
//! server  2            client  3                                 heartbeat
//! server  42["plant_data",{"temperature":21.5,...}]              event
//! client  41                                                     disconnect
//! ```
//!
//! Polling transports, binary attachments and acknowledgements are not
//! supported.

use super::{TelemetryStream, TelemetryTransport};
use crate::config::PlantConfig;
use crate::error::{Error, Result};
use crate::models::{ServerAddress, TelemetryUpdate};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Engine.IO v4 + Socket.IO packet on the default namespace
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// `0{...}` engine handshake
    Open(Handshake),
    /// `1` engine close
    Close,
    /// `2` server heartbeat
    Ping,
    /// `3`
    Pong,
    /// `6`
    Noop,
    /// `40[{...}]` namespace connected
    Connected,
    /// `41` namespace disconnect
    Disconnect,
    /// `42[name, data]`
    Event { name: String, data: Value },
    /// `44{...}` namespace connect refused
    ConnectError(String),
}

/// Engine handshake parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

fn default_ping_interval() -> u64 {
    25_000
}

fn default_ping_timeout() -> u64 {
    20_000
}

impl Handshake {
    /// Longest silence tolerated before the connection counts as dead.
    pub fn heartbeat_window(&self) -> Duration {
        Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

impl Packet {
    /// Decode one websocket text frame.
    pub fn decode(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let engine = chars
            .next()
            .ok_or_else(|| Error::protocol("empty engine.io frame"))?;
        let rest = chars.as_str();

        match engine {
            '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '6' => Ok(Packet::Noop),
            '4' => Self::decode_message(rest),
            other => Err(Error::protocol(format!(
                "unknown engine.io packet type {:?}",
                other
            ))),
        }
    }

    fn decode_message(body: &str) -> Result<Self> {
        let mut chars = body.chars();
        let kind = chars
            .next()
            .ok_or_else(|| Error::protocol("empty socket.io packet"))?;
        let payload = chars.as_str();

        if payload.starts_with('/') {
            return Err(Error::protocol("non-default namespaces are not supported"));
        }

        match kind {
            '0' => Ok(Packet::Connected),
            '1' => Ok(Packet::Disconnect),
            '2' => {
                // An ack id may precede the array.
                let json = payload.trim_start_matches(|c: char| c.is_ascii_digit());
                let mut items = match serde_json::from_str::<Value>(json)? {
                    Value::Array(items) => items.into_iter(),
                    _ => return Err(Error::protocol("socket.io event is not an array")),
                };
                let name = match items.next() {
                    Some(Value::String(name)) => name,
                    _ => return Err(Error::protocol("socket.io event has no name")),
                };
                Ok(Packet::Event {
                    name,
                    data: items.next().unwrap_or(Value::Null),
                })
            }
            '4' => {
                let reason = serde_json::from_str::<Value>(payload)
                    .ok()
                    .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_else(|| payload.to_string());
                Ok(Packet::ConnectError(reason))
            }
            other => Err(Error::protocol(format!(
                "unsupported socket.io packet type {:?}",
                other
            ))),
        }
    }
}

/// Socket.IO client receiving one telemetry event
pub struct SocketIoTransport {
    event: String,
    handshake_timeout: Duration,
}

impl SocketIoTransport {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            handshake_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(config: &PlantConfig) -> Self {
        Self::new(config.telemetry_event.clone()).with_handshake_timeout(config.request_timeout())
    }

    /// Bound on connecting plus the namespace handshake
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    async fn handshake(&self, address: &ServerAddress) -> Result<SocketIoStream> {
        let (mut ws, _response) = tokio_tungstenite::connect_async(address.socket_io_url()).await?;

        let open = match next_packet(&mut ws).await? {
            Packet::Open(open) => open,
            other => {
                return Err(Error::protocol(format!(
                    "expected engine.io open, got {:?}",
                    other
                )))
            }
        };
        tracing::debug!(%address, sid = %open.sid, "engine.io session opened");

        ws.send(Message::Text("40".into())).await?;

        loop {
            match next_packet(&mut ws).await? {
                Packet::Connected => break,
                Packet::Ping => ws.send(Message::Text("3".into())).await?,
                Packet::ConnectError(reason) => {
                    return Err(Error::ConnectionFailed(format!(
                        "{} refused namespace connect: {}",
                        address, reason
                    )))
                }
                Packet::Close | Packet::Disconnect => {
                    return Err(Error::network(format!("{} closed during handshake", address)))
                }
                _ => {}
            }
        }

        Ok(SocketIoStream {
            ws,
            event: self.event.clone(),
            heartbeat: open.heartbeat_window(),
            closed: false,
        })
    }
}

#[async_trait]
impl TelemetryTransport for SocketIoTransport {
    async fn connect(&self, address: &ServerAddress) -> Result<Box<dyn TelemetryStream>> {
        let stream = timeout(self.handshake_timeout, self.handshake(address))
            .await
            .map_err(|_| Error::Timeout(format!("socket.io handshake with {}", address)))??;

        tracing::info!(%address, event = %self.event, "telemetry connected");
        Ok(Box::new(stream))
    }
}

/// Read frames until one decodes into a packet.
async fn next_packet(ws: &mut Socket) -> Result<Packet> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Packet::decode(&text),
            Some(Ok(Message::Close(_))) | None => {
                return Err(Error::network("websocket closed during handshake"))
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

struct SocketIoStream {
    ws: Socket,
    event: String,
    heartbeat: Duration,
    closed: bool,
}

#[async_trait]
impl TelemetryStream for SocketIoStream {
    async fn next_update(&mut self) -> Option<Result<TelemetryUpdate>> {
        if self.closed {
            return None;
        }

        loop {
            let message = match timeout(self.heartbeat, self.ws.next()).await {
                Err(_) => return Some(Err(Error::Timeout("socket.io heartbeat missed".into()))),
                Ok(None) | Ok(Some(Ok(Message::Close(_)))) => return None,
                Ok(Some(Err(e))) => return Some(Err(e.into())),
                Ok(Some(Ok(message))) => message,
            };

            let text = match message {
                Message::Text(text) => text,
                _ => continue,
            };

            match Packet::decode(&text) {
                Ok(Packet::Ping) => {
                    if let Err(e) = self.ws.send(Message::Text("3".into())).await {
                        return Some(Err(e.into()));
                    }
                }
                Ok(Packet::Event { name, data }) if name == self.event => {
                    let update = TelemetryUpdate::from_value(&data);
                    if !update.is_empty() {
                        return Some(Ok(update));
                    }
                }
                Ok(Packet::Close) | Ok(Packet::Disconnect) => return None,
                Ok(packet) => tracing::trace!(?packet, "ignoring socket.io packet"),
                Err(e) => tracing::debug!(error = %e, frame = %text, "dropping malformed frame"),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let _ = self.ws.send(Message::Text("41".into())).await;
        if let Err(e) = self.ws.close(None).await {
            tracing::debug!(error = %e, "websocket close");
        }
    }
}
