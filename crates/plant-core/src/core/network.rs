//! Device Client
//!
//! HTTP client for one-shot requests to a device server: control commands
//! and the health check. Nothing here retries; a failure is reported to the
//! caller once.

use crate::config::PlantConfig;
use crate::error::{Error, Result};
use crate::models::*;
use reqwest::Client;
use std::time::Duration;

/// HTTP client for device servers
pub struct DeviceClient {
    client: Client,
    request_timeout: Duration,
    ping_timeout: Duration,
}

impl DeviceClient {
    /// Create a new client with the timeouts from `config`.
    pub fn new(config: &PlantConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            request_timeout: config.request_timeout(),
            ping_timeout: config.ping_timeout(),
        })
    }

    /// Override the control command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    // ==================== Control ====================

    /// Send a control command with `POST /data`.
    ///
    /// Any 2xx status is success. Other statuses become [`Error::Command`].
    pub async fn send_command(
        &self,
        address: &ServerAddress,
        command: &ControlCommand,
    ) -> Result<()> {
        let url = address.http_url("/data")?;

        tracing::info!(
            %address,
            device_id = command.plant_id(),
            kind = ?command.kind(),
            value = command.value(),
            "sending control command"
        );

        let response = self
            .client
            .post(url)
            .json(&command.body())
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let error: serde_json::Value = response.json().await.unwrap_or_default();
        let reason = error
            .get("message")
            .or_else(|| error.get("error"))
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
            .to_string();

        tracing::warn!(%address, status = status.as_u16(), %reason, "control command rejected");
        Err(Error::Command(format!("status {}: {}", status.as_u16(), reason)))
    }

    // ==================== Health Check ====================

    /// Query `GET /ping`.
    pub async fn ping(&self, address: &ServerAddress) -> Result<PingResponse> {
        let url = address.http_url("/ping")?;

        let response = self
            .client
            .get(url)
            .timeout(self.ping_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "ping to {} returned status {}",
                address,
                status.as_u16()
            )));
        }

        let ping: PingResponse = response.json().await?;
        tracing::debug!(%address, stream_url = ?ping.stream_url, "device answered ping");
        Ok(ping)
    }

    /// Whether the device server answers its health check.
    pub async fn is_reachable(&self, address: &ServerAddress) -> bool {
        match self.ping(address).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(%address, error = %e, "device unreachable");
                false
            }
        }
    }
}
