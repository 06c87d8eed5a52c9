//! Control Commands
//!
//! One-shot requests to a device server. Failures are returned to the caller
//! as-is and never retried.

use crate::{
    models::{CommandKind, ControlCommand, PingResponse},
    PlantState, Result,
};
use tauri::{command, State};

/// Send an actuator command to a registered device.
///
/// `kind` is `"light"`, `"moisture"` or `"watering_interval"`.
#[command]
pub async fn send_command(
    state: State<'_, PlantState>,
    id: String,
    kind: CommandKind,
    value: i64,
) -> Result<()> {
    let record = state.device(&id).await?;
    let address = record.address(state.config.default_server_port)?;
    let command = ControlCommand::new(record.id, kind, value)?;

    state.client.send_command(&address, &command).await.map_err(|e| {
        log::warn!("Command {:?}={} to {} failed: {}", kind, value, address, e);
        e
    })
}

/// Health check a registered device.
///
/// When the device is the one on screen, its stream URL seeds the camera
/// locator.
#[command]
pub async fn ping_device(state: State<'_, PlantState>, id: String) -> Result<PingResponse> {
    let record = state.device(&id).await?;
    let address = record.address(state.config.default_server_port)?;
    let ping = state.client.ping(&address).await?;

    if state.viewed_device().await.as_deref() == Some(id.as_str()) {
        if let Some(url) = ping.stream_url.as_deref() {
            state.session.lock().await.seed_stream_locator(url);
        }
    }

    Ok(ping)
}
