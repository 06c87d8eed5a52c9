//! Telemetry Commands
//!
//! One session at a time: opening a device closes whatever was on screen.
//! Readings reach the webview as `plant://telemetry` events; the getters here
//! are for views that mount after the session started.

use crate::{PlantState, Result};
use plant_core::core::SessionState;
use plant_core::models::TelemetrySnapshot;
use tauri::{command, State};

/// Start live telemetry for a registered device.
///
/// Also asks the device for its camera stream URL so the view has a locator
/// before the first telemetry message. That lookup is best-effort.
#[command]
pub async fn open_telemetry(state: State<'_, PlantState>, id: String) -> Result<SessionState> {
    let record = state.device(&id).await?;
    let address = record.address(state.config.default_server_port)?;

    {
        let mut session = state.session.lock().await;
        session.open(address.clone()).await;
    }
    state.set_viewed_device(Some(id.clone())).await;

    match state.client.ping(&address).await {
        Ok(ping) => {
            if let Some(url) = ping.stream_url.filter(|url| !url.is_empty()) {
                let session = state.session.lock().await;
                if session.address() == Some(&address) {
                    session.seed_stream_locator(&url);
                }
            }
        }
        Err(e) => log::debug!("No stream URL from {}: {}", address, e),
    }

    let state_now = state.session.lock().await.state();
    Ok(state_now)
}

/// Stop live telemetry. Safe to call when nothing is open.
#[command]
pub async fn close_telemetry(state: State<'_, PlantState>) -> Result<()> {
    state.session.lock().await.close().await;
    state.set_viewed_device(None).await;
    Ok(())
}

#[command]
pub async fn get_telemetry(state: State<'_, PlantState>) -> Result<TelemetrySnapshot> {
    Ok(state.session.lock().await.snapshot())
}

#[command]
pub async fn get_session_state(state: State<'_, PlantState>) -> Result<SessionState> {
    Ok(state.session.lock().await.state())
}
