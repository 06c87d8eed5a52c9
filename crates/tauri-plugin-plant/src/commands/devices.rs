//! Device Registry Commands

use crate::{
    models::{DeviceRecord, NewDevice},
    PlantState, Result,
};
use tauri::{command, State};

/// All registered devices in the order they were added.
#[command]
pub async fn list_devices(state: State<'_, PlantState>) -> Result<Vec<DeviceRecord>> {
    Ok(state.registry.read().await.list())
}

#[command]
pub async fn get_device(state: State<'_, PlantState>, id: String) -> Result<Option<DeviceRecord>> {
    Ok(state.registry.read().await.get(&id))
}

/// Validate the add-device form and register the device.
///
/// Fails with `InvalidInput` for a bad form and `DuplicateId` when the id is
/// already registered.
#[command]
pub async fn add_device(state: State<'_, PlantState>, device: NewDevice) -> Result<DeviceRecord> {
    let record = device.validate()?;
    state.registry.write().await.add(record.clone())?;
    Ok(record)
}

/// Remove a device. Closes its telemetry session if it is the one on screen.
#[command]
pub async fn remove_device(state: State<'_, PlantState>, id: String) -> Result<()> {
    state.registry.write().await.remove(&id)?;

    if state.viewed_device().await.as_deref() == Some(id.as_str()) {
        log::info!("Closing telemetry for removed device {}", id);
        state.session.lock().await.close().await;
        state.set_viewed_device(None).await;
    }

    Ok(())
}
