//! Sync and device-identity commands.

use crate::device::DeviceIdentity;
use crate::state::AppState;
use crate::sync::{SyncEngine, SyncError, SyncReport, SyncStatus};
use serde::Serialize;

use super::CommandError;

#[derive(Debug, Serialize)]
pub struct DeviceStatus {
    pub device_id: String,
    pub cloud_configured: bool,
    pub sync_status: Option<SyncStatus>,
}

fn engine(state: &AppState) -> Result<&SyncEngine, CommandError> {
    state
        .sync
        .as_ref()
        .ok_or_else(|| SyncError::NotConfigured.into())
}

/// Pull, merge, and push under the current device identity.
pub async fn start_sync(state: &AppState) -> Result<SyncReport, CommandError> {
    let engine = engine(state)?;
    let device = state.device()?;
    Ok(engine.full_sync(device.as_str(), &state.store).await?)
}

pub async fn get_device_status(state: &AppState) -> Result<DeviceStatus, CommandError> {
    let device = state.device()?;
    let sync_status = match &state.sync {
        Some(engine) => Some(engine.status().await),
        None => None,
    };
    Ok(DeviceStatus {
        device_id: device.to_string(),
        cloud_configured: state.sync.is_some(),
        sync_status,
    })
}

/// Take over another device's cloud history and sync under it immediately.
///
/// Returns `None` for the report when cloud sync is not configured.
pub async fn adopt_device(
    state: &AppState,
    token: &str,
) -> Result<(DeviceIdentity, Option<SyncReport>), CommandError> {
    let device = DeviceIdentity::adopt(state.repository.as_ref(), token)?;
    let report = match &state.sync {
        Some(engine) => Some(engine.full_sync(device.as_str(), &state.store).await?),
        None => None,
    };
    Ok((device, report))
}
