//! Device settings store.

mod file;

use async_trait::async_trait;

pub use self::file::FileDeviceStore;
use crate::{
    core::{
        device::{DeviceConfig, DeviceId},
        error::ConfigurationError,
    },
    prelude::*,
};

/// A device as found in the store, possibly malformed.
#[derive(Clone, Debug)]
pub struct DeviceEntry {
    pub id: DeviceId,
    pub config: Result<DeviceConfig, ConfigurationError>,
}

/// Read-only access to the device settings.
///
/// Loaded once per tick: edits take effect on the next tick.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Fails only when the store as a whole is unusable.
    async fn load(&self) -> Result<Vec<DeviceEntry>>;
}
