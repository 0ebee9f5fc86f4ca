//! Defines shared data structures for the Bluetooth module.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Power state of the local radio as reported by the link layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RadioState {
    Unknown,
    RadioOff,
    RadioOn,
}

/// Opaque reference to a physical peripheral
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PeripheralHandle {
    /// Platform-specific stable identifier
    pub id: String,
    /// Human-readable name, if the peripheral exposes one
    pub name: Option<String>,
}

impl PeripheralHandle {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }
}

/// A peripheral seen advertising under the target name
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredDevice {
    pub handle: PeripheralHandle,
    /// The advertised name that passed the filter
    pub name: String,
    /// Signal strength of the first sighting
    pub rssi: i16,
    /// When the peripheral was last heard from
    pub last_seen: DateTime<Utc>,
}

impl DiscoveredDevice {
    pub fn new(handle: PeripheralHandle, name: String, rssi: i16) -> Self {
        Self {
            handle,
            name,
            rssi,
            last_seen: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.handle.id
    }
}

/// One row of the consumer-facing device list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub id: String,
    pub display_name: String,
    pub rssi: i16,
    pub connected: bool,
}

/// Ordered device list handed to observers, strongest signal first
pub type RegistrySnapshot = Vec<DeviceSummary>;

/// The audio service/characteristic pair resolved on a connection.
/// Discarded when the connection goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceBinding {
    pub service_id: Uuid,
    pub characteristic_id: Uuid,
    pub notify_enabled: bool,
}
