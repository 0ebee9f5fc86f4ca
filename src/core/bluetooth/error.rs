//! Errors raised at the link-layer seam.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BluetoothError {
    #[error("No Bluetooth adapter found")]
    AdapterNotFound,

    #[error("Device not found with ID: {0}")]
    DeviceNotFound(String),

    #[error("Service {service} not discovered on device {device_id}")]
    ServiceNotFound { device_id: String, service: Uuid },

    #[error("Characteristic {characteristic} not discovered on device {device_id}")]
    CharacteristicNotFound {
        device_id: String,
        characteristic: Uuid,
    },

    #[error("GATT discovery failed: {0}")]
    Discovery(String),

    #[error("Notification subscription failed: {0}")]
    Subscription(String),

    #[cfg(feature = "bluetooth-backend")]
    #[error(transparent)]
    Bluest(#[from] bluest::Error),
}

pub type BluetoothResult<T> = std::result::Result<T, BluetoothError>;
