use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::bluetooth::constants::{TARGET_DEVICE_NAME, UUID_AUDIO_DATA_CHAR, UUID_AUDIO_SERVICE};
use crate::core::bluetooth::tracker::ConnectionPolicy;

/// Which peripheral to stream from and how to talk to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// Advertised name a peripheral must carry, compared case-sensitively
    pub target_name: String,
    /// GATT service exposing the audio stream
    pub service_uuid: Uuid,
    /// Notify characteristic carrying audio packets
    pub characteristic_uuid: Uuid,
    /// Whether connection membership waits for link confirmation
    pub connection_policy: ConnectionPolicy,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        BluetoothConfig {
            target_name: TARGET_DEVICE_NAME.to_string(),
            service_uuid: UUID_AUDIO_SERVICE,
            characteristic_uuid: UUID_AUDIO_DATA_CHAR,
            connection_policy: ConnectionPolicy::Optimistic,
        }
    }
}
