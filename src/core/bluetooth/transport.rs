//! GATT transport trait
//! The manager drives the link layer only through this trait, so the bluest
//! backend can be swapped for an in-memory one in tests.

use async_trait::async_trait;
use log::{debug, warn};
use uuid::Uuid;

use crate::core::bluetooth::error::{BluetoothError, BluetoothResult};
use crate::core::bluetooth::events::{LinkEvent, LinkEventSender};
use crate::core::bluetooth::types::RadioState;

#[async_trait]
pub trait GattTransport: Send + Sync {
    /// Starts observing all advertisers (no service filter)
    async fn start_scan(&self) -> BluetoothResult<()>;

    async fn stop_scan(&self) -> BluetoothResult<()>;

    /// Fire-and-forget. Success is reported later as `LinkEvent::Connected`.
    fn request_connect(&self, device_id: &str);

    /// Fire-and-forget. No confirmation is awaited.
    fn request_disconnect(&self, device_id: &str);

    async fn discover_services(&self, device_id: &str) -> BluetoothResult<Vec<Uuid>>;

    async fn discover_characteristics(
        &self,
        device_id: &str,
        service: Uuid,
    ) -> BluetoothResult<Vec<Uuid>>;

    /// Subscribes to value changes; values arrive as `LinkEvent::Notification`.
    async fn enable_notifications(
        &self,
        device_id: &str,
        service: Uuid,
        characteristic: Uuid,
    ) -> BluetoothResult<()>;
}

/// Stand-in used when no Bluetooth adapter can be opened. The radio is
/// reported off once and every GATT call fails with `AdapterNotFound`, so
/// the rest of the bridge keeps running.
pub struct UnavailableTransport;

impl UnavailableTransport {
    pub fn new(events: LinkEventSender) -> Self {
        warn!("Bluetooth is not available.");
        if events
            .send(LinkEvent::RadioStateChanged(RadioState::RadioOff))
            .is_err()
        {
            debug!("Event loop closed before the radio state was reported");
        }
        Self
    }
}

#[async_trait]
impl GattTransport for UnavailableTransport {
    async fn start_scan(&self) -> BluetoothResult<()> {
        Err(BluetoothError::AdapterNotFound)
    }

    async fn stop_scan(&self) -> BluetoothResult<()> {
        Ok(())
    }

    fn request_connect(&self, device_id: &str) {
        warn!("Cannot connect to {}: no Bluetooth adapter", device_id);
    }

    fn request_disconnect(&self, _device_id: &str) {}

    async fn discover_services(&self, _device_id: &str) -> BluetoothResult<Vec<Uuid>> {
        Err(BluetoothError::AdapterNotFound)
    }

    async fn discover_characteristics(
        &self,
        _device_id: &str,
        _service: Uuid,
    ) -> BluetoothResult<Vec<Uuid>> {
        Err(BluetoothError::AdapterNotFound)
    }

    async fn enable_notifications(
        &self,
        _device_id: &str,
        _service: Uuid,
        _characteristic: Uuid,
    ) -> BluetoothResult<()> {
        Err(BluetoothError::AdapterNotFound)
    }
}
