//! Bluetooth connection handling for the audio peripheral
//! This module connects to and disconnects from peripherals and walks their
//! GATT tables through bluest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bluest::{Adapter, Characteristic, ConnectionEvent, Device, Service};
use futures_util::StreamExt;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::bluetooth::error::{BluetoothError, BluetoothResult};
use crate::core::bluetooth::events::{LinkEvent, LinkEventSender};
use crate::core::bluetooth::scanner::DeviceMap;
use crate::utils::lock_unpoisoned;

/// Service and characteristic handles discovered per peripheral
#[derive(Default)]
struct GattCache {
    services: HashMap<(String, Uuid), Service>,
    characteristics: HashMap<(String, Uuid, Uuid), Characteristic>,
}

impl GattCache {
    fn purge(&mut self, device_id: &str) {
        self.services.retain(|(id, _), _| id != device_id);
        self.characteristics.retain(|(id, _, _), _| id != device_id);
    }
}

/// Connection manager for audio peripherals
#[derive(Clone)]
pub struct ConnectionManager {
    adapter: Adapter,
    devices: DeviceMap,
    events: LinkEventSender,
    gatt: Arc<Mutex<GattCache>>,
    /// One token per live link; cancelling it ends the link watcher and
    /// every notification stream of that peripheral.
    links: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl ConnectionManager {
    pub fn new(adapter: Adapter, devices: DeviceMap, events: LinkEventSender) -> Self {
        Self {
            adapter,
            devices,
            events,
            gatt: Arc::new(Mutex::new(GattCache::default())),
            links: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn device(&self, device_id: &str) -> BluetoothResult<Device> {
        self.devices
            .lock()
            .ok()
            .and_then(|devices| devices.get(device_id).cloned())
            .ok_or_else(|| BluetoothError::DeviceNotFound(device_id.to_string()))
    }

    fn gatt(&self) -> MutexGuard<'_, GattCache> {
        lock_unpoisoned(&self.gatt)
    }

    fn links(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        lock_unpoisoned(&self.links)
    }

    /// Token scoping tasks that belong to the current link of `device_id`
    pub fn link_token(&self, device_id: &str) -> CancellationToken {
        self.links()
            .entry(device_id.to_string())
            .or_default()
            .child_token()
    }

    /// Starts connecting in the background. `LinkEvent::Connected` follows on
    /// success, `LinkEvent::Disconnected` if the link later drops.
    pub fn connect(&self, device_id: &str) {
        let device = match self.device(device_id) {
            Ok(device) => device,
            Err(e) => {
                error!("Cannot connect: {}", e);
                return;
            }
        };

        let cancel = {
            let mut links = self.links();
            if let Some(previous) = links.remove(device_id) {
                previous.cancel();
            }
            let token = CancellationToken::new();
            links.insert(device_id.to_string(), token.clone());
            token
        };

        let adapter = self.adapter.clone();
        let events = self.events.clone();
        let id = device_id.to_string();

        tokio::spawn(async move {
            if !device.is_connected().await {
                info!("Initiating connection to {}...", id);
                let connect = tokio::select! {
                    result = adapter.connect_device(&device) => result,
                    _ = cancel.cancelled() => {
                        info!("Connection attempt to {} cancelled", id);
                        return;
                    }
                };
                if let Err(e) = connect {
                    error!("Failed to connect to {}: {}", id, e);
                    return;
                }
            }

            info!("Connected to {}", id);
            if events.send(LinkEvent::Connected(id.clone())).is_err() {
                return;
            }

            let mut connection_events = match adapter.device_connection_events(&device).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Cannot watch connection state of {}: {}", id, e);
                    return;
                }
            };

            loop {
                tokio::select! {
                    event = connection_events.next() => match event {
                        Some(ConnectionEvent::Disconnected) => {
                            info!("Device {} lost connection", id);
                            let _ = events.send(LinkEvent::Disconnected(id.clone()));
                            break;
                        }
                        Some(ConnectionEvent::Connected) => {}
                        None => break,
                    },
                    _ = cancel.cancelled() => break,
                }
            }
        });
    }

    /// Tears the link down without waiting for confirmation
    pub fn disconnect(&self, device_id: &str) {
        if let Some(token) = self.links().remove(device_id) {
            token.cancel();
        }
        self.gatt().purge(device_id);

        let device = match self.device(device_id) {
            Ok(device) => device,
            Err(e) => {
                warn!("Cannot disconnect: {}", e);
                return;
            }
        };
        let adapter = self.adapter.clone();
        tokio::spawn(async move {
            if device.is_connected().await {
                info!("Disconnecting from device {}", device.id());
                match adapter.disconnect_device(&device).await {
                    Ok(()) => info!("Successfully disconnected"),
                    Err(e) => error!("Failed to disconnect from {}: {}", device.id(), e),
                }
            } else {
                info!("Device {} not connected", device.id());
            }
        });
    }

    pub async fn discover_services(&self, device_id: &str) -> BluetoothResult<Vec<Uuid>> {
        let device = self.device(device_id)?;
        let services = device.services().await?;

        let mut gatt = self.gatt();
        Ok(services
            .into_iter()
            .map(|service| {
                let uuid = service.uuid();
                gatt.services.insert((device_id.to_string(), uuid), service);
                uuid
            })
            .collect())
    }

    pub async fn discover_characteristics(
        &self,
        device_id: &str,
        service_uuid: Uuid,
    ) -> BluetoothResult<Vec<Uuid>> {
        let service = self
            .gatt()
            .services
            .get(&(device_id.to_string(), service_uuid))
            .cloned()
            .ok_or_else(|| BluetoothError::ServiceNotFound {
                device_id: device_id.to_string(),
                service: service_uuid,
            })?;

        let characteristics = service.characteristics().await?;

        let mut gatt = self.gatt();
        Ok(characteristics
            .into_iter()
            .map(|characteristic| {
                let uuid = characteristic.uuid();
                gatt.characteristics
                    .insert((device_id.to_string(), service_uuid, uuid), characteristic);
                uuid
            })
            .collect())
    }

    pub fn characteristic(
        &self,
        device_id: &str,
        service_uuid: Uuid,
        characteristic_uuid: Uuid,
    ) -> BluetoothResult<Characteristic> {
        self.gatt()
            .characteristics
            .get(&(device_id.to_string(), service_uuid, characteristic_uuid))
            .cloned()
            .ok_or_else(|| BluetoothError::CharacteristicNotFound {
                device_id: device_id.to_string(),
                characteristic: characteristic_uuid,
            })
    }
}
