//! In-memory GATT transport.
//! Peripherals are scripted up front; every call is recorded. Used by the
//! test suites and for running the pipeline without a radio.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use log::error;
use uuid::Uuid;

use crate::core::bluetooth::error::{BluetoothError, BluetoothResult};
use crate::core::bluetooth::events::{LinkEvent, LinkEventSender};
use crate::core::bluetooth::transport::GattTransport;
use crate::utils::lock_unpoisoned;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    StartScan,
    StopScan,
    Connect(String),
    Disconnect(String),
    DiscoverServices(String),
    DiscoverCharacteristics(String, Uuid),
    EnableNotifications(String, Uuid, Uuid),
}

/// Scripted GATT table of one peripheral
#[derive(Debug, Clone, Default)]
pub struct MemoryPeripheral {
    services: Vec<(Uuid, Vec<Uuid>)>,
    fail_services: bool,
    fail_characteristics: HashSet<Uuid>,
    subscriptions: Vec<(Uuid, Uuid)>,
}

impl MemoryPeripheral {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service: Uuid, characteristics: Vec<Uuid>) -> Self {
        self.services.push((service, characteristics));
        self
    }

    pub fn failing_services(mut self) -> Self {
        self.fail_services = true;
        self
    }

    pub fn failing_characteristics(mut self, service: Uuid) -> Self {
        self.fail_characteristics.insert(service);
        self
    }
}

#[derive(Default)]
struct MemoryState {
    peripherals: HashMap<String, MemoryPeripheral>,
    scanning: bool,
    calls: Vec<TransportCall>,
}

pub struct MemoryTransport {
    events: LinkEventSender,
    state: Mutex<MemoryState>,
}

impl MemoryTransport {
    pub fn new(events: LinkEventSender) -> Self {
        Self {
            events,
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn add_peripheral(&self, device_id: &str, peripheral: MemoryPeripheral) {
        self.lock().peripherals.insert(device_id.to_string(), peripheral);
    }

    pub fn is_scanning(&self) -> bool {
        self.lock().scanning
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    pub fn subscriptions(&self, device_id: &str) -> Vec<(Uuid, Uuid)> {
        self.lock()
            .peripherals
            .get(device_id)
            .map(|p| p.subscriptions.clone())
            .unwrap_or_default()
    }

    /// Pushes a link event as if the radio had produced it
    pub fn inject(&self, event: LinkEvent) {
        self.emit(event);
    }

    fn emit(&self, event: LinkEvent) {
        if let Err(e) = self.events.send(event) {
            error!("Failed to deliver link event: {}", e);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        lock_unpoisoned(&self.state)
    }

    fn record(&self, call: TransportCall) {
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl GattTransport for MemoryTransport {
    async fn start_scan(&self) -> BluetoothResult<()> {
        self.record(TransportCall::StartScan);
        self.lock().scanning = true;
        Ok(())
    }

    async fn stop_scan(&self) -> BluetoothResult<()> {
        self.record(TransportCall::StopScan);
        self.lock().scanning = false;
        Ok(())
    }

    fn request_connect(&self, device_id: &str) {
        self.record(TransportCall::Connect(device_id.to_string()));
        let known = self.lock().peripherals.contains_key(device_id);
        if known {
            self.emit(LinkEvent::Connected(device_id.to_string()));
        }
    }

    fn request_disconnect(&self, device_id: &str) {
        self.record(TransportCall::Disconnect(device_id.to_string()));
        self.emit(LinkEvent::Disconnected(device_id.to_string()));
    }

    async fn discover_services(&self, device_id: &str) -> BluetoothResult<Vec<Uuid>> {
        self.record(TransportCall::DiscoverServices(device_id.to_string()));
        let state = self.lock();
        let peripheral = state
            .peripherals
            .get(device_id)
            .ok_or_else(|| BluetoothError::DeviceNotFound(device_id.to_string()))?;
        if peripheral.fail_services {
            return Err(BluetoothError::Discovery("scripted service discovery failure".into()));
        }
        Ok(peripheral.services.iter().map(|(uuid, _)| *uuid).collect())
    }

    async fn discover_characteristics(
        &self,
        device_id: &str,
        service: Uuid,
    ) -> BluetoothResult<Vec<Uuid>> {
        self.record(TransportCall::DiscoverCharacteristics(
            device_id.to_string(),
            service,
        ));
        let state = self.lock();
        let peripheral = state
            .peripherals
            .get(device_id)
            .ok_or_else(|| BluetoothError::DeviceNotFound(device_id.to_string()))?;
        if peripheral.fail_characteristics.contains(&service) {
            return Err(BluetoothError::ServiceNotFound {
                device_id: device_id.to_string(),
                service,
            });
        }
        peripheral
            .services
            .iter()
            .find(|(uuid, _)| *uuid == service)
            .map(|(_, characteristics)| characteristics.clone())
            .ok_or_else(|| BluetoothError::ServiceNotFound {
                device_id: device_id.to_string(),
                service,
            })
    }

    async fn enable_notifications(
        &self,
        device_id: &str,
        service: Uuid,
        characteristic: Uuid,
    ) -> BluetoothResult<()> {
        self.record(TransportCall::EnableNotifications(
            device_id.to_string(),
            service,
            characteristic,
        ));
        let mut state = self.lock();
        let peripheral = state
            .peripherals
            .get_mut(device_id)
            .ok_or_else(|| BluetoothError::DeviceNotFound(device_id.to_string()))?;
        peripheral.subscriptions.push((service, characteristic));
        Ok(())
    }
}
