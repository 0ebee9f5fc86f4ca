//! Bluetooth manager for the Friend audio bridge
//! This module owns every pipeline stage and dispatches link events to them:
//! radio state to the link state machine, advertisements to the registry,
//! connections to the service resolver and notifications through the
//! reassembler into the audio sink.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, error, info};
use tokio::sync::watch;

use crate::config::AppConfig;
use crate::core::audio::playback::AudioSink;
use crate::core::audio::reassembler::PacketReassembler;
use crate::core::bluetooth::error::{BluetoothError, BluetoothResult};
use crate::core::bluetooth::events::{LinkEvent, LinkEventReceiver};
use crate::core::bluetooth::link::{LinkStateMachine, ScanAction};
use crate::core::bluetooth::registry::DeviceRegistry;
use crate::core::bluetooth::resolver::ServiceResolver;
use crate::core::bluetooth::transport::GattTransport;
use crate::core::bluetooth::types::{
    DiscoveredDevice, RadioState, RegistrySnapshot, ServiceBinding,
};
use crate::utils::lock_unpoisoned;

pub struct BluetoothManager {
    transport: Arc<dyn GattTransport>,
    link: Mutex<LinkStateMachine>,
    registry: Mutex<DeviceRegistry>,
    resolver: ServiceResolver,
    reassembler: Mutex<PacketReassembler>,
    bindings: Mutex<HashMap<String, Vec<ServiceBinding>>>,
    sink: Arc<dyn AudioSink>,
}

impl BluetoothManager {
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn GattTransport>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        let bluetooth = &config.bluetooth;
        let audio = &config.audio;
        Self {
            transport,
            link: Mutex::new(LinkStateMachine::new()),
            registry: Mutex::new(DeviceRegistry::new(
                bluetooth.target_name.clone(),
                bluetooth.connection_policy,
            )),
            resolver: ServiceResolver::new(bluetooth.service_uuid, bluetooth.characteristic_uuid),
            reassembler: Mutex::new(PacketReassembler::new(audio.header_len, audio.flush_policy)),
            bindings: Mutex::new(HashMap::new()),
            sink,
        }
    }

    /// Consumes link events one at a time until every sender is gone
    pub async fn run(self: Arc<Self>, mut events: LinkEventReceiver) {
        info!("Link event loop started.");
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("Link event loop ended.");
    }

    pub async fn handle_event(self: &Arc<Self>, event: LinkEvent) {
        match event {
            LinkEvent::RadioStateChanged(state) => self.on_radio_state(state).await,
            LinkEvent::Advertisement { handle, name, rssi } => {
                lock_unpoisoned(&self.registry).on_advertisement(handle, name.as_deref(), rssi);
            }
            LinkEvent::Connected(device_id) => self.on_connected(device_id),
            LinkEvent::Disconnected(device_id) => {
                info!("Link to {} closed", device_id);
                lock_unpoisoned(&self.registry).link_lost(&device_id);
                self.release_connection(&device_id);
            }
            LinkEvent::Notification { device_id, value } => {
                self.on_notification(&device_id, &value);
            }
        }
    }

    async fn on_radio_state(&self, state: RadioState) {
        let action = lock_unpoisoned(&self.link).transition(state);
        let result = match action {
            ScanAction::Start => self.transport.start_scan().await,
            ScanAction::Stop => self.transport.stop_scan().await,
            ScanAction::None => Ok(()),
        };
        if let Err(e) = result {
            error!("Failed to apply scan action {:?}: {}", action, e);
        }
    }

    fn on_connected(self: &Arc<Self>, device_id: String) {
        lock_unpoisoned(&self.registry).link_established(&device_id);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let bindings = this
                .resolver
                .resolve(this.transport.as_ref(), &device_id)
                .await;
            if !lock_unpoisoned(&this.registry).is_connected(&device_id) {
                debug!("{} went away during service resolution", device_id);
                return;
            }
            lock_unpoisoned(&this.bindings).insert(device_id, bindings);
        });
    }

    fn on_notification(&self, device_id: &str, value: &[u8]) {
        let frame = lock_unpoisoned(&self.reassembler).on_notification(device_id, value);
        match frame {
            Some(frame) if !frame.is_empty() => self.sink.play(&frame),
            Some(_) => debug!("No whole samples in flush from {}", device_id),
            None => {}
        }
    }

    fn release_connection(&self, device_id: &str) {
        lock_unpoisoned(&self.bindings).remove(device_id);
        lock_unpoisoned(&self.reassembler).remove(device_id);
    }

    /// Requests a connection and records membership right away. Repeat calls
    /// for a connected device do nothing.
    pub fn connect(&self, device_id: &str) -> BluetoothResult<()> {
        {
            let mut registry = lock_unpoisoned(&self.registry);
            if !registry.contains(device_id) {
                return Err(BluetoothError::DeviceNotFound(device_id.to_string()));
            }
            if registry.is_connected(device_id) {
                info!("Device {} already connected.", device_id);
                return Ok(());
            }
            registry.connect(device_id);
        }
        info!("Connecting to {}", device_id);
        self.transport.request_connect(device_id);
        Ok(())
    }

    /// Requests a disconnect and drops membership, bindings and buffered
    /// audio for the device right away.
    pub fn disconnect(&self, device_id: &str) {
        info!("Disconnecting {}", device_id);
        self.transport.request_disconnect(device_id);
        lock_unpoisoned(&self.registry).disconnect(device_id);
        self.release_connection(device_id);
    }

    pub fn is_connected(&self, device_id: &str) -> bool {
        lock_unpoisoned(&self.registry).is_connected(device_id)
    }

    pub fn reset_devices(&self) {
        lock_unpoisoned(&self.registry).reset();
    }

    pub fn devices(&self) -> Vec<DiscoveredDevice> {
        lock_unpoisoned(&self.registry).devices().to_vec()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        lock_unpoisoned(&self.registry).snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistrySnapshot> {
        lock_unpoisoned(&self.registry).subscribe()
    }

    pub fn radio_state(&self) -> RadioState {
        lock_unpoisoned(&self.link).state()
    }

    pub fn bindings(&self, device_id: &str) -> Vec<ServiceBinding> {
        lock_unpoisoned(&self.bindings)
            .get(device_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn target_name(&self) -> String {
        lock_unpoisoned(&self.registry).target_name().to_string()
    }
}
