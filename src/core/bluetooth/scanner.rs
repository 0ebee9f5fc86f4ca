
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bluest::{Adapter, AdapterEvent, Device};
use futures_util::StreamExt;
use log::{debug, error, info};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::error::BluetoothResult;
use crate::core::bluetooth::events::{LinkEvent, LinkEventSender};
use crate::core::bluetooth::types::{PeripheralHandle, RadioState};

/// Devices seen by the scanner, keyed by platform ID
pub type DeviceMap = Arc<Mutex<HashMap<String, Device>>>;

pub struct BluetoothScanner {
    adapter: Adapter,
    devices: DeviceMap,
    events: LinkEventSender,
    cancel_token: CancellationToken,
    scan_task_handle: Option<JoinHandle<BluetoothResult<()>>>,
}

impl BluetoothScanner {
    pub fn new(adapter: Adapter, devices: DeviceMap, events: LinkEventSender) -> Self {
        Self {
            adapter,
            devices,
            events,
            cancel_token: CancellationToken::new(),
            scan_task_handle: None,
        }
    }

    pub async fn start_scan(&mut self) -> BluetoothResult<()> {
        if self.scan_task_handle.is_some() {
            self.stop_scan().await?;
        }

        self.cancel_token = CancellationToken::new();
        let cancel_token_for_task = self.cancel_token.clone();
        let adapter_for_task = self.adapter.clone();
        let devices_for_task = self.devices.clone();
        let events_for_task = self.events.clone();

        let handle = tokio::spawn(async move {
            let result = Self::internal_scan_task(
                adapter_for_task,
                devices_for_task,
                events_for_task,
                cancel_token_for_task,
            )
            .await;
            if let Err(e) = &result {
                error!("Bluetooth scan failed: {}", e);
            }
            result
        });

        self.scan_task_handle = Some(handle);
        info!("Device scan task started.");
        Ok(())
    }

    /// Observes every advertiser; name filtering happens in the registry
    async fn internal_scan_task(
        adapter: Adapter,
        devices: DeviceMap,
        events: LinkEventSender,
        cancel_token: CancellationToken,
    ) -> BluetoothResult<()> {
        info!("Starting bluetooth scan");
        let mut scan_stream = adapter.scan(&[]).await?;

        loop {
            tokio::select! {
                result = scan_stream.next() => {
                    match result {
                        Some(discovered_device) => {
                            let Some(rssi) = discovered_device.rssi else {
                                continue;
                            };
                            let device = discovered_device.device;
                            let id = device.id().to_string();
                            let name = discovered_device
                                .adv_data
                                .local_name
                                .or_else(|| device.name().ok());
                            debug!("Found device - ID: {}, Name: {:?}, RSSI: {}", id, name, rssi);

                            if let Ok(mut devices) = devices.lock() {
                                devices.insert(id.clone(), device);
                            }

                            let event = LinkEvent::Advertisement {
                                handle: PeripheralHandle::new(id, name.clone()),
                                name,
                                rssi,
                            };
                            if events.send(event).is_err() {
                                info!("Event loop closed, ending scan.");
                                break;
                            }
                        }
                        None => {
                            info!("Bluetooth scan stream has ended.");
                            break;
                        }
                    }
                }
                _ = cancel_token.cancelled() => {
                    break;
                }
            }
        }
        Ok(())
    }

    pub async fn stop_scan(&mut self) -> BluetoothResult<()> {
        info!("Stopping Bluetooth scan.");
        self.cancel_token.cancel();

        if let Some(handle) = self.scan_task_handle.take() {
            match handle.await {
                Ok(Ok(())) => info!("Scan task finished after cancellation."),
                Ok(Err(e)) => error!("Scan task finished with an error: {}", e),
                Err(e) if e.is_cancelled() => info!("Scan task was cancelled."),
                Err(e) => error!("Scan task finished with an unexpected join error: {:?}", e),
            }
        } else {
            info!("No active scan task handle found to wait for.");
        }
        Ok(())
    }
}

/// Reports the adapter's power state, then every change to it
pub fn watch_adapter(adapter: Adapter, events: LinkEventSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        let initial = match adapter.is_available().await {
            Ok(true) => RadioState::RadioOn,
            Ok(false) => RadioState::RadioOff,
            Err(e) => {
                error!("Failed to query adapter availability: {}", e);
                RadioState::Unknown
            }
        };
        if events.send(LinkEvent::RadioStateChanged(initial)).is_err() {
            return;
        }

        let mut adapter_events = match adapter.events().await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to watch adapter events: {}", e);
                return;
            }
        };

        while let Some(event) = adapter_events.next().await {
            let state = match event {
                Ok(AdapterEvent::Available) => RadioState::RadioOn,
                Ok(AdapterEvent::Unavailable) => RadioState::RadioOff,
                Err(e) => {
                    error!("Error in adapter event stream: {}", e);
                    break;
                }
            };
            if events.send(LinkEvent::RadioStateChanged(state)).is_err() {
                break;
            }
        }
        info!("Adapter event stream ended");
    })
}
