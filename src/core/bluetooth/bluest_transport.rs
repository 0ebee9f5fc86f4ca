//! `GattTransport` backed by the platform Bluetooth stack through bluest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bluest::Adapter;
use log::info;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::bluetooth::connection::ConnectionManager;
use crate::core::bluetooth::error::{BluetoothError, BluetoothResult};
use crate::core::bluetooth::events::LinkEventSender;
use crate::core::bluetooth::notification::NotificationHandler;
use crate::core::bluetooth::scanner::{BluetoothScanner, watch_adapter};
use crate::core::bluetooth::transport::GattTransport;

pub struct BluestTransport {
    scanner: tokio::sync::Mutex<BluetoothScanner>,
    connection_manager: ConnectionManager,
    notification_handler: NotificationHandler,
    adapter_watch: JoinHandle<()>,
}

impl BluestTransport {
    /// Opens the default adapter and starts reporting its power state
    pub async fn new(events: LinkEventSender) -> BluetoothResult<Self> {
        let adapter = Adapter::default()
            .await
            .ok_or(BluetoothError::AdapterNotFound)?;
        info!("Bluetooth adapter opened.");

        let devices = Arc::new(Mutex::new(HashMap::new()));
        let scanner = BluetoothScanner::new(adapter.clone(), devices.clone(), events.clone());
        let connection_manager = ConnectionManager::new(adapter.clone(), devices, events.clone());
        let notification_handler = NotificationHandler::new(events.clone());
        let adapter_watch = watch_adapter(adapter, events);

        Ok(Self {
            scanner: tokio::sync::Mutex::new(scanner),
            connection_manager,
            notification_handler,
            adapter_watch,
        })
    }
}

impl Drop for BluestTransport {
    fn drop(&mut self) {
        self.adapter_watch.abort();
    }
}

#[async_trait]
impl GattTransport for BluestTransport {
    async fn start_scan(&self) -> BluetoothResult<()> {
        self.scanner.lock().await.start_scan().await
    }

    async fn stop_scan(&self) -> BluetoothResult<()> {
        self.scanner.lock().await.stop_scan().await
    }

    fn request_connect(&self, device_id: &str) {
        self.connection_manager.connect(device_id);
    }

    fn request_disconnect(&self, device_id: &str) {
        self.connection_manager.disconnect(device_id);
    }

    async fn discover_services(&self, device_id: &str) -> BluetoothResult<Vec<Uuid>> {
        self.connection_manager.discover_services(device_id).await
    }

    async fn discover_characteristics(
        &self,
        device_id: &str,
        service: Uuid,
    ) -> BluetoothResult<Vec<Uuid>> {
        self.connection_manager
            .discover_characteristics(device_id, service)
            .await
    }

    async fn enable_notifications(
        &self,
        device_id: &str,
        service: Uuid,
        characteristic: Uuid,
    ) -> BluetoothResult<()> {
        let notify_char =
            self.connection_manager
                .characteristic(device_id, service, characteristic)?;
        let cancel = self.connection_manager.link_token(device_id);
        self.notification_handler
            .setup_notifications(device_id, notify_char, cancel)
            .await
    }
}
