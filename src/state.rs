//! Application state management
//! This module defines the long-lived resources created once at startup.

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info};
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::core::audio::playback::PlaybackScheduler;
use crate::core::bluetooth::events::{LinkEventReceiver, LinkEventSender, link_event_channel};
use crate::core::bluetooth::error::BluetoothResult;
use crate::core::bluetooth::manager::BluetoothManager;
use crate::core::bluetooth::transport::{GattTransport, UnavailableTransport};

/// Global application state
pub struct AppState {
    pub config: AppConfig,
    /// The Bluetooth manager instance
    pub bluetooth_manager: Arc<BluetoothManager>,
    /// Output stream; released when the state is dropped
    pub playback: Arc<PlaybackScheduler>,
    events: Option<LinkEventReceiver>,
}

impl AppState {
    /// Opens the system Bluetooth adapter and the default audio output.
    /// Neither is required: without an adapter the radio is reported off,
    /// without an output device playback is disabled.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let (events_tx, events_rx) = link_event_channel();
        info!("Initializing BluetoothManager...");
        let transport = open_transport(events_tx).await;
        let playback = Arc::new(PlaybackScheduler::start(config.audio.sample_rate));
        Ok(Self::assemble(config, transport, playback, events_rx))
    }

    /// Builds the state around an existing transport; the returned sender
    /// feeds the same event loop the transport reports to.
    pub fn with_transport<F, T>(
        config: AppConfig,
        playback: Arc<PlaybackScheduler>,
        make_transport: F,
    ) -> (Self, Arc<T>)
    where
        F: FnOnce(LinkEventSender) -> T,
        T: GattTransport + 'static,
    {
        let (events_tx, events_rx) = link_event_channel();
        let transport = Arc::new(make_transport(events_tx));
        let state = Self::assemble(config, transport.clone(), playback, events_rx);
        (state, transport)
    }

    fn assemble(
        config: AppConfig,
        transport: Arc<dyn GattTransport>,
        playback: Arc<PlaybackScheduler>,
        events: LinkEventReceiver,
    ) -> Self {
        let bluetooth_manager = Arc::new(BluetoothManager::new(&config, transport, playback.clone()));
        Self {
            config,
            bluetooth_manager,
            playback,
            events: Some(events),
        }
    }

    /// Starts the link event loop. Only the first call spawns anything.
    pub fn spawn_event_loop(&mut self) -> Option<JoinHandle<()>> {
        let events = self.events.take()?;
        let manager = self.bluetooth_manager.clone();
        Some(tokio::spawn(manager.run(events)))
    }

    /// Gets a reference to the Bluetooth manager
    pub fn get_bluetooth_manager_arc(&self) -> Arc<BluetoothManager> {
        self.bluetooth_manager.clone()
    }
}

#[cfg(feature = "bluetooth-backend")]
async fn open_transport(events: LinkEventSender) -> Arc<dyn GattTransport> {
    use crate::core::bluetooth::bluest_transport::BluestTransport;

    let opened = BluestTransport::new(events.clone()).await;
    transport_or_unavailable(opened, events)
}

#[cfg(not(feature = "bluetooth-backend"))]
async fn open_transport(events: LinkEventSender) -> Arc<dyn GattTransport> {
    Arc::new(UnavailableTransport::new(events))
}

/// Falls back to [`UnavailableTransport`] when the adapter could not be opened
#[cfg_attr(not(feature = "bluetooth-backend"), allow(dead_code))]
fn transport_or_unavailable<T>(
    opened: BluetoothResult<T>,
    events: LinkEventSender,
) -> Arc<dyn GattTransport>
where
    T: GattTransport + 'static,
{
    match opened {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            debug!("Bluetooth adapter could not be opened: {}", e);
            Arc::new(UnavailableTransport::new(events))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::bluetooth::error::BluetoothError;
    use crate::core::bluetooth::types::RadioState;

    #[tokio::test]
    async fn missing_adapter_keeps_the_bridge_running() {
        let (events_tx, events_rx) = link_event_channel();
        let opened: BluetoothResult<UnavailableTransport> = Err(BluetoothError::AdapterNotFound);
        let transport = transport_or_unavailable(opened, events_tx);
        let mut state = AppState::assemble(
            AppConfig::default(),
            transport,
            Arc::new(PlaybackScheduler::degraded(8000)),
            events_rx,
        );
        state.spawn_event_loop().unwrap();

        let manager = state.get_bluetooth_manager_arc();
        for _ in 0..200 {
            if manager.radio_state() == RadioState::RadioOff {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(manager.radio_state(), RadioState::RadioOff);
        assert!(matches!(
            manager.connect("dev"),
            Err(BluetoothError::DeviceNotFound(_))
        ));
    }
}
