//! Bluetooth functionality for the Friend audio bridge
//! This module handles all bluetooth operations including scanning,
//! connecting, resolving the audio service and receiving notifications.

#[cfg(feature = "bluetooth-backend")]
pub mod bluest_transport;
#[cfg(feature = "bluetooth-backend")]
mod connection;
pub mod constants;
pub mod error;
pub mod events;
pub mod link;
pub mod manager;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
#[cfg(feature = "bluetooth-backend")]
mod notification;
pub mod registry;
pub mod resolver;
#[cfg(feature = "bluetooth-backend")]
mod scanner;
pub mod tracker;
pub mod transport;
pub mod types;

// Re-export types that should be publicly accessible
#[cfg(feature = "bluetooth-backend")]
pub use bluest_transport::BluestTransport;
pub use constants::*; // Re-export all constants
pub use error::{BluetoothError, BluetoothResult};
pub use events::{LinkEvent, LinkEventReceiver, LinkEventSender, link_event_channel};
pub use manager::BluetoothManager;
pub use registry::DeviceRegistry;
pub use resolver::ServiceResolver;
pub use tracker::{ConnectionPolicy, ConnectionTracker};
pub use transport::{GattTransport, UnavailableTransport};
pub use types::{
    DeviceSummary, DiscoveredDevice, PeripheralHandle, RadioState, RegistrySnapshot,
    ServiceBinding,
};
