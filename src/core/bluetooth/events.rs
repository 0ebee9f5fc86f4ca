//! Link-layer events delivered to the manager's event loop.

use tokio::sync::mpsc;

use crate::core::bluetooth::types::{PeripheralHandle, RadioState};

#[derive(Debug, Clone)]
pub enum LinkEvent {
    RadioStateChanged(RadioState),
    Advertisement {
        handle: PeripheralHandle,
        name: Option<String>,
        rssi: i16,
    },
    Connected(String),
    Disconnected(String),
    Notification {
        device_id: String,
        value: Vec<u8>,
    },
}

pub type LinkEventSender = mpsc::UnboundedSender<LinkEvent>;
pub type LinkEventReceiver = mpsc::UnboundedReceiver<LinkEvent>;

pub fn link_event_channel() -> (LinkEventSender, LinkEventReceiver) {
    mpsc::unbounded_channel()
}
