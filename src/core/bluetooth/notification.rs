//! Notification handling for the audio characteristic
//! This module subscribes to value changes and forwards every value into the
//! link event queue.

use bluest::Characteristic;
use futures_util::StreamExt;
use log::{debug, error, info};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::error::{BluetoothError, BluetoothResult};
use crate::core::bluetooth::events::{LinkEvent, LinkEventSender};

#[derive(Clone)]
pub struct NotificationHandler {
    events: LinkEventSender,
}

impl NotificationHandler {
    pub fn new(events: LinkEventSender) -> Self {
        Self { events }
    }

    /// Subscribes to `notify_char` and returns once the subscription is live.
    /// The forwarding task ends with the stream or when `cancel` fires.
    pub async fn setup_notifications(
        &self,
        device_id: &str,
        notify_char: Characteristic,
        cancel: CancellationToken,
    ) -> BluetoothResult<()> {
        info!("Subscribing to notifications...");

        let (ready_tx, ready_rx) = oneshot::channel();
        let events = self.events.clone();
        let device_id = device_id.to_string();

        tokio::spawn(async move {
            Self::process_notifications(device_id, notify_char, events, cancel, ready_tx).await;
        });

        match ready_rx.await {
            Ok(result) => result,
            Err(_) => Err(BluetoothError::Subscription(
                "notification task ended before subscribing".to_string(),
            )),
        }
    }

    async fn process_notifications(
        device_id: String,
        notify_char: Characteristic,
        events: LinkEventSender,
        cancel: CancellationToken,
        ready: oneshot::Sender<BluetoothResult<()>>,
    ) {
        let mut notification_stream = match notify_char.notify().await {
            Ok(stream) => {
                let _ = ready.send(Ok(()));
                stream
            }
            Err(e) => {
                error!("Failed to subscribe to notifications: {}", e);
                let _ = ready.send(Err(e.into()));
                return;
            }
        };

        info!("Listening for audio notifications from {}...", device_id);
        loop {
            tokio::select! {
                result = notification_stream.next() => match result {
                    Some(Ok(value)) => {
                        debug!("Received {} bytes from {}", value.len(), device_id);
                        let event = LinkEvent::Notification {
                            device_id: device_id.clone(),
                            value,
                        };
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        error!("Error in notification stream: {}", e);
                        break;
                    }
                    None => break,
                },
                _ = cancel.cancelled() => break,
            }
        }

        info!("Notification stream ended");
    }
}
