//! Service resolution for a freshly connected peripheral
//! Discovers services, then characteristics on the audio service, then turns
//! on notifications for the audio characteristic. A failed step aborts only
//! its own branch.

use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::bluetooth::transport::GattTransport;
use crate::core::bluetooth::types::ServiceBinding;

#[derive(Debug, Clone)]
pub struct ServiceResolver {
    service_uuid: Uuid,
    characteristic_uuid: Uuid,
}

impl ServiceResolver {
    pub fn new(service_uuid: Uuid, characteristic_uuid: Uuid) -> Self {
        Self {
            service_uuid,
            characteristic_uuid,
        }
    }

    /// Runs the discovery chain. An empty result means the connection will
    /// stay silent; that is not treated as an error.
    pub async fn resolve<T>(&self, transport: &T, device_id: &str) -> Vec<ServiceBinding>
    where
        T: GattTransport + ?Sized,
    {
        info!("Connected to {}, discovering services...", device_id);
        let services = match transport.discover_services(device_id).await {
            Ok(services) => services,
            Err(e) => {
                error!("Error discovering services on {}: {}", device_id, e);
                return Vec::new();
            }
        };

        let mut bindings = Vec::new();
        for service in services {
            debug!("Service UUID: {}", service);
            if service != self.service_uuid {
                continue;
            }

            let characteristics = match transport
                .discover_characteristics(device_id, service)
                .await
            {
                Ok(characteristics) => characteristics,
                Err(e) => {
                    error!(
                        "Error discovering characteristics for service {}: {}",
                        service, e
                    );
                    continue;
                }
            };

            for characteristic in characteristics {
                if characteristic != self.characteristic_uuid {
                    continue;
                }
                info!("Found audio characteristic: {}", characteristic);
                let notify_enabled = match transport
                    .enable_notifications(device_id, service, characteristic)
                    .await
                {
                    Ok(()) => true,
                    Err(e) => {
                        error!("Failed to enable notifications on {}: {}", characteristic, e);
                        false
                    }
                };
                bindings.push(ServiceBinding {
                    service_id: service,
                    characteristic_id: characteristic,
                    notify_enabled,
                });
            }
        }

        if bindings.is_empty() {
            warn!("Audio service not found on {}, connection will stay silent", device_id);
        }
        bindings
    }
}
