//! Discovered-device registry and connection membership.
//!
//! Devices are kept deduplicated by identifier and ordered strongest signal
//! first. The RSSI recorded is the one from the first sighting; later
//! advertisements only refresh `last_seen`.

use chrono::Utc;
use log::{debug, info};
use tokio::sync::watch;

use crate::core::bluetooth::tracker::{ConnectionPolicy, ConnectionTracker};
use crate::core::bluetooth::types::{
    DeviceSummary, DiscoveredDevice, PeripheralHandle, RegistrySnapshot,
};

pub struct DeviceRegistry {
    target_name: String,
    devices: Vec<DiscoveredDevice>,
    tracker: Box<dyn ConnectionTracker>,
    snapshot_tx: watch::Sender<RegistrySnapshot>,
}

impl DeviceRegistry {
    pub fn new(target_name: impl Into<String>, policy: ConnectionPolicy) -> Self {
        let (snapshot_tx, _) = watch::channel(Vec::new());
        Self {
            target_name: target_name.into(),
            devices: Vec::new(),
            tracker: policy.build(),
            snapshot_tx,
        }
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Records an advertisement. Returns true when a new entry was inserted.
    pub fn on_advertisement(&mut self, handle: PeripheralHandle, name: Option<&str>, rssi: i16) -> bool {
        let Some(name) = name.filter(|name| *name == self.target_name) else {
            return false;
        };

        if let Some(existing) = self.devices.iter_mut().find(|d| d.handle.id == handle.id) {
            existing.last_seen = Utc::now();
            debug!("Repeat advertisement from {} (RSSI {} ignored)", handle.id, rssi);
            return false;
        }

        info!("Discovered {} device: ID: {}, RSSI: {}", name, handle.id, rssi);
        self.devices
            .push(DiscoveredDevice::new(handle, name.to_string(), rssi));
        // sort_by is stable, equal RSSI keeps discovery order
        self.devices.sort_by(|a, b| b.rssi.cmp(&a.rssi));
        self.publish();
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.devices.iter().any(|d| d.id() == id)
    }

    pub fn devices(&self) -> &[DiscoveredDevice] {
        &self.devices
    }

    /// Clears every discovered entry. Connection membership is untouched.
    pub fn reset(&mut self) {
        info!("Clearing {} discovered devices", self.devices.len());
        self.devices.clear();
        self.publish();
    }

    pub fn connect(&mut self, id: &str) {
        self.tracker.connect_requested(id);
        self.publish();
    }

    pub fn disconnect(&mut self, id: &str) {
        self.tracker.disconnect_requested(id);
        self.publish();
    }

    pub fn link_established(&mut self, id: &str) {
        self.tracker.link_established(id);
        self.publish();
    }

    pub fn link_lost(&mut self, id: &str) {
        self.tracker.link_lost(id);
        self.publish();
    }

    pub fn is_connected(&self, id: &str) -> bool {
        self.tracker.is_connected(id)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.devices
            .iter()
            .map(|d| DeviceSummary {
                id: d.handle.id.clone(),
                display_name: d.handle.name.clone().unwrap_or_else(|| d.name.clone()),
                rssi: d.rssi,
                connected: self.tracker.is_connected(d.id()),
            })
            .collect()
    }

    /// Returns a receiver holding the current snapshot; it is marked changed
    /// whenever the list or connection membership changes.
    pub fn subscribe(&self) -> watch::Receiver<RegistrySnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DeviceRegistry {
        DeviceRegistry::new("Friend", ConnectionPolicy::Optimistic)
    }

    fn advertise(registry: &mut DeviceRegistry, id: &str, rssi: i16) -> bool {
        registry.on_advertisement(
            PeripheralHandle::new(id, Some("Friend".to_string())),
            Some("Friend"),
            rssi,
        )
    }

    fn ids(registry: &DeviceRegistry) -> Vec<&str> {
        registry.devices().iter().map(|d| d.id()).collect()
    }

    #[test]
    fn filters_on_exact_name() {
        let mut registry = registry();
        let handle = PeripheralHandle::new("a", None);
        assert!(!registry.on_advertisement(handle.clone(), Some("friend"), -50));
        assert!(!registry.on_advertisement(handle.clone(), Some("Friend "), -50));
        assert!(!registry.on_advertisement(handle.clone(), None, -50));
        assert!(registry.devices().is_empty());
        assert!(registry.on_advertisement(handle, Some("Friend"), -50));
    }

    #[test]
    fn deduplicates_repeated_identifiers() {
        let mut registry = registry();
        for (id, rssi) in [("a", -70), ("b", -50), ("a", -30), ("b", -90), ("a", -70)] {
            advertise(&mut registry, id, rssi);
        }
        assert_eq!(registry.devices().len(), 2);
    }

    #[test]
    fn first_seen_rssi_is_kept() {
        let mut registry = registry();
        advertise(&mut registry, "a", -60);
        assert!(!advertise(&mut registry, "a", -40));
        assert_eq!(registry.devices()[0].rssi, -60);
    }

    #[test]
    fn sorted_descending_and_stable() {
        let mut registry = registry();
        advertise(&mut registry, "weak", -80);
        advertise(&mut registry, "tie1", -50);
        advertise(&mut registry, "strong", -20);
        advertise(&mut registry, "tie2", -50);
        assert_eq!(ids(&registry), vec!["strong", "tie1", "tie2", "weak"]);
    }

    #[test]
    fn connect_then_disconnect_leaves_set_empty() {
        let mut registry = registry();
        advertise(&mut registry, "a", -50);
        registry.connect("a");
        registry.connect("a");
        assert!(registry.is_connected("a"));
        registry.disconnect("a");
        assert!(!registry.is_connected("a"));
        registry.disconnect("a");
        assert!(!registry.is_connected("a"));
    }

    #[test]
    fn reset_clears_entries_but_not_connections() {
        let mut registry = registry();
        advertise(&mut registry, "a", -50);
        registry.connect("a");
        registry.reset();
        assert!(registry.devices().is_empty());
        assert!(registry.is_connected("a"));
        assert!(advertise(&mut registry, "a", -40));
        assert_eq!(registry.devices()[0].rssi, -40);
    }

    #[test]
    fn subscribers_see_changes() {
        let mut registry = registry();
        let mut rx = registry.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        advertise(&mut registry, "a", -50);
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].display_name, "Friend");
        assert!(!snapshot[0].connected);

        registry.connect("a");
        assert!(rx.borrow_and_update()[0].connected);

        advertise(&mut registry, "a", -10);
        assert!(!rx.has_changed().unwrap());
    }
}
