//! Connection membership policies.
//!
//! The registry asks a tracker whether a device counts as connected. The
//! optimistic tracker trusts connect/disconnect requests; the confirmed one
//! waits for the link layer to report an established connection.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Which tracker the registry is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPolicy {
    #[default]
    Optimistic,
    Confirmed,
}

impl ConnectionPolicy {
    pub fn build(self) -> Box<dyn ConnectionTracker> {
        match self {
            ConnectionPolicy::Optimistic => Box::new(OptimisticTracker::default()),
            ConnectionPolicy::Confirmed => Box::new(ConfirmedTracker::default()),
        }
    }
}

pub trait ConnectionTracker: Send + Sync {
    fn connect_requested(&mut self, id: &str);
    fn disconnect_requested(&mut self, id: &str);
    fn link_established(&mut self, id: &str);
    fn link_lost(&mut self, id: &str);
    fn is_connected(&self, id: &str) -> bool;
}

/// Membership follows requests immediately; link events are ignored
#[derive(Debug, Default)]
pub struct OptimisticTracker {
    connected: HashSet<String>,
}

impl ConnectionTracker for OptimisticTracker {
    fn connect_requested(&mut self, id: &str) {
        self.connected.insert(id.to_string());
    }

    fn disconnect_requested(&mut self, id: &str) {
        self.connected.remove(id);
    }

    fn link_established(&mut self, _id: &str) {}

    fn link_lost(&mut self, _id: &str) {}

    fn is_connected(&self, id: &str) -> bool {
        self.connected.contains(id)
    }
}

/// Membership requires a link-layer confirmation
#[derive(Debug, Default)]
pub struct ConfirmedTracker {
    pending: HashSet<String>,
    connected: HashSet<String>,
}

impl ConnectionTracker for ConfirmedTracker {
    fn connect_requested(&mut self, id: &str) {
        if !self.connected.contains(id) {
            self.pending.insert(id.to_string());
        }
    }

    fn disconnect_requested(&mut self, id: &str) {
        self.pending.remove(id);
        self.connected.remove(id);
    }

    fn link_established(&mut self, id: &str) {
        if self.pending.remove(id) {
            self.connected.insert(id.to_string());
        }
    }

    fn link_lost(&mut self, id: &str) {
        self.pending.remove(id);
        self.connected.remove(id);
    }

    fn is_connected(&self, id: &str) -> bool {
        self.connected.contains(id)
    }
}
