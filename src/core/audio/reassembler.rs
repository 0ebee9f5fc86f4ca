//! Packet reassembly
//! Strips the per-packet header from each notification and buffers the
//! payload per connection until the flush policy says to decode.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::audio::decoder::{SampleFrame, decode_pcm16_le};

/// When buffered payload gets decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Decode after every notification
    #[default]
    Immediate,
    /// Decode once at least this many payload bytes are buffered
    EveryBytes(usize),
}

impl FlushPolicy {
    fn should_flush(self, buffered: usize) -> bool {
        match self {
            FlushPolicy::Immediate => true,
            FlushPolicy::EveryBytes(threshold) => buffered >= threshold,
        }
    }
}

/// Payload bytes of one connection awaiting decode
#[derive(Debug, Default)]
pub struct AudioAccumulator {
    buffer: Vec<u8>,
}

impl AudioAccumulator {
    pub fn append(&mut self, payload: &[u8]) {
        self.buffer.extend_from_slice(payload);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Decodes the buffered bytes and empties the buffer, whatever the outcome
    pub fn flush(&mut self) -> SampleFrame {
        let frame = decode_pcm16_le(&self.buffer);
        self.buffer.clear();
        frame
    }
}

pub struct PacketReassembler {
    header_len: usize,
    policy: FlushPolicy,
    accumulators: HashMap<String, AudioAccumulator>,
}

impl PacketReassembler {
    pub fn new(header_len: usize, policy: FlushPolicy) -> Self {
        Self {
            header_len,
            policy,
            accumulators: HashMap::new(),
        }
    }

    /// Handles one notification value. Returns the decoded frame when a
    /// flush ran, `None` when the packet was dropped or is still buffered.
    pub fn on_notification(&mut self, device_id: &str, raw: &[u8]) -> Option<SampleFrame> {
        if raw.len() <= self.header_len {
            return None;
        }

        let accumulator = self.accumulators.entry(device_id.to_string()).or_default();
        accumulator.append(&raw[self.header_len..]);

        if !self.policy.should_flush(accumulator.len()) {
            return None;
        }

        let frame = accumulator.flush();
        debug!("Decoded {} samples from {}", frame.len(), device_id);
        Some(frame)
    }

    pub fn buffered(&self, device_id: &str) -> usize {
        self.accumulators.get(device_id).map_or(0, AudioAccumulator::len)
    }

    /// Drops the accumulator of a connection that went away
    pub fn remove(&mut self, device_id: &str) {
        self.accumulators.remove(device_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_header_and_decodes() {
        let mut reassembler = PacketReassembler::new(3, FlushPolicy::Immediate);
        let frame = reassembler
            .on_notification("dev", &[0x00, 0x00, 0x00, 0xFF, 0x7F])
            .unwrap();
        assert_eq!(frame.samples(), &[32767]);
        assert_eq!(frame.normalized(), vec![1.0]);
    }

    #[test]
    fn header_only_packets_are_dropped() {
        let mut reassembler = PacketReassembler::new(3, FlushPolicy::Immediate);
        assert!(reassembler.on_notification("dev", &[0x01, 0x02]).is_none());
        assert!(reassembler.on_notification("dev", &[0x01, 0x02, 0x03]).is_none());
        assert!(reassembler.on_notification("dev", &[]).is_none());
        assert_eq!(reassembler.buffered("dev"), 0);
    }

    #[test]
    fn accumulator_cleared_after_every_flush() {
        let mut reassembler = PacketReassembler::new(3, FlushPolicy::Immediate);
        // odd payload: one sample decoded, trailing byte lost
        let frame = reassembler
            .on_notification("dev", &[9, 9, 9, 0x01, 0x00, 0xAA])
            .unwrap();
        assert_eq!(frame.samples(), &[1]);
        assert_eq!(reassembler.buffered("dev"), 0);

        // single payload byte decodes to nothing and is not kept
        let frame = reassembler.on_notification("dev", &[9, 9, 9, 0x02]).unwrap();
        assert!(frame.is_empty());
        assert_eq!(reassembler.buffered("dev"), 0);
    }

    #[test]
    fn connections_have_independent_accumulators() {
        let mut reassembler = PacketReassembler::new(3, FlushPolicy::EveryBytes(4));
        assert!(reassembler.on_notification("a", &[0, 0, 0, 1, 0]).is_none());
        assert!(reassembler.on_notification("b", &[0, 0, 0, 2, 0]).is_none());
        assert_eq!(reassembler.buffered("a"), 2);
        assert_eq!(reassembler.buffered("b"), 2);

        let frame = reassembler.on_notification("a", &[0, 0, 0, 3, 0]).unwrap();
        assert_eq!(frame.samples(), &[1, 3]);
        assert_eq!(reassembler.buffered("a"), 0);
        assert_eq!(reassembler.buffered("b"), 2);

        reassembler.remove("b");
        assert_eq!(reassembler.buffered("b"), 0);
    }

    #[test]
    fn flush_policy_config_format() {
        let policy: FlushPolicy = serde_json::from_str("{\"every_bytes\":320}").unwrap();
        assert_eq!(policy, FlushPolicy::EveryBytes(320));
        let policy: FlushPolicy = serde_json::from_str("\"immediate\"").unwrap();
        assert_eq!(policy, FlushPolicy::Immediate);
    }
}
