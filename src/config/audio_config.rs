use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::core::audio::reassembler::FlushPolicy;
use crate::core::bluetooth::constants::{AUDIO_CHANNELS, AUDIO_SAMPLE_RATE, PACKET_HEADER_LEN};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// PCM sample rate of the incoming stream (Hz)
    pub sample_rate: u32,
    /// Channel count of the incoming stream; only mono is supported
    pub channels: u16,
    /// Bytes stripped from the front of every notification
    pub header_len: usize,
    /// When buffered payload is decoded and played
    pub flush_policy: FlushPolicy,
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            sample_rate: AUDIO_SAMPLE_RATE,
            channels: AUDIO_CHANNELS,
            header_len: PACKET_HEADER_LEN,
            flush_policy: FlushPolicy::Immediate,
        }
    }
}

impl AudioConfig {
    /// Rejects formats the pipeline cannot play
    pub fn validate(&self) -> Result<()> {
        if self.channels != AUDIO_CHANNELS {
            bail!(
                "Unsupported channel count {}: only mono audio is supported",
                self.channels
            );
        }
        if self.sample_rate == 0 {
            bail!("Sample rate must be greater than zero");
        }
        if self.flush_policy == FlushPolicy::EveryBytes(0) {
            bail!("Flush threshold must be greater than zero bytes");
        }
        Ok(())
    }
}
