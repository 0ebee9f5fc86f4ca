//! PCM sample decoding.
//!
//! Payload bytes are signed 16-bit little-endian samples. A trailing odd
//! byte cannot form a sample and is dropped; it is not carried over to the
//! next buffer.

use log::warn;

/// Samples decoded from one accumulator flush
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleFrame(Vec<i16>);

impl SampleFrame {
    pub fn new(samples: Vec<i16>) -> Self {
        Self(samples)
    }

    pub fn samples(&self) -> &[i16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<i16> {
        self.0
    }

    /// Samples scaled into floating point, see [`normalize_sample`]
    pub fn normalized(&self) -> Vec<f32> {
        self.0.iter().copied().map(normalize_sample).collect()
    }
}

/// Decodes little-endian `i16` samples from `bytes`
pub fn decode_pcm16_le(bytes: &[u8]) -> SampleFrame {
    if bytes.is_empty() {
        warn!("Received empty audio data array.");
        return SampleFrame::default();
    }

    let remainder = bytes.len() % 2;
    let aligned = &bytes[..bytes.len() - remainder];

    SampleFrame(
        aligned
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect(),
    )
}

/// Divides by `i16::MAX`. `32767` maps to exactly `1.0`, while `-32768`
/// lands slightly below `-1.0` (two's-complement asymmetry, left as is).
pub fn normalize_sample(sample: i16) -> f32 {
    sample as f32 / i16::MAX as f32
}
