//! Audio pipeline: notification payloads in, continuous playback out.

pub mod decoder;
pub mod error;
#[cfg(feature = "audio-output")]
mod output;
pub mod playback;
pub mod reassembler;
pub mod segment;

pub use decoder::{SampleFrame, decode_pcm16_le, normalize_sample};
pub use error::{AudioError, AudioResult};
pub use playback::{AudioSink, PlaybackScheduler};
pub use reassembler::{AudioAccumulator, FlushPolicy, PacketReassembler};
pub use segment::SegmentQueue;
