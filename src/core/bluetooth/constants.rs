//! Constants used throughout the application
//! This module contains the constant values describing the Friend peripheral,
//! its GATT profile and the audio wire format.

use uuid::Uuid;

/// Advertised name of the audio peripheral
pub const TARGET_DEVICE_NAME: &str = "Friend";

/// The UUID of the audio streaming service
pub const UUID_AUDIO_SERVICE: Uuid = Uuid::from_u128(0x19b10000_e8f2_537e_4f6c_d104768a1214);

/// The UUID of the audio data characteristic (notify only)
pub const UUID_AUDIO_DATA_CHAR: Uuid = Uuid::from_u128(0x19b10001_e8f2_537e_4f6c_d104768a1214);

/// Size of the per-packet header that precedes the PCM payload
pub const PACKET_HEADER_LEN: usize = 3;

/// Sample rate of the PCM stream in Hz
pub const AUDIO_SAMPLE_RATE: u32 = 8000;

/// Number of channels in the PCM stream
pub const AUDIO_CHANNELS: u16 = 1;
