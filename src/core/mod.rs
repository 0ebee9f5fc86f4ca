//! Core functionality for the Friend audio bridge
//! This module contains the Bluetooth link handling and the audio pipeline.

pub mod audio;
pub mod bluetooth;

// Re-export commonly used types
pub use audio::{AudioSink, PlaybackScheduler, SampleFrame};
pub use bluetooth::BluetoothManager;
