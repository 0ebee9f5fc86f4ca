//! Friend audio bridge library
//! Connects to a "Friend" BLE peripheral, reassembles its PCM notifications
//! and plays them back continuously.

// Module declarations
pub mod commands;
pub mod config;
pub mod core;
pub mod logging;
pub mod state;
pub mod utils;
