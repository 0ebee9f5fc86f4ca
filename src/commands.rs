//! Consumer-facing commands
//! This module defines the operations an external UI may invoke, plus the
//! line-oriented console that drives them from stdin.

use anyhow::{Result, anyhow};

use crate::core::bluetooth::types::RegistrySnapshot;
use crate::state::AppState;

/// Returns the discovered devices, strongest signal first
pub fn list_devices(app_state: &AppState) -> RegistrySnapshot {
    app_state.bluetooth_manager.snapshot()
}

/// Connects to a discovered device
///
/// # Arguments
/// * `app_state` - The application state
/// * `device_id` - The platform-specific identifier shown in the device list
pub fn connect_to_device(app_state: &AppState, device_id: &str) -> Result<(), String> {
    app_state
        .bluetooth_manager
        .connect(device_id)
        .map_err(|e| e.to_string())
}

/// Disconnects from a device. Disconnecting an unknown or idle device is a no-op.
pub fn disconnect(app_state: &AppState, device_id: &str) -> Result<(), String> {
    app_state.bluetooth_manager.disconnect(device_id);
    Ok(())
}

pub fn is_connected(app_state: &AppState, device_id: &str) -> bool {
    app_state.bluetooth_manager.is_connected(device_id)
}

/// Clears the discovered device list, e.g. when the device view is reopened
pub fn reset_devices(app_state: &AppState) {
    app_state.bluetooth_manager.reset_devices();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    Connect(String),
    Disconnect(String),
    Status(String),
    Reset,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Ok(None);
        };
        let mut device_id = || {
            parts
                .next()
                .map(str::to_string)
                .ok_or_else(|| anyhow!("'{}' needs a device id", verb))
        };

        let command = match verb {
            "list" | "ls" => ConsoleCommand::List,
            "connect" => ConsoleCommand::Connect(device_id()?),
            "disconnect" => ConsoleCommand::Disconnect(device_id()?),
            "status" => ConsoleCommand::Status(device_id()?),
            "reset" => ConsoleCommand::Reset,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(anyhow!("Unknown command: {}", other)),
        };
        Ok(Some(command))
    }
}

/// Runs one console command and returns the text to show
pub fn execute(app_state: &AppState, command: &ConsoleCommand) -> String {
    match command {
        ConsoleCommand::List => format_devices(&list_devices(app_state)),
        ConsoleCommand::Connect(id) => match connect_to_device(app_state, id) {
            Ok(()) => format!("Connecting to {}", id),
            Err(e) => format!("Connect failed: {}", e),
        },
        ConsoleCommand::Disconnect(id) => match disconnect(app_state, id) {
            Ok(()) => format!("Disconnected {}", id),
            Err(e) => format!("Disconnect failed: {}", e),
        },
        ConsoleCommand::Status(id) => {
            let state = if is_connected(app_state, id) {
                "connected"
            } else {
                "not connected"
            };
            format!("{} is {}", id, state)
        }
        ConsoleCommand::Reset => {
            reset_devices(app_state);
            "Device list cleared".to_string()
        }
        ConsoleCommand::Quit => "Bye".to_string(),
    }
}

pub fn format_devices(devices: &RegistrySnapshot) -> String {
    if devices.is_empty() {
        return "No devices discovered".to_string();
    }
    devices
        .iter()
        .map(|d| {
            let marker = if d.connected { "*" } else { " " };
            format!("{} {:<40} {:<12} RSSI: {}", marker, d.id, d.display_name, d.rssi)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
