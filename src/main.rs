use std::path::PathBuf;

use anyhow::Result;
use friend_audio_bridge_lib::commands::{self, ConsoleCommand};
use friend_audio_bridge_lib::config::AppConfig;
use friend_audio_bridge_lib::logging;
use friend_audio_bridge_lib::state::AppState;
use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};

fn main() -> Result<()> {
    logging::setup_logging(log::Level::Info);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| anyhow::anyhow!("Failed to create Tokio runtime: {}", e))?;

    rt.block_on(async {
        let config_path = match std::env::args().nth(1) {
            Some(path) => PathBuf::from(path),
            None => AppConfig::default_path()?,
        };
        let config = AppConfig::load_config(&config_path).await?;

        info!("Starting AppState initialization.");
        let mut app_state = AppState::new(config).await?;
        let event_loop = app_state.spawn_event_loop();

        let mut snapshots = app_state.bluetooth_manager.subscribe();
        tokio::spawn(async move {
            while snapshots.changed().await.is_ok() {
                let devices = snapshots.borrow_and_update().clone();
                info!("Devices:\n{}", commands::format_devices(&devices));
            }
        });

        info!(
            "Looking for \"{}\". Commands: list, connect <id>, disconnect <id>, status <id>, reset, quit",
            app_state.config.bluetooth.target_name
        );
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match ConsoleCommand::parse(&line) {
                Ok(Some(ConsoleCommand::Quit)) => break,
                Ok(Some(command)) => println!("{}", commands::execute(&app_state, &command)),
                Ok(None) => {}
                Err(e) => error!("{}", e),
            }
        }

        for device in app_state.bluetooth_manager.devices() {
            if app_state.bluetooth_manager.is_connected(device.id()) {
                app_state.bluetooth_manager.disconnect(device.id());
            }
        }
        if let Some(handle) = event_loop {
            handle.abort();
        }
        info!("Shutting down.");
        Ok(())
    })
}
