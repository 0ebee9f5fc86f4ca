pub mod audio_config;
pub mod bluetooth_config;

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::audio_config::AudioConfig;
use crate::config::bluetooth_config::BluetoothConfig;
use crate::utils::ensure_directory_exists;

const CONFIG_DIR_NAME: &str = "friend-audio-bridge";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bluetooth: BluetoothConfig,
    pub audio: AudioConfig,
}

impl AppConfig {
    /// `<config_dir>/friend-audio-bridge/config.json`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("No configuration directory on this platform"))?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Loads the config from a configuration file.
    pub async fn load_config(file_path: &Path) -> Result<Self> {
        let file_path_str = file_path.to_string_lossy().into_owned();

        if !file_path.exists() {
            warn!(
                "Config file not found at {:?}, using default.",
                file_path_str
            );
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(file_path).await?;
        let config: Self = serde_json::from_str(&config_json)?;
        config.audio.validate()?;

        info!("Config loaded from {:?}", file_path_str);
        Ok(config)
    }

    /// Saves the current config to a configuration file.
    pub async fn save_config(&self, file_path: &Path) -> Result<()> {
        if let Some(config_dir) = file_path.parent() {
            ensure_directory_exists(config_dir).await?;
        }
        let file_path_str = file_path.to_string_lossy().into_owned();

        let config_json = match serde_json::to_string_pretty(&self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize config to JSON: {}", e);
                return Err(e.into());
            }
        };

        fs::write(file_path, config_json).await?;
        info!("Config saved to {:?}", file_path_str);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::reassembler::FlushPolicy;
    use crate::core::bluetooth::tracker::ConnectionPolicy;

    #[test]
    fn defaults_match_friend_profile() {
        let config = AppConfig::default();
        assert_eq!(config.bluetooth.target_name, "Friend");
        assert_eq!(
            config.bluetooth.service_uuid.to_string(),
            "19b10000-e8f2-537e-4f6c-d104768a1214"
        );
        assert_eq!(
            config.bluetooth.characteristic_uuid.to_string(),
            "19b10001-e8f2-537e-4f6c-d104768a1214"
        );
        assert_eq!(config.audio.sample_rate, 8000);
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.audio.header_len, 3);
        assert_eq!(config.audio.flush_policy, FlushPolicy::Immediate);
        assert_eq!(config.bluetooth.connection_policy, ConnectionPolicy::Optimistic);
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_config(&dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn save_then_load_preserves_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = AppConfig::default();
        config.bluetooth.target_name = "Friend Pro".to_string();
        config.audio.flush_policy = FlushPolicy::EveryBytes(320);
        config.save_config(&path).await.unwrap();

        assert_eq!(AppConfig::load_config(&path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, r#"{ "bluetooth": { "connection_policy": "confirmed" } }"#)
            .await
            .unwrap();

        let config = AppConfig::load_config(&path).await.unwrap();
        assert_eq!(config.bluetooth.connection_policy, ConnectionPolicy::Confirmed);
        assert_eq!(config.bluetooth.target_name, "Friend");
        assert_eq!(config.audio, AudioConfig::default());
    }

    #[tokio::test]
    async fn stereo_audio_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        tokio::fs::write(&path, r#"{ "audio": { "channels": 2 } }"#)
            .await
            .unwrap();

        let err = AppConfig::load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("mono"));
    }

    #[test]
    fn zero_byte_flush_threshold_is_rejected() {
        let mut audio = AudioConfig::default();
        assert!(audio.validate().is_ok());
        audio.flush_policy = FlushPolicy::EveryBytes(0);
        assert!(audio.validate().is_err());
    }
}
