// Configuration management for the live control panel

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides the configured API token.
pub const TOKEN_ENV_VAR: &str = "BADUANJIN_API_TOKEN";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the device-relay (Pi -> ngrok tunnel -> cloud relay)
    pub relay_url: String,

    /// Bearer token for relay requests. The `BADUANJIN_API_TOKEN`
    /// environment variable takes precedence when set.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Unified poller tick interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Timeout for status/frame/feedback polls in seconds
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Timeout for video transfer in seconds (large payloads)
    #[serde(default = "default_transfer_timeout_secs")]
    pub transfer_timeout_secs: u64,

    /// Settling delay after a recording stop before refreshing the
    /// recordings list, in milliseconds. The device finalizes the file
    /// asynchronously after acknowledging the stop.
    #[serde(default = "default_recordings_settle_ms")]
    pub recordings_settle_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay_url: "http://localhost:8000/api".to_string(),
            api_token: None,
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
            transfer_timeout_secs: default_transfer_timeout_secs(),
            recordings_settle_ms: default_recordings_settle_ms(),
        }
    }
}

impl Config {
    /// Load config from the default path or return default
    pub fn load_or_default() -> Self {
        Self::load_from(&get_config_path())
    }

    /// Load config from a specific path or return default
    pub fn load_from(config_path: &PathBuf) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => {
                        log::warn!("Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read config file: {}", e);
                }
            }
        }

        Self::default()
    }

    /// Save config to the default path
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&get_config_path())
    }

    /// Save config to a specific path
    pub fn save_to(&self, config_path: &PathBuf) -> anyhow::Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(config_path, contents)?;

        Ok(())
    }

    /// Resolve the API token: environment variable first, then config file.
    pub fn token(&self) -> Option<String> {
        std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.api_token.clone())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn recordings_settle_delay(&self) -> Duration {
        Duration::from_millis(self.recordings_settle_ms)
    }
}

/// Get the config file path
fn get_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("baduanjin-live")
        .join("config.toml")
}

/// Default poller interval (for serde)
fn default_poll_interval_ms() -> u64 {
    500
}

/// Default poll timeout (for serde)
fn default_poll_timeout_secs() -> u64 {
    4
}

/// Default transfer timeout (for serde)
fn default_transfer_timeout_secs() -> u64 {
    120
}

/// Default settling delay (for serde)
fn default_recordings_settle_ms() -> u64 {
    1500
}
