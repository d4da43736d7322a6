use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::refresh::BOOTSTRAP_INTERVAL;
use crate::sync::resilient::{DEFAULT_FETCH_TIMEOUT, MAX_FETCH_TIMEOUT, RECONNECT_BACKOFF};

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "tvdeck";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Deck URL or local JSON file used when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// WebSocket endpoint for live task notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windowed: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervised: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_backoff_secs: Option<u64>,

    /// Polling cadence before the first deck has loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_refresh_secs: Option<u64>,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `tvdeck config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# tvdeck configuration\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "defaults.source" => {
                if value.trim().is_empty() {
                    anyhow::bail!("Invalid source: must be a URL or a file path.");
                }
                self.defaults_mut().source = Some(value.to_string());
            }
            "defaults.notify_url" => {
                if !value.starts_with("ws://") {
                    anyhow::bail!("Invalid notify_url: {value}. Must start with 'ws://'.");
                }
                self.defaults_mut().notify_url = Some(value.to_string());
            }
            "defaults.windowed" => {
                self.defaults_mut().windowed = Some(parse_bool(key, value)?);
            }
            "defaults.supervised" => {
                self.defaults_mut().supervised = Some(parse_bool(key, value)?);
            }
            "defaults.theme" => {
                match value {
                    "light" | "dark" => {}
                    _ => anyhow::bail!("Invalid theme: {value}. Must be 'light' or 'dark'."),
                }
                self.defaults_mut().theme = Some(value.to_string());
            }
            "network.fetch_timeout_secs" => {
                let min = DEFAULT_FETCH_TIMEOUT.as_secs();
                let max = MAX_FETCH_TIMEOUT.as_secs();
                let secs = parse_secs(key, value)?;
                if !(min..=max).contains(&secs) {
                    anyhow::bail!(
                        "Invalid fetch_timeout_secs: {value}. Must be between {min} and {max}."
                    );
                }
                self.network_mut().fetch_timeout_secs = Some(secs);
            }
            "network.reconnect_backoff_secs" => {
                let secs = parse_secs(key, value)?;
                if secs == 0 {
                    anyhow::bail!("Invalid reconnect_backoff_secs: must be at least 1.");
                }
                self.network_mut().reconnect_backoff_secs = Some(secs);
            }
            "network.bootstrap_refresh_secs" => {
                let secs = parse_secs(key, value)?;
                if secs < 5 {
                    anyhow::bail!("Invalid bootstrap_refresh_secs: must be at least 5.");
                }
                self.network_mut().bootstrap_refresh_secs = Some(secs);
            }
            _ => anyhow::bail!(
                "Unknown config key: {key}. Valid keys: defaults.source, defaults.notify_url, defaults.windowed, defaults.supervised, defaults.theme, network.fetch_timeout_secs, network.reconnect_backoff_secs, network.bootstrap_refresh_secs"
            ),
        }
        Ok(())
    }

    pub fn source(&self) -> Option<&str> {
        self.defaults.as_ref()?.source.as_deref()
    }

    pub fn notify_url(&self) -> Option<&str> {
        self.defaults.as_ref()?.notify_url.as_deref()
    }

    pub fn windowed(&self) -> bool {
        self.defaults
            .as_ref()
            .and_then(|d| d.windowed)
            .unwrap_or(false)
    }

    pub fn supervised(&self) -> bool {
        self.defaults
            .as_ref()
            .and_then(|d| d.supervised)
            .unwrap_or(false)
    }

    pub fn theme(&self) -> &str {
        self.defaults
            .as_ref()
            .and_then(|d| d.theme.as_deref())
            .unwrap_or("dark")
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.network
            .as_ref()
            .and_then(|n| n.fetch_timeout_secs)
            .map_or(DEFAULT_FETCH_TIMEOUT, Duration::from_secs)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        self.network
            .as_ref()
            .and_then(|n| n.reconnect_backoff_secs)
            .map_or(RECONNECT_BACKOFF, Duration::from_secs)
    }

    pub fn bootstrap_interval(&self) -> Duration {
        self.network
            .as_ref()
            .and_then(|n| n.bootstrap_refresh_secs)
            .map_or(BOOTSTRAP_INTERVAL, Duration::from_secs)
    }

    fn defaults_mut(&mut self) -> &mut DefaultsConfig {
        self.defaults.get_or_insert_with(DefaultsConfig::default)
    }

    fn network_mut(&mut self) -> &mut NetworkConfig {
        self.network.get_or_insert_with(NetworkConfig::default)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("Invalid value for {key}: {value}. Must be 'true' or 'false'."),
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .map_err(|_| anyhow::anyhow!("Invalid value for {key}: {value}. Must be whole seconds."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::default();
        assert_eq!(config.source(), None);
        assert!(!config.windowed());
        assert!(!config.supervised());
        assert_eq!(config.theme(), "dark");
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.reconnect_backoff(), Duration::from_secs(5));
        assert_eq!(config.bootstrap_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_set_validates_values() {
        let mut config = Config::default();
        config.set("defaults.theme", "light").unwrap();
        config.set("defaults.supervised", "yes").unwrap();
        config.set("network.fetch_timeout_secs", "45").unwrap();
        assert_eq!(config.theme(), "light");
        assert!(config.supervised());
        assert_eq!(config.fetch_timeout(), Duration::from_secs(45));

        assert!(config.set("defaults.theme", "neon").is_err());
        assert!(config.set("defaults.windowed", "maybe").is_err());
        assert!(config.set("network.fetch_timeout_secs", "5").is_err());
        assert!(config.set("network.fetch_timeout_secs", "90").is_err());
        assert!(config.set("network.reconnect_backoff_secs", "0").is_err());
        assert!(config.set("defaults.notify_url", "http://host/ws").is_err());
        assert!(config.set("defaults.colour", "red").is_err());
        // Rejected values leave the previous setting alone.
        assert_eq!(config.theme(), "light");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(FILENAME);

        let mut config = Config::default();
        config
            .set("defaults.source", "https://recon.example/api/tv/deck")
            .unwrap();
        config
            .set("defaults.notify_url", "ws://recon.example/ws/tasks")
            .unwrap();
        config.save_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# tvdeck configuration"));
        assert!(!text.contains("network"));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.notify_url(), Some("ws://recon.example/ws/tasks"));
    }

    #[test]
    fn test_missing_file_mentions_config_show() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.to_string().contains("tvdeck config show"));
    }
}
