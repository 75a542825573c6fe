//! Daemon configuration.
//!
//! Loads settings from a TOML file and provides runtime defaults. This
//! is the daemon's own plumbing (socket paths, file locations); the
//! allow-list itself lives in [`crate::store`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub sockets: SocketConfig,

    #[serde(default)]
    pub consumer: ConsumerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Path of the persisted allow-list
    #[serde(default = "default_allow_list_path")]
    pub allow_list_path: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            allow_list_path: default_allow_list_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocketConfig {
    /// Socket receiving notification events from the host environment
    #[serde(default = "default_event_socket")]
    pub event_socket: PathBuf,

    /// Socket serving control-surface requests
    #[serde(default = "default_control_socket")]
    pub control_socket: PathBuf,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            event_socket: default_event_socket(),
            control_socket: default_control_socket(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Socket the consumer listens on while active
    #[serde(default = "default_consumer_socket")]
    pub socket: PathBuf,

    /// Consumer binary to relaunch when the socket is unreachable.
    /// When unset, a few well-known locations are tried.
    #[serde(default)]
    pub binary: Option<PathBuf>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            socket: default_consumer_socket(),
            binary: None,
        }
    }
}

// Default value functions for serde
fn default_log_level() -> String {
    "info".to_string()
}

fn default_allow_list_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notify-relay")
        .join("allow_list.toml")
}

fn default_event_socket() -> PathBuf {
    PathBuf::from("/tmp/notify-relay-events.sock")
}

fn default_control_socket() -> PathBuf {
    PathBuf::from("/tmp/notify-relay-control.sock")
}

fn default_consumer_socket() -> PathBuf {
    PathBuf::from("/tmp/expense-book.sock")
}

impl RelayConfig {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notify-relay")
            .join("config.toml")
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(
            config.sockets.event_socket,
            PathBuf::from("/tmp/notify-relay-events.sock")
        );
        assert!(config.consumer.binary.is_none());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[sockets]
event_socket = "/run/relay/events.sock"

[consumer]
socket = "/run/expense-book.sock"
binary = "/opt/expense-book/bin/expense-book"
"#;

        let config: RelayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(
            config.sockets.event_socket,
            PathBuf::from("/run/relay/events.sock")
        );
        // Omitted fields keep their defaults.
        assert_eq!(
            config.sockets.control_socket,
            PathBuf::from("/tmp/notify-relay-control.sock")
        );
        assert_eq!(
            config.consumer.binary,
            Some(PathBuf::from("/opt/expense-book/bin/expense-book"))
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = RelayConfig::default();
        config.general.log_level = "trace".to_string();
        config.save_to_path(path.clone()).unwrap();

        let reloaded = RelayConfig::load_from_path(path);
        assert_eq!(reloaded.general.log_level, "trace");
    }
}
