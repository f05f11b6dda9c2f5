//! Configuration module for salon.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, SalonError};

/// Server (TCP front end) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum number of concurrent connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7878
}

fn default_max_connections() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
        }
    }
}

/// Broker (room state and delivery) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Maximum number of rooms the registry will create.
    #[serde(default = "default_max_rooms")]
    pub max_rooms: usize,
    /// Maximum number of members per room.
    #[serde(default = "default_max_members")]
    pub max_members_per_room: usize,
    /// Capacity of the inbound request queue.
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,
    /// Capacity of each requester's private reply channel.
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
    /// Directory holding one history log per room.
    #[serde(default = "default_history_dir")]
    pub history_dir: String,
    /// Rooms created when the broker starts.
    #[serde(default)]
    pub preset_rooms: Vec<String>,
}

fn default_max_rooms() -> usize {
    10
}

fn default_max_members() -> usize {
    20
}

fn default_inbound_capacity() -> usize {
    256
}

fn default_outbox_capacity() -> usize {
    64
}

fn default_history_dir() -> String {
    "data/history".to_string()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            max_rooms: default_max_rooms(),
            max_members_per_room: default_max_members(),
            inbound_capacity: default_inbound_capacity(),
            outbox_capacity: default_outbox_capacity(),
            history_dir: default_history_dir(),
            preset_rooms: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/salon.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Broker configuration.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(SalonError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| SalonError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `SALON_HISTORY_DIR`: Override the history log directory
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("SALON_HISTORY_DIR") {
            if !dir.is_empty() {
                self.broker.history_dir = dir;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Every capacity must be positive, and preset rooms must fit in `max_rooms`.
    pub fn validate(&self) -> Result<()> {
        let capacities = [
            ("server.max_connections", self.server.max_connections),
            ("broker.max_rooms", self.broker.max_rooms),
            ("broker.max_members_per_room", self.broker.max_members_per_room),
            ("broker.inbound_capacity", self.broker.inbound_capacity),
            ("broker.outbox_capacity", self.broker.outbox_capacity),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(SalonError::Validation(format!("{name} must be positive")));
            }
        }

        if self.broker.preset_rooms.len() > self.broker.max_rooms {
            return Err(SalonError::Validation(format!(
                "{} preset rooms exceed broker.max_rooms ({})",
                self.broker.preset_rooms.len(),
                self.broker.max_rooms
            )));
        }
        Ok(())
    }
}
