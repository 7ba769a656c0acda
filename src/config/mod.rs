//! # Configuration Management Module
//!
//! Central, typed configuration for a mudcore server. The configuration is
//! loaded once at startup and handed down to the components that need it;
//! nothing reads it from a global.
//!
//! ## Configuration Structure
//!
//! - [`ServerConfig`] - Listener address and inbound line buffering
//! - [`WorldConfig`] - Start room text, starting balance, pioneered room text
//! - [`LimitsConfig`] - Capacities of every bounded queue and the inventory
//! - [`DeliveryConfig`] - Backpressure policy for stimulus fan-out
//! - [`StorageConfig`] - Player record persistence location
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mudcore::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Listening on {}", config.server.bind);
//!     Config::create_default("config.example.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3000"
//!
//! [limits]
//! command_queue = 10
//! stimulus_inbox = 5
//! room_events = 10
//! room_actions = 10
//! inventory_slots = 10
//! outbox = 32
//!
//! [delivery]
//! policy = "block"   # or "timeout" / "drop_chatter"
//! timeout_ms = 5000
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    /// Lines read from a socket but not yet taken by the session's intake loop.
    #[serde(default = "default_line_buffer")]
    pub line_buffer: usize,
}

fn default_line_buffer() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    pub start_room_text: String,
    pub starting_money: i64,
    /// Text given to rooms created with `pioneer`.
    pub pioneer_room_text: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            start_room_text: "You are in a bedroom.".to_string(),
            starting_money: 5000,
            pioneer_room_text: "A default room text.".to_string(),
        }
    }
}

/// Capacities of the bounded queues and containers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub command_queue: usize,
    pub stimulus_inbox: usize,
    pub room_events: usize,
    pub room_actions: usize,
    pub inventory_slots: usize,
    /// Text chunks queued for a connection before its writer catches up.
    #[serde(default = "default_outbox")]
    pub outbox: usize,
}

fn default_outbox() -> usize {
    32
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            command_queue: 10,
            stimulus_inbox: 5,
            room_events: 10,
            room_actions: 10,
            inventory_slots: 10,
            outbox: default_outbox(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Wait for space in the inbox, however long it takes.
    Block,
    /// Wait up to `timeout_ms`, then disconnect the unresponsive session.
    Timeout,
    /// Drop `say` traffic for a full inbox; block for everything else.
    DropChatter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub policy: DeliveryMode,
    #[serde(default = "default_delivery_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_delivery_timeout_ms() -> u64 {
    5000
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            policy: DeliveryMode::Block,
            timeout_ms: default_delivery_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Config {
    /// Load configuration from a file and validate it.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values that would make a bounded queue unusable.
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("limits.command_queue", self.limits.command_queue),
            ("limits.stimulus_inbox", self.limits.stimulus_inbox),
            ("limits.room_events", self.limits.room_events),
            ("limits.room_actions", self.limits.room_actions),
            ("limits.inventory_slots", self.limits.inventory_slots),
            ("limits.outbox", self.limits.outbox),
            ("server.line_buffer", self.server.line_buffer),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(anyhow!("{} must be at least 1", name));
            }
        }
        if self.delivery.policy == DeliveryMode::Timeout && self.delivery.timeout_ms == 0 {
            return Err(anyhow!(
                "delivery.timeout_ms must be positive when policy is \"timeout\""
            ));
        }
        if self.server.bind.trim().is_empty() {
            return Err(anyhow!("server.bind must not be empty"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                bind: "0.0.0.0:3000".to_string(),
                line_buffer: default_line_buffer(),
            },
            world: WorldConfig::default(),
            limits: LimitsConfig::default(),
            delivery: DeliveryConfig::default(),
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("mudcore.log".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_match_world_rules() {
        let config = Config::default();
        assert_eq!(config.limits.command_queue, 10);
        assert_eq!(config.limits.stimulus_inbox, 5);
        assert_eq!(config.limits.room_events, 10);
        assert_eq!(config.limits.inventory_slots, 10);
        assert_eq!(config.limits.outbox, 32);
        assert_eq!(config.delivery.policy, DeliveryMode::Block);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = Config::default();
        config.limits.stimulus_inbox = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("limits.stimulus_inbox"));
    }

    #[test]
    fn test_timeout_policy_needs_duration() {
        let mut config = Config::default();
        config.delivery.policy = DeliveryMode::Timeout;
        config.delivery.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.delivery.timeout_ms = 250;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip_with_defaults() {
        let text = r#"
            [server]
            bind = "127.0.0.1:4000"

            [delivery]
            policy = "drop_chatter"

            [storage]
            data_dir = "/tmp/mud"

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(text).expect("parse");
        assert_eq!(config.server.bind, "127.0.0.1:4000");
        assert_eq!(config.server.line_buffer, 1);
        assert_eq!(config.delivery.policy, DeliveryMode::DropChatter);
        assert_eq!(config.delivery.timeout_ms, 5000);
        assert_eq!(config.world.starting_money, 5000);
        assert_eq!(config.limits.outbox, 32);
        assert_eq!(config.logging.file, None);
    }

    #[tokio::test]
    async fn test_create_default_then_load() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("config.toml");
        let path = path.to_str().expect("utf8 path");
        Config::create_default(path).await.expect("write default");
        let loaded = Config::load(path).await.expect("load");
        assert_eq!(loaded.world.start_room_text, "You are in a bedroom.");
        assert_eq!(loaded.limits.room_actions, 10);
    }
}
