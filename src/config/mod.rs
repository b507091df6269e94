//! # Configuration Management Module
//!
//! Roombox reads a small TOML file describing where room schemas live, how
//! compiled documents address the host, and how logging is set up.
//!
//! ## Configuration Structure
//!
//! - [`HostConfig`] - target origin embedded in documents and start-room policy
//! - [`RoomsConfig`] - location of the room schema list
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use roombox::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Rooms: {}", config.rooms.schema_file);
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [host]
//! parent_origin = "http://localhost:3000"
//! start_room_policy = "strict"   # or "last_wins"
//!
//! [rooms]
//! schema_file = "rooms.json"
//!
//! [logging]
//! level = "info"
//! file = "roombox.log"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::rooms::StartRoomPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub rooms: RoomsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Target origin content uses when posting actions to the host.
    /// `"*"` accepts any embedding origin.
    #[serde(default = "default_parent_origin")]
    pub parent_origin: String,
    /// What to do when more than one room is marked `startHere`.
    #[serde(default)]
    pub start_room_policy: StartRoomPolicy,
}

fn default_parent_origin() -> String {
    "*".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            parent_origin: default_parent_origin(),
            start_room_policy: StartRoomPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// JSON file holding the ordered list of room schemas.
    pub schema_file: String,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            schema_file: "rooms.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Parse the configured level, falling back to `Info` for unknown names.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', defaulting to info", self.level);
            log::LevelFilter::Info
        })
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        Self::parse(&content).map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: HostConfig::default(),
            rooms: RoomsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("roombox.log".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.host.parent_origin, "*");
        assert_eq!(cfg.host.start_room_policy, StartRoomPolicy::Strict);
        assert_eq!(cfg.rooms.schema_file, "rooms.json");
        assert!(cfg.logging.file.is_none());
    }

    #[test]
    fn parses_policy_and_origin() {
        let cfg = Config::parse(
            r#"
[host]
parent_origin = "http://localhost:3000"
start_room_policy = "last_wins"

[logging]
level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(cfg.host.parent_origin, "http://localhost:3000");
        assert_eq!(cfg.host.start_room_policy, StartRoomPolicy::LastWins);
        assert_eq!(cfg.logging.level_filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn partial_sections_keep_the_fields_they_set() {
        let cfg = Config::parse(
            r#"
[rooms]
schema_file = "data/rooms.json"

[logging]
file = "x.log"
"#,
        )
        .unwrap();
        assert_eq!(cfg.rooms.schema_file, "data/rooms.json");
        assert_eq!(cfg.logging.file.as_deref(), Some("x.log"));
        assert_eq!(cfg.logging.level, "info");

        let cfg = Config::parse("[host]\nstart_room_policy = \"last_wins\"\n[rooms]\n").unwrap();
        assert_eq!(cfg.host.start_room_policy, StartRoomPolicy::LastWins);
        assert_eq!(cfg.rooms.schema_file, "rooms.json");
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(Config::parse("[host]\nstart_room_policy = \"first\"\n").is_err());
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let logging = LoggingConfig {
            level: "chatty".into(),
            file: None,
        };
        assert_eq!(logging.level_filter(), log::LevelFilter::Info);
    }

    #[tokio::test]
    async fn default_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let cfg = Config::load(path).await.unwrap();
        assert_eq!(cfg.logging.file.as_deref(), Some("roombox.log"));
        assert_eq!(cfg.rooms.schema_file, "rooms.json");
    }
}
