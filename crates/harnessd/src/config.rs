//! Configuration management for harnessd.
//!
//! Loads settings from /etc/fluency-harness/config.toml or uses defaults.

use crate::scope::IoScope;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/fluency-harness/config.toml";

/// Default config file path for fallback
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/fluency-harness/config.toml";

/// Runtime behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessSettings {
    /// Re-read the game config on every request and never cache datasets
    #[serde(default)]
    pub debug: bool,

    /// Bound on each resource read, artifact write and store call.
    /// Zero disables the bound.
    #[serde(default = "default_io_timeout")]
    pub io_timeout_ms: u64,

    /// Prefix for rewritten image URLs in instructions
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_io_timeout() -> u64 {
    10_000
}

fn default_base_url() -> String {
    "/fluency".to_string()
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            debug: false,
            io_timeout_ms: default_io_timeout(),
            base_url: default_base_url(),
        }
    }
}

/// Filesystem layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_game_config")]
    pub game_config: PathBuf,

    /// Root of the engines' data directories
    #[serde(default = "default_data")]
    pub data: PathBuf,

    /// Where raw result artifacts are written
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// SQLite database; without one players and outcomes live in memory
    #[serde(default)]
    pub database: Option<PathBuf>,
}

fn default_game_config() -> PathBuf {
    PathBuf::from("/var/lib/fluency-harness/game.json")
}

fn default_data() -> PathBuf {
    PathBuf::from("/var/lib/fluency-harness/data")
}

fn default_output() -> PathBuf {
    PathBuf::from("/var/lib/fluency-harness/output")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            game_config: default_game_config(),
            data: default_data(),
            output: default_output(),
            database: None,
        }
    }
}

/// Full harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub harness: HarnessSettings,

    #[serde(default)]
    pub paths: PathsConfig,
}

impl ServerConfig {
    pub fn debug_mode(&self) -> bool {
        self.harness.debug
    }

    /// Load config from file, or return defaults
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH)
            .or_else(|_| Self::load_from_path(DEFAULT_CONFIG_PATH))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                ServerConfig::default()
            })
    }

    /// Load config from specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save default config to path (for init)
    pub fn save_default(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(&ServerConfig::default())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {}", path.display());
        Ok(())
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        match self.harness.io_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Fresh scope carrying the configured I/O bound
    pub fn scope(&self) -> IoScope {
        match self.io_timeout() {
            Some(timeout) => IoScope::with_timeout(timeout),
            None => IoScope::unbounded(),
        }
    }
}
