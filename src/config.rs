//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\encore\config.toml
//! - macOS: ~/Library/Application Support/encore/config.toml
//! - Linux: ~/.config/encore/config.toml
//!
//! Every section has defaults, so a partial (or missing) file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::StreamQuality;
use crate::player::{CrossfadeSettings, OrchestratorSettings, StatsThresholds};
use crate::queue::{FileStore, PersistError, VersionPolicy};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Crossfade and transport settings
    pub playback: PlaybackConfig,

    /// Streaming stats sampling
    pub streaming: StreamingConfig,

    /// Default recording choice
    pub versions: VersionPolicy,

    /// Queue persistence
    pub persistence: PersistenceConfig,
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Crossfade between tracks (false = gapless cuts)
    pub crossfade_enabled: bool,

    /// Crossfade length in seconds
    pub crossfade_secs: f32,

    /// How often time remaining is checked
    pub poll_interval_ms: u64,

    /// Buffer the next track needs before crossfading (else hard cut)
    pub min_buffered_secs: f32,

    /// Last volume level (0.0 - 1.0)
    pub volume: f32,

    pub stream_quality: StreamQuality,

    /// "Previous" restarts the track once this far in
    pub previous_restart_secs: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            crossfade_enabled: true,
            crossfade_secs: 5.0,
            poll_interval_ms: 100,
            min_buffered_secs: 1.0,
            volume: 1.0,
            stream_quality: StreamQuality::High,
            previous_restart_secs: 3.0,
        }
    }
}

impl PlaybackConfig {
    pub fn crossfade_settings(&self) -> CrossfadeSettings {
        CrossfadeSettings {
            enabled: self.crossfade_enabled,
            duration: secs(self.crossfade_secs),
            min_buffered: secs(self.min_buffered_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            quality: self.stream_quality,
            previous_restart: secs(self.previous_restart_secs),
        }
    }
}

/// Streaming stats settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub sample_interval_ms: u64,

    /// Minimum change in buffered percentage worth reporting
    pub buffered_percent_delta: f32,

    /// Minimum change in seconds buffered ahead worth reporting
    pub buffered_ahead_delta_secs: f32,

    /// Minimum change in downlink worth reporting
    pub downlink_delta_mbps: f64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        let defaults = StatsThresholds::default();
        Self {
            sample_interval_ms: defaults.sample_interval.as_millis() as u64,
            buffered_percent_delta: defaults.buffered_percent,
            buffered_ahead_delta_secs: defaults.buffered_ahead_secs,
            downlink_delta_mbps: defaults.downlink_mbps,
        }
    }
}

impl StreamingConfig {
    pub fn thresholds(&self) -> StatsThresholds {
        StatsThresholds {
            sample_interval: Duration::from_millis(self.sample_interval_ms.max(1)),
            buffered_percent: self.buffered_percent_delta,
            buffered_ahead_secs: self.buffered_ahead_delta_secs,
            downlink_mbps: self.downlink_delta_mbps,
        }
    }
}

/// Queue persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Save the queue between sessions
    pub enabled: bool,

    /// Directory for saved state (None = OS data directory)
    pub directory: Option<PathBuf>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
        }
    }
}

impl PersistenceConfig {
    /// The file store to persist into, or `None` when disabled.
    pub fn store(&self) -> Result<Option<FileStore>, PersistError> {
        if !self.enabled {
            return Ok(None);
        }
        match &self.directory {
            Some(dir) => Ok(Some(FileStore::new(dir))),
            None => FileStore::default_location().map(Some),
        }
    }
}

/// Negative and non-finite seconds read as zero.
fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value).unwrap_or(Duration::ZERO)
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("encore"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from an explicit file, with the same fallbacks as [`load`].
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &dir.join("config.toml"))
}

/// Save configuration to `path`, atomically.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
