//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\cratedig\config.toml
//! - macOS: ~/Library/Application Support/cratedig/config.toml
//! - Linux: ~/.config/cratedig/config.toml
//!
//! The config file is human-readable and editable. Settings are loaded
//! at startup; hosts may also build a [`Config`] programmatically and
//! pass its sections to the engine constructors.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Search aggregation settings
    pub search: SearchConfig,

    /// Reprocessing queue settings
    pub reprocess: ReprocessConfig,

    /// Artwork lookup settings
    pub artwork: ArtworkConfig,
}

/// Search aggregation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Per-source time budget in milliseconds
    pub source_timeout_ms: u64,

    /// How many source calls may be in flight at once within one search
    pub concurrency: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            source_timeout_ms: 10_000,
            concurrency: 4,
        }
    }
}

impl SearchConfig {
    /// Per-source time budget as a [`Duration`].
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }
}

/// Reprocessing queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReprocessConfig {
    /// Requests fetched per page during a sweep
    pub batch_size: u32,

    /// Minimum composite artist/title score for a candidate to count as found
    pub min_match_score: i32,

    /// Seconds between scheduled sweeps
    pub sweep_interval_secs: u64,

    /// Drain the user's cached results immediately after a successful sweep
    pub auto_download: bool,
}

impl Default for ReprocessConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            min_match_score: 85,
            sweep_interval_secs: 24 * 60 * 60,
            auto_download: false,
        }
    }
}

impl ReprocessConfig {
    /// Interval between scheduled sweeps as a [`Duration`].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Artwork lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtworkConfig {
    /// Whether searches should attempt artwork lookup at all
    pub enabled: bool,

    /// Artwork lookup time budget in milliseconds
    pub timeout_ms: u64,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5_000,
        }
    }
}

impl ArtworkConfig {
    /// Artwork lookup time budget as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cratedig"))
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

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
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
