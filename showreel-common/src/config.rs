//! Configuration loading and resolution
//!
//! A single TOML file tunes the playback core. Every value has a built-in
//! default, so a missing file is never fatal unless it was named explicitly.
//!
//! Config file resolution order:
//! 1. Command-line argument (highest priority)
//! 2. `SHOWREEL_CONFIG` environment variable
//! 3. `<config_dir>/showreel/config.toml`
//! 4. Built-in defaults (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SHOWREEL_CONFIG";

/// Top-level configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub playback: PlaybackTuning,
    pub device: DeviceThresholds,
    pub layout: LayoutConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

/// Playback core tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackTuning {
    /// Delay between admission and "loaded", debounces scroll churn
    pub settle_delay_ms: u64,
    /// Max loading+loaded videos on constrained devices
    pub constrained_ceiling: usize,
    /// Max loading+loaded videos on capable devices
    pub capable_ceiling: usize,
    /// Preload margin (px) on constrained devices
    pub constrained_enter_margin_px: f64,
    /// Unload margin (px) on constrained devices
    pub constrained_exit_margin_px: f64,
    /// Preload margin (px) on capable devices
    pub capable_enter_margin_px: f64,
    /// Unload margin (px) on capable devices
    pub capable_exit_margin_px: f64,
    /// Fraction of an element that must intersect the viewport
    pub visibility_threshold: f64,
    /// Volume applied when an instance becomes the audible one
    pub active_volume: f32,
}

impl Default for PlaybackTuning {
    fn default() -> Self {
        Self {
            settle_delay_ms: 100,
            constrained_ceiling: 1,
            capable_ceiling: 4,
            constrained_enter_margin_px: 50.0,
            constrained_exit_margin_px: 100.0,
            capable_enter_margin_px: 300.0,
            capable_exit_margin_px: 600.0,
            visibility_threshold: 0.1,
            active_volume: 1.0,
        }
    }
}

impl PlaybackTuning {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Thresholds used by the device classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceThresholds {
    /// Devices with at most this many logical cores are constrained
    pub max_constrained_cores: usize,
    /// Devices with at most this much memory (GiB) are constrained
    pub max_constrained_memory_gb: f64,
    /// Viewports narrower than this are constrained
    pub small_viewport_px: u32,
    /// Touch devices narrower than this are constrained
    pub touch_viewport_px: u32,
}

impl Default for DeviceThresholds {
    fn default() -> Self {
        Self {
            max_constrained_cores: 2,
            max_constrained_memory_gb: 2.0,
            small_viewport_px: 768,
            touch_viewport_px: 1024,
        }
    }
}

/// Tile geometry of the portfolio grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub tile_width_px: f64,
    pub tile_height_px: f64,
    pub gap_px: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tile_width_px: 640.0,
            tile_height_px: 360.0,
            gap_px: 24.0,
        }
    }
}

/// Where the content catalog comes from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Local JSON catalog document
    pub path: Option<PathBuf>,
    /// Base URL of the content store REST endpoint
    pub url: Option<String>,
    /// HTTP timeout for catalog requests
    pub timeout_ms: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject values the playback core cannot run with
    pub fn validate(&self) -> Result<()> {
        let p = &self.playback;

        if p.constrained_ceiling == 0 || p.capable_ceiling == 0 {
            return Err(Error::Config(
                "concurrency ceilings must be at least 1".to_string(),
            ));
        }
        if !(p.visibility_threshold > 0.0 && p.visibility_threshold <= 1.0) {
            return Err(Error::Config(format!(
                "visibility_threshold must be in (0, 1], got {}",
                p.visibility_threshold
            )));
        }
        if p.constrained_exit_margin_px < p.constrained_enter_margin_px
            || p.capable_exit_margin_px < p.capable_enter_margin_px
        {
            return Err(Error::Config(
                "exit margins must not be smaller than enter margins".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&p.active_volume) {
            return Err(Error::Config(format!(
                "active_volume must be in [0, 1], got {}",
                p.active_volume
            )));
        }
        if self.layout.tile_height_px <= 0.0 || self.layout.tile_width_px <= 0.0 {
            return Err(Error::Config("tile dimensions must be positive".to_string()));
        }
        Ok(())
    }
}

/// Resolves which config file to load
pub struct ConfigResolver {
    app_name: String,
}

impl ConfigResolver {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
        }
    }

    /// Path of the config file that would be used, if any
    ///
    /// Explicit sources (CLI, environment) are returned even when the file is
    /// missing so that `resolve` can report them.
    pub fn locate(&self, cli_arg: Option<&Path>) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Some(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: User config directory
        dirs::config_dir()
            .map(|d| d.join(&self.app_name).join("config.toml"))
            .filter(|p| p.exists())
    }

    /// Load the effective configuration
    ///
    /// A missing explicit file is an error; no file at all yields defaults.
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Result<TomlConfig> {
        match self.locate(cli_arg) {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                info!("Loading configuration from {}", path.display());
                TomlConfig::load(&path)
            }
            None => {
                warn!("No config file found for {}, using built-in defaults", self.app_name);
                Ok(TomlConfig::default())
            }
        }
    }
}
