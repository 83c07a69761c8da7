//! Bootstrap configuration loading and start directory resolution
//!
//! Configuration is two-tier: a TOML file supplies defaults for the
//! session, and command-line arguments or environment variables override
//! individual values. A missing TOML file is never fatal; the built-in
//! defaults apply and a warning is logged.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the start directory
pub const START_DIR_ENV: &str = "RAWNAV_START_DIR";

/// Root of the TOML configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Directory the navigator opens in (optional)
    #[serde(default)]
    pub start_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub playback: PlaybackSection,

    #[serde(default)]
    pub device: DeviceSection,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// `[playback]` section: engine timing and playlist eligibility
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackSection {
    /// Buffer writes per pause/resume ramp
    #[serde(default = "default_fade_steps")]
    pub fade_steps: u32,

    /// Gain curve for the ramp (see [`crate::FadeCurve`])
    #[serde(default = "default_fade_curve")]
    pub fade_curve: String,

    /// Bytes read from the file per device write
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,

    /// Bound on each wait for device write-readiness
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Bound on the wait for the worker to acknowledge a stop
    #[serde(default = "default_stop_ack_timeout_ms")]
    pub stop_ack_timeout_ms: u64,

    /// Bound on the wait for the worker to exit at shutdown
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Step used by the console's forward/back commands
    #[serde(default = "default_seek_step_secs")]
    pub seek_step_secs: i64,

    /// File extensions (without dot, case-insensitive) picked up by playlist scans
    #[serde(default = "default_playlist_extensions")]
    pub playlist_extensions: Vec<String>,
}

impl Default for PlaybackSection {
    fn default() -> Self {
        Self {
            fade_steps: default_fade_steps(),
            fade_curve: default_fade_curve(),
            chunk_bytes: default_chunk_bytes(),
            poll_interval_ms: default_poll_interval_ms(),
            stop_ack_timeout_ms: default_stop_ack_timeout_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            seek_step_secs: default_seek_step_secs(),
            playlist_extensions: default_playlist_extensions(),
        }
    }
}

/// `[device]` section: output device negotiation
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSection {
    /// Output device name (system default if not specified)
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_period_frames")]
    pub period_frames: u32,

    /// Capacity of the queue feeding the device callback
    #[serde(default = "default_buffer_frames")]
    pub buffer_frames: u32,

    /// A write making no progress for this long is treated as device loss
    #[serde(default = "default_stall_timeout_ms")]
    pub stall_timeout_ms: u64,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            name: None,
            sample_rate: default_sample_rate(),
            period_frames: default_period_frames(),
            buffer_frames: default_buffer_frames(),
            stall_timeout_ms: default_stall_timeout_ms(),
        }
    }
}

fn default_log_level() -> String {
    "rawnav_ap=info,rawnav_common=info".to_string()
}

fn default_fade_steps() -> u32 {
    24
}

fn default_fade_curve() -> String {
    "linear".to_string()
}

fn default_chunk_bytes() -> usize {
    4096
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_stop_ack_timeout_ms() -> u64 {
    3000
}

fn default_shutdown_timeout_ms() -> u64 {
    3000
}

fn default_seek_step_secs() -> i64 {
    10
}

fn default_playlist_extensions() -> Vec<String> {
    vec!["raw".to_string()]
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_period_frames() -> u32 {
    256
}

fn default_buffer_frames() -> u32 {
    4096
}

fn default_stall_timeout_ms() -> u64 {
    2000
}

impl TomlConfig {
    /// Parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the platform locations are
    /// searched and built-in defaults apply if nothing is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            info!("Loading configuration from {}", path.display());
            return Self::from_file(path);
        }

        match discover_config_file() {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)
            }
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Locate the configuration file for the platform
///
/// Linux checks `~/.config/rawnav/config.toml` then `/etc/rawnav/config.toml`;
/// other platforms only check the user configuration directory.
pub fn discover_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("rawnav").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/rawnav/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Start directory resolution, priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML `start_dir`
/// 4. Current working directory (fallback)
pub fn resolve_start_dir(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.start_dir {
        return path.clone();
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
