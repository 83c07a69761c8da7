//! Player configuration
//!
//! Converts the bootstrap TOML sections into validated, typed settings
//! for the engine. Durations become [`Duration`], the fade curve name is
//! parsed, and values the engine cannot honor are rejected up front.

use crate::audio::format::BYTES_PER_FRAME;
use crate::error::{Error, Result};
use rawnav_common::config::{DeviceSection, PlaybackSection, TomlConfig};
use rawnav_common::FadeCurve;
use std::time::Duration;

/// Engine-side playback settings
#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    pub fade_steps: u32,
    pub fade_curve: FadeCurve,
    pub chunk_bytes: usize,
    pub poll_interval: Duration,
    pub stop_ack_timeout: Duration,
    pub shutdown_timeout: Duration,
    pub seek_step_secs: i64,
    /// Lowercased, without the leading dot
    pub playlist_extensions: Vec<String>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            fade_steps: 24,
            fade_curve: FadeCurve::Linear,
            chunk_bytes: 4096,
            poll_interval: Duration::from_millis(100),
            stop_ack_timeout: Duration::from_secs(3),
            shutdown_timeout: Duration::from_secs(3),
            seek_step_secs: 10,
            playlist_extensions: vec!["raw".to_string()],
        }
    }
}

impl PlaybackSettings {
    pub fn from_section(section: &PlaybackSection) -> Result<Self> {
        if section.fade_steps == 0 {
            return Err(Error::Config("playback.fade_steps must be at least 1".to_string()));
        }
        if section.chunk_bytes == 0 || section.chunk_bytes % BYTES_PER_FRAME as usize != 0 {
            return Err(Error::Config(format!(
                "playback.chunk_bytes must be a positive multiple of {} (got {})",
                BYTES_PER_FRAME, section.chunk_bytes
            )));
        }
        if section.poll_interval_ms == 0 {
            return Err(Error::Config("playback.poll_interval_ms must be positive".to_string()));
        }
        if section.seek_step_secs <= 0 {
            return Err(Error::Config("playback.seek_step_secs must be positive".to_string()));
        }

        let fade_curve = section
            .fade_curve
            .parse::<FadeCurve>()
            .map_err(|e| Error::Config(format!("playback.fade_curve: {}", e)))?;

        let playlist_extensions = section
            .playlist_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect::<Vec<_>>();
        if playlist_extensions.is_empty() {
            return Err(Error::Config(
                "playback.playlist_extensions must name at least one extension".to_string(),
            ));
        }

        Ok(Self {
            fade_steps: section.fade_steps,
            fade_curve,
            chunk_bytes: section.chunk_bytes,
            poll_interval: Duration::from_millis(section.poll_interval_ms),
            stop_ack_timeout: Duration::from_millis(section.stop_ack_timeout_ms),
            shutdown_timeout: Duration::from_millis(section.shutdown_timeout_ms),
            seek_step_secs: section.seek_step_secs,
            playlist_extensions,
        })
    }
}

/// Output device negotiation settings
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    /// None = system default device
    pub name: Option<String>,
    pub sample_rate: u32,
    pub period_frames: u32,
    pub buffer_frames: u32,
    pub stall_timeout: Duration,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: None,
            sample_rate: 44_100,
            period_frames: 256,
            buffer_frames: 4096,
            stall_timeout: Duration::from_secs(2),
        }
    }
}

impl DeviceSettings {
    pub fn from_section(section: &DeviceSection) -> Result<Self> {
        if section.sample_rate == 0 {
            return Err(Error::Config("device.sample_rate must be positive".to_string()));
        }
        if section.period_frames == 0 {
            return Err(Error::Config("device.period_frames must be positive".to_string()));
        }
        if section.buffer_frames < section.period_frames {
            return Err(Error::Config(format!(
                "device.buffer_frames ({}) must be at least device.period_frames ({})",
                section.buffer_frames, section.period_frames
            )));
        }
        if section.stall_timeout_ms == 0 {
            return Err(Error::Config("device.stall_timeout_ms must be positive".to_string()));
        }

        Ok(Self {
            name: section.name.clone().filter(|n| !n.is_empty()),
            sample_rate: section.sample_rate,
            period_frames: section.period_frames,
            buffer_frames: section.buffer_frames,
            stall_timeout: Duration::from_millis(section.stall_timeout_ms),
        })
    }
}

/// Complete player configuration
#[derive(Debug, Clone, Default)]
pub struct PlayerConfig {
    pub playback: PlaybackSettings,
    pub device: DeviceSettings,
}

impl PlayerConfig {
    /// Validate the TOML sections
    pub fn from_toml(config: &TomlConfig) -> Result<Self> {
        Ok(Self {
            playback: PlaybackSettings::from_section(&config.playback)?,
            device: DeviceSettings::from_section(&config.device)?,
        })
    }
}
