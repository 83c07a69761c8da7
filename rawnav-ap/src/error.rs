//! Error types for rawnav-ap
//!
//! Worker-side failures never leave the playback loop; they are turned
//! into status messages there. These types cover the fallible edges:
//! configuration, file validation and the output device.

use crate::audio::device::DeviceError;
use crate::audio::format::FormatError;
use thiserror::Error;

/// Main error type for rawnav-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration value out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error raised by the shared crate (config file, parsing)
    #[error(transparent)]
    Common(#[from] rawnav_common::Error),

    /// File rejected by the PCM format contract
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    Device(#[from] DeviceError),

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using rawnav-ap Error
pub type Result<T> = std::result::Result<T, Error>;
