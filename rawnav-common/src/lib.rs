//! # rawnav Common Library
//!
//! Shared code for the rawnav workspace:
//! - Bootstrap configuration loading and start directory resolution
//! - Error types
//! - Fade curve definitions used by the pause/resume envelope
//! - Clock-style time formatting for status lines

pub mod config;
pub mod error;
pub mod fade_curves;
pub mod human_time;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
