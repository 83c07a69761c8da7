//! # rawnav audio player library (rawnav-ap)
//!
//! Streams headerless PCM files (S16LE, stereo, 44100 Hz) to an audio
//! output device from a dedicated worker thread, with fading pause/resume,
//! relative seek, directory playlists and loop mode.
//!
//! **Architecture:** a mutex-guarded control block shared between the
//! command side and one playback worker thread. The worker owns the open
//! file and the device session; commands only mutate state and wake it.

pub mod audio;
pub mod browser;
pub mod config;
pub mod console;
pub mod error;
pub mod playback;

pub use error::{Error, Result};
pub use playback::{PlaybackControl, PlaybackEngine};
