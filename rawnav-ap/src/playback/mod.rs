//! Playback engine: control block, worker thread and commands

pub mod commands;
pub mod control;
pub mod engine;
pub mod events;
pub mod fader;
pub mod playlist;
pub mod shutdown;
pub mod worker;

pub use control::{PlaybackControl, PlaybackSnapshot, Playlist};
pub use engine::PlaybackEngine;
pub use events::{PlaybackEvent, StatusMessage, StopReason};
pub use fader::{FadeEnvelope, FadeState};
pub use shutdown::{ShutdownCoordinator, ShutdownOutcome};
pub use worker::PlaybackWorker;
