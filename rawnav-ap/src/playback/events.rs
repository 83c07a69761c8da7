//! Playback events
//!
//! Published on a `tokio::sync::broadcast` channel owned by the control
//! block. Sending never blocks and works from the worker thread without a
//! runtime; with no subscribers the event is simply dropped.

use chrono::{DateTime, Local};
use std::fmt;
use std::path::PathBuf;

/// Severity of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Status,
    Error,
}

/// Last status or error text shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub level: MessageLevel,
    pub text: String,
    pub at: DateTime<Local>,
}

impl StatusMessage {
    pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            at: Local::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == MessageLevel::Error
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            MessageLevel::Status => write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.text),
            MessageLevel::Error => {
                write!(f, "[{}] ERROR: {}", self.at.format("%H:%M:%S"), self.text)
            }
        }
    }
}

/// Why playback returned to idle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Stop command
    User,
    /// Internal stop issued while a playlist is being replaced
    Reload,
    /// Last playlist entry finished without looping
    EndOfPlaylist,
    /// Single file finished without looping
    Finished,
    /// Read error, device loss or unavailable device
    Failed,
}

/// Events emitted by the control block and the worker
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    TrackStarted {
        path: PathBuf,
        duration_secs: f64,
        /// (index, length) when a playlist is active
        playlist_position: Option<(usize, usize)>,
    },
    TrackLooped {
        path: PathBuf,
    },
    PauseToggled {
        paused: bool,
    },
    Seeked {
        path: PathBuf,
        position_secs: f64,
    },
    Stopped {
        reason: StopReason,
        path: Option<PathBuf>,
    },
    Status(StatusMessage),
}

impl PlaybackEvent {
    /// File the event refers to, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            PlaybackEvent::TrackStarted { path, .. }
            | PlaybackEvent::TrackLooped { path }
            | PlaybackEvent::Seeked { path, .. } => Some(path),
            PlaybackEvent::Stopped { path, .. } => path.as_ref(),
            PlaybackEvent::PauseToggled { .. } | PlaybackEvent::Status(_) => None,
        }
    }
}
