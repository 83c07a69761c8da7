//! Playback control block
//!
//! The single record shared by the UI side and the playback worker. Every
//! access goes through one mutex, held for one command or one worker loop
//! iteration. Commands raise the `wake` condition so the worker never
//! sleeps through a change; the worker raises `stop_ack` once it has
//! processed a stop so a playlist load can wait for it.
//!
//! The stream and device handles are owned by the worker. The block records
//! `active_path` exactly while the worker holds an open session.

use crate::audio::format::{display_name, duration_for_bytes};
use crate::config::PlaybackSettings;
use crate::playback::events::{MessageLevel, PlaybackEvent, StatusMessage, StopReason};
use crate::playback::fader::FadeState;
use std::path::PathBuf;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Event channel depth
const EVENT_CAPACITY: usize = 256;

/// Ordered set of files played in sequence
///
/// Playlist mode is active exactly when `entries` is non-empty. The list
/// is only ever replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playlist {
    pub entries: Vec<PathBuf>,
    pub source_dir: Option<PathBuf>,
    pub index: usize,
}

impl Playlist {
    pub fn new(entries: Vec<PathBuf>, source_dir: PathBuf, index: usize) -> Self {
        Self {
            entries,
            source_dir: Some(source_dir),
            index,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn current(&self) -> Option<&PathBuf> {
        self.entries.get(self.index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Shared playback state, protected by the control block's mutex
#[derive(Debug)]
pub struct ControlState {
    /// File requested to play
    pub target_path: Option<PathBuf>,
    /// File the worker has open
    pub active_path: Option<PathBuf>,
    /// Reopen the target even though it is already active
    pub restart_pending: bool,
    pub paused: bool,
    pub fade: FadeState,
    /// Fade level in `[0, fade_steps]`
    pub fade_step: u32,
    pub stop: Option<StopReason>,
    pub quit: bool,
    /// Bumped by every command that replaces what should play
    pub generation: u64,
    /// Pending relative seek in seconds, consumed by the worker
    pub seek_delta: i64,
    /// Stream position in bytes, always frame-aligned
    pub bytes_consumed: u64,
    pub total_bytes: u64,
    pub duration_estimate: f64,
    pub playlist: Playlist,
    pub loop_enabled: bool,
    pub last_message: Option<StatusMessage>,
}

impl ControlState {
    fn new(fade_steps: u32) -> Self {
        Self {
            target_path: None,
            active_path: None,
            restart_pending: false,
            paused: false,
            fade: FadeState::Audible,
            fade_step: fade_steps,
            stop: None,
            quit: false,
            generation: 0,
            seek_delta: 0,
            bytes_consumed: 0,
            total_bytes: 0,
            duration_estimate: 0.0,
            playlist: Playlist::default(),
            loop_enabled: false,
            last_message: None,
        }
    }

    /// A file is requested or open
    pub fn is_loaded(&self) -> bool {
        self.target_path.is_some() || self.active_path.is_some()
    }

    /// Clear progress and fade fields for a new track
    pub fn reset_progress(&mut self, fade_steps: u32) {
        self.paused = false;
        self.fade = FadeState::Audible;
        self.fade_step = fade_steps;
        self.seek_delta = 0;
        self.bytes_consumed = 0;
        self.total_bytes = 0;
        self.duration_estimate = 0.0;
    }

    /// Return to idle: no target, no session, no playlist
    pub fn reset_to_idle(&mut self, fade_steps: u32) {
        self.target_path = None;
        self.active_path = None;
        self.restart_pending = false;
        self.playlist.clear();
        self.reset_progress(fade_steps);
    }

    pub fn elapsed_secs(&self) -> f64 {
        duration_for_bytes(self.bytes_consumed)
    }
}

/// Consistent copy of the state surface shown by the UI
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    /// A file is open and not paused
    pub playing: bool,
    pub paused: bool,
    pub fade: FadeState,
    pub active_path: Option<PathBuf>,
    pub active_name: Option<String>,
    pub elapsed_secs: f64,
    pub total_secs: f64,
    pub bytes_consumed: u64,
    pub playlist_active: bool,
    pub playlist_dir: Option<PathBuf>,
    /// (index, length) when a playlist is active
    pub playlist_position: Option<(usize, usize)>,
    pub loop_enabled: bool,
    pub last_message: Option<StatusMessage>,
}

/// The shared control block
pub struct PlaybackControl {
    state: Mutex<ControlState>,
    wake: Condvar,
    stop_ack: Condvar,
    events: broadcast::Sender<PlaybackEvent>,
    settings: PlaybackSettings,
}

impl PlaybackControl {
    pub fn new(settings: PlaybackSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(ControlState::new(settings.fade_steps)),
            wake: Condvar::new(),
            stop_ack: Condvar::new(),
            events,
            settings,
        }
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    /// Lock the state, recovering from a poisoned mutex
    pub fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake the worker after a state change
    pub fn notify(&self) {
        self.wake.notify_all();
    }

    /// Worker side: wait for a command or the timeout
    pub fn wait_for_command<'a>(
        &self,
        guard: MutexGuard<'a, ControlState>,
        timeout: Duration,
    ) -> MutexGuard<'a, ControlState> {
        self.wake
            .wait_timeout(guard, timeout)
            .map(|(guard, _)| guard)
            .unwrap_or_else(|poisoned| poisoned.into_inner().0)
    }

    /// Caller side: wait until no stop is pending or the timeout elapses.
    /// Returns false on timeout.
    pub fn wait_for_stop_ack<'a>(
        &self,
        guard: MutexGuard<'a, ControlState>,
        timeout: Duration,
    ) -> (MutexGuard<'a, ControlState>, bool) {
        let (guard, result) = self
            .stop_ack
            .wait_timeout_while(guard, timeout, |state| state.stop.is_some() && !state.quit)
            .unwrap_or_else(PoisonError::into_inner);
        let acknowledged = !result.timed_out() || guard.stop.is_none();
        (guard, acknowledged)
    }

    /// Worker side: a stop has been processed
    pub fn acknowledge_stop(&self) {
        self.stop_ack.notify_all();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    pub fn emit(&self, event: PlaybackEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Record and publish a status line
    pub fn report_status(&self, state: &mut ControlState, text: impl Into<String>) {
        self.report(state, MessageLevel::Status, text.into());
    }

    /// Record and publish an error line
    pub fn report_error(&self, state: &mut ControlState, text: impl Into<String>) {
        self.report(state, MessageLevel::Error, text.into());
    }

    fn report(&self, state: &mut ControlState, level: MessageLevel, text: String) {
        match level {
            MessageLevel::Status => info!("{}", text),
            MessageLevel::Error => error!("{}", text),
        }
        let message = StatusMessage::new(level, text);
        state.last_message = Some(message.clone());
        self.emit(PlaybackEvent::Status(message));
    }

    /// Consistent copy of the state surface, taken under the lock
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let state = self.lock();
        snapshot_of(&state)
    }
}

fn snapshot_of(state: &ControlState) -> PlaybackSnapshot {
    let playlist_active = state.playlist.is_active();
    PlaybackSnapshot {
        playing: state.active_path.is_some() && !state.paused,
        paused: state.paused,
        fade: state.fade,
        active_path: state.active_path.clone(),
        active_name: state.active_path.as_deref().map(display_name),
        elapsed_secs: state.elapsed_secs(),
        total_secs: state.duration_estimate,
        bytes_consumed: state.bytes_consumed,
        playlist_active,
        playlist_dir: state.playlist.source_dir.clone(),
        playlist_position: playlist_active.then(|| (state.playlist.index, state.playlist.len())),
        loop_enabled: state.loop_enabled,
        last_message: state.last_message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_control_is_idle() {
        let control = PlaybackControl::new(PlaybackSettings::default());
        let snapshot = control.snapshot();

        assert!(!snapshot.playing);
        assert!(!snapshot.paused);
        assert_eq!(snapshot.fade, FadeState::Audible);
        assert!(snapshot.active_path.is_none());
        assert!(!snapshot.playlist_active);
        assert!(snapshot.playlist_position.is_none());
        assert_eq!(snapshot.elapsed_secs, 0.0);
        assert!(snapshot.last_message.is_none());
    }

    #[test]
    fn test_report_sets_last_message_and_emits() {
        let control = PlaybackControl::new(PlaybackSettings::default());
        let mut events = control.subscribe();

        {
            let mut state = control.lock();
            control.report_error(&mut state, "device lost");
        }

        let snapshot = control.snapshot();
        let message = snapshot.last_message.unwrap();
        assert!(message.is_error());
        assert_eq!(message.text, "device lost");

        match events.try_recv().unwrap() {
            PlaybackEvent::Status(status) => assert_eq!(status.text, "device lost"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_playlist_active_iff_non_empty() {
        let mut playlist = Playlist::default();
        assert!(!playlist.is_active());

        playlist = Playlist::new(vec![PathBuf::from("/a.raw")], PathBuf::from("/"), 0);
        assert!(playlist.is_active());
        assert_eq!(playlist.current(), Some(&PathBuf::from("/a.raw")));

        playlist.clear();
        assert!(!playlist.is_active());
        assert!(playlist.source_dir.is_none());
    }

    #[test]
    fn test_stop_ack_wait_times_out_when_unacknowledged() {
        let control = PlaybackControl::new(PlaybackSettings::default());
        let mut state = control.lock();
        state.stop = Some(StopReason::Reload);

        let (state, acknowledged) = control.wait_for_stop_ack(state, Duration::from_millis(20));
        assert!(!acknowledged);
        assert_eq!(state.stop, Some(StopReason::Reload));
    }
}
