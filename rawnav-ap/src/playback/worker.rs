//! Playback worker
//!
//! A dedicated OS thread that owns the open file and the device session
//! and drives the playback state machine:
//!
//! ```text
//! Idle -> Opening -> Streaming <-> Paused
//!           ^            |
//!           +-- Stopping <+        (Quit from any state)
//! ```
//!
//! Each loop iteration takes the control block lock once to decide what to
//! do, then performs file and device I/O outside the lock and re-locks
//! briefly to publish progress. Results of work done outside the lock are
//! discarded when the target changed in the meantime.
//!
//! While paused and silent the device keeps receiving zeroed chunks, so
//! buffer boundaries (and pending seeks) keep coming without reading the
//! file.

use crate::audio::device::{write_chunk, AudioDevice, DeviceError, DeviceOpener};
use crate::audio::format::{
    self, align_to_frame, decode_le_samples, display_name, duration_for_bytes, PcmFileInfo,
    BYTES_PER_FRAME, BYTES_PER_SECOND,
};
use crate::audio::source::{PcmSource, SourceOpener};
use crate::error::{Error, Result};
use crate::playback::control::{ControlState, PlaybackControl};
use crate::playback::events::{PlaybackEvent, StopReason};
use crate::playback::fader::{apply_ramp, FadeEnvelope, FadeState};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// An open track: the source and the device it streams into
struct Session {
    path: PathBuf,
    source: Box<dyn PcmSource>,
    device: Box<dyn AudioDevice>,
}

/// Decision taken under the lock at the top of an iteration
enum Plan {
    Quit,
    /// Handled under the lock (stop processed, or waited for a command)
    Continue,
    Open(PathBuf),
    Stream { seek_delta: i64 },
}

/// Result of one streaming step
enum ChunkOutcome {
    Wrote,
    WroteSilence,
    Skipped,
    EndOfFile,
    ReadFailed(io::Error),
    DeviceFailed(DeviceError),
}

/// The worker loop state, owned by the worker thread
pub struct PlaybackWorker {
    control: Arc<PlaybackControl>,
    opener: Arc<dyn DeviceOpener>,
    sources: Arc<dyn SourceOpener>,
    envelope: FadeEnvelope,
    poll_interval: Duration,
    stall_timeout: Duration,
    session: Option<Session>,
    /// Device carried over to the next playlist entry
    handoff: Option<Box<dyn AudioDevice>>,
    read_buf: Vec<u8>,
    samples: Vec<i16>,
}

impl PlaybackWorker {
    /// Start the worker thread
    pub fn spawn(
        control: Arc<PlaybackControl>,
        opener: Arc<dyn DeviceOpener>,
        sources: Arc<dyn SourceOpener>,
        stall_timeout: Duration,
    ) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("rawnav-playback".to_string())
            .spawn(move || PlaybackWorker::new(control, opener, sources, stall_timeout).run())
            .map_err(|e| Error::Playback(format!("Failed to spawn playback worker: {}", e)))
    }

    fn new(
        control: Arc<PlaybackControl>,
        opener: Arc<dyn DeviceOpener>,
        sources: Arc<dyn SourceOpener>,
        stall_timeout: Duration,
    ) -> Self {
        let settings = control.settings();
        let envelope = FadeEnvelope::new(settings.fade_steps, settings.fade_curve);
        let chunk_bytes = settings.chunk_bytes;
        let poll_interval = settings.poll_interval;
        Self {
            control,
            opener,
            sources,
            envelope,
            poll_interval,
            stall_timeout,
            session: None,
            handoff: None,
            read_buf: vec![0; chunk_bytes],
            samples: Vec::with_capacity(chunk_bytes / 2),
        }
    }

    fn run(mut self) {
        info!("Playback worker started");

        loop {
            match self.plan() {
                Plan::Quit => break,
                Plan::Continue => {}
                Plan::Open(path) => self.open(path),
                Plan::Stream { seek_delta } => self.stream(seek_delta),
            }
        }

        self.session = None;
        self.handoff = None;
        self.control.lock().active_path = None;
        info!("Playback worker exited");
    }

    fn plan(&mut self) -> Plan {
        let control = Arc::clone(&self.control);
        let mut state = control.lock();

        if state.quit {
            return Plan::Quit;
        }

        if let Some(reason) = state.stop.take() {
            self.halt(&mut state, reason);
            return Plan::Continue;
        }

        let switching = state.target_path != state.active_path || state.restart_pending;
        if switching {
            if let Some(target) = state.target_path.clone() {
                state.restart_pending = false;
                return Plan::Open(target);
            }
        }

        if self.session.is_none() {
            drop(control.wait_for_command(state, self.poll_interval));
            return Plan::Continue;
        }

        Plan::Stream {
            seek_delta: std::mem::take(&mut state.seek_delta),
        }
    }

    /// Release everything and return to idle
    fn halt(&mut self, state: &mut ControlState, reason: StopReason) {
        let path = state.active_path.clone().or_else(|| state.target_path.clone());
        if let Some(mut session) = self.session.take() {
            if matches!(reason, StopReason::User | StopReason::Reload) {
                session.device.drop_pending();
            }
        }
        self.handoff = None;
        state.reset_to_idle(self.envelope.steps());

        match reason {
            StopReason::EndOfPlaylist => self.control.report_status(state, "End of playlist reached"),
            StopReason::Finished => self.control.report_status(state, "Playback finished"),
            StopReason::User | StopReason::Reload | StopReason::Failed => {}
        }

        info!(?reason, "Playback stopped");
        self.control.emit(PlaybackEvent::Stopped { reason, path });
        self.control.acknowledge_stop();
    }

    /// Whether the open session is still what the control block wants
    fn is_current(state: &ControlState, path: &Path) -> bool {
        state.target_path.as_deref() == Some(path)
            && state.active_path.as_deref() == Some(path)
            && !state.restart_pending
            && state.stop.is_none()
            && !state.quit
    }

    fn open(&mut self, path: PathBuf) {
        // Close the previous session first; at most one is open at a time
        if self.session.take().is_some() {
            self.control.lock().active_path = None;
        }
        let reuse = self.handoff.take();
        let name = display_name(&path);

        let (info, source) = match self.load_track(&path) {
            Ok(track) => track,
            Err(e) => {
                self.skip_entry(&path, e.to_string());
                return;
            }
        };

        let device = match reuse {
            Some(device) => device,
            None => match self.opener.open() {
                Ok(device) => device,
                Err(e) => {
                    self.device_unavailable(&path, e);
                    return;
                }
            },
        };

        let control = Arc::clone(&self.control);
        let mut state = control.lock();
        if state.target_path.as_ref() != Some(&path)
            || state.restart_pending
            || state.stop.is_some()
            || state.quit
        {
            debug!("Target changed while opening {}, discarding", path.display());
            return;
        }

        info!(device = %device.describe(), size = info.size, "Opened {}", path.display());
        state.active_path = Some(path.clone());
        state.bytes_consumed = 0;
        state.total_bytes = info.size;
        state.duration_estimate = info.duration_secs;

        if info.short {
            let text = format!(
                "File '{}' is very small ({} bytes). Playback may be short.",
                name, info.size
            );
            control.report_status(&mut state, text);
        }

        let playlist_position = state
            .playlist
            .is_active()
            .then(|| (state.playlist.index, state.playlist.len()));
        let text = match playlist_position {
            Some((index, len)) => format!("Playing [{}/{}]: {}", index + 1, len, name),
            None if state.loop_enabled => format!("Playing (loop): {}", name),
            None => format!("Playing: {}", name),
        };
        control.report_status(&mut state, text);
        control.emit(PlaybackEvent::TrackStarted {
            path: path.clone(),
            duration_secs: info.duration_secs,
            playlist_position,
        });

        self.session = Some(Session {
            path,
            source,
            device,
        });
    }

    /// Validate `path` against the PCM contract and open its source
    fn load_track(&self, path: &Path) -> Result<(PcmFileInfo, Box<dyn PcmSource>)> {
        let info = format::probe(path)?;
        let source = self.sources.open(path).map_err(|e| {
            Error::Playback(format!("Cannot open '{}': {}", display_name(path), e))
        })?;
        Ok((info, source))
    }

    /// A file could not be played: try the next playlist entry or go idle
    fn skip_entry(&mut self, path: &Path, message: String) {
        let control = Arc::clone(&self.control);
        let mut state = control.lock();
        if state.target_path.as_deref() != Some(path) {
            warn!("{} (superseded)", message);
            return;
        }
        control.report_error(&mut state, message);

        let in_playlist = state.playlist.is_active();
        if in_playlist && state.playlist.index + 1 < state.playlist.len() {
            state.playlist.index += 1;
            state.target_path = state.playlist.current().cloned();
            state.reset_progress(self.envelope.steps());
        } else if in_playlist {
            self.halt(&mut state, StopReason::EndOfPlaylist);
        } else {
            self.halt(&mut state, StopReason::Failed);
        }
    }

    fn device_unavailable(&mut self, path: &Path, err: DeviceError) {
        let control = Arc::clone(&self.control);
        let mut state = control.lock();
        if state.target_path.as_deref() != Some(path) {
            warn!("Audio device unavailable: {} (superseded)", err);
            return;
        }
        control.report_error(&mut state, format!("Audio device unavailable: {}", err));
        self.halt(&mut state, StopReason::Failed);
    }

    /// Tear down the session after a read or device failure
    fn fail_session(&mut self, message: String) {
        let control = Arc::clone(&self.control);
        let mut state = control.lock();
        control.report_error(&mut state, message);
        self.halt(&mut state, StopReason::Failed);
    }

    fn stream(&mut self, seek_delta: i64) {
        if seek_delta != 0 {
            if let Err(e) = self.apply_seek(seek_delta) {
                let name = self.session_name();
                self.fail_session(format!("Seek failed on '{}': {}", name, e));
                return;
            }
        }

        match self.write_next_chunk() {
            ChunkOutcome::Wrote | ChunkOutcome::WroteSilence | ChunkOutcome::Skipped => {}
            ChunkOutcome::EndOfFile => self.end_of_track(),
            ChunkOutcome::ReadFailed(e) => {
                let name = self.session_name();
                self.fail_session(format!("Read error on '{}': {}", name, e));
            }
            ChunkOutcome::DeviceFailed(e) => {
                let name = self.session_name();
                self.fail_session(format!("Audio output error on '{}': {}", name, e));
            }
        }
    }

    fn session_name(&self) -> String {
        self.session
            .as_ref()
            .map(|s| display_name(&s.path))
            .unwrap_or_default()
    }

    /// Resolve a relative seek against the current stream position
    ///
    /// The file size is re-read first so the clamp uses the current length.
    fn apply_seek(&mut self, delta_secs: i64) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let size = session.source.byte_len()?;

        let control = Arc::clone(&self.control);
        let mut state = control.lock();
        if !Self::is_current(&state, &session.path) {
            return Ok(());
        }

        state.total_bytes = size;
        state.duration_estimate = duration_for_bytes(size);

        let current = state.bytes_consumed;
        let requested =
            current as i128 + delta_secs as i128 * BYTES_PER_SECOND as i128;
        let new_pos = align_to_frame(requested.clamp(0, size as i128) as u64);
        if new_pos == current {
            return Ok(());
        }

        session.source.seek(SeekFrom::Start(new_pos))?;

        let frames = new_pos.abs_diff(current) / BYTES_PER_FRAME;
        if new_pos > current {
            let skipped = session.device.forward(frames);
            debug!(frames, skipped, "Seek forward");
        } else {
            let withdrawn = session.device.rewind(frames);
            debug!(frames, withdrawn, "Seek backward");
        }
        session.device.prepare()?;

        state.bytes_consumed = new_pos;
        let position_secs = duration_for_bytes(new_pos);
        info!(position_secs, "Seeked {}", session.path.display());
        control.emit(PlaybackEvent::Seeked {
            path: session.path.clone(),
            position_secs,
        });
        Ok(())
    }

    /// Wait for readiness, then read, shape and write one chunk
    ///
    /// A silent pause writes a zeroed chunk instead and leaves the stream
    /// position alone.
    fn write_next_chunk(&mut self) -> ChunkOutcome {
        let Some(session) = self.session.as_mut() else {
            return ChunkOutcome::Skipped;
        };

        match session.device.wait_writable(self.poll_interval) {
            Ok(true) => {}
            Ok(false) => return ChunkOutcome::Skipped,
            Err(e) => return ChunkOutcome::DeviceFailed(e),
        }

        let (silent, ramp) = {
            let mut state = self.control.lock();
            if !Self::is_current(&state, &session.path) {
                return ChunkOutcome::Skipped;
            }
            if state.paused && state.fade == FadeState::Silent {
                (true, None)
            } else {
                let (mut fade, mut step) = (state.fade, state.fade_step);
                let ramp = self.envelope.advance(&mut fade, &mut step);
                state.fade = fade;
                state.fade_step = step;
                (false, ramp)
            }
        };

        if silent {
            self.samples.clear();
            self.samples.resize(self.read_buf.len() / 2, 0);
            return match write_chunk(
                session.device.as_mut(),
                &self.samples,
                self.poll_interval,
                self.stall_timeout,
            ) {
                Ok(()) => ChunkOutcome::WroteSilence,
                Err(e) => ChunkOutcome::DeviceFailed(e),
            };
        }

        let read = match read_full(&mut session.source, &mut self.read_buf) {
            Ok(read) => align_to_frame(read as u64) as usize,
            Err(e) => return ChunkOutcome::ReadFailed(e),
        };
        if read == 0 {
            return ChunkOutcome::EndOfFile;
        }

        decode_le_samples(&self.read_buf[..read], &mut self.samples);
        if let Some(ramp) = ramp {
            apply_ramp(&mut self.samples, ramp);
        }

        if let Err(e) = write_chunk(
            session.device.as_mut(),
            &self.samples,
            self.poll_interval,
            self.stall_timeout,
        ) {
            return ChunkOutcome::DeviceFailed(e);
        }

        let mut state = self.control.lock();
        if Self::is_current(&state, &session.path) {
            state.bytes_consumed += read as u64;
        }
        ChunkOutcome::Wrote
    }

    /// Advance the playlist, loop the file, or stop
    fn end_of_track(&mut self) {
        let control = Arc::clone(&self.control);
        let mut state = control.lock();
        let Some(path) = self.session.as_ref().map(|s| s.path.clone()) else {
            return;
        };
        if !Self::is_current(&state, &path) {
            return;
        }

        if state.playlist.is_active() {
            let index = state.playlist.index;
            let next_index = if index + 1 < state.playlist.len() {
                Some(index + 1)
            } else if state.loop_enabled {
                Some(0)
            } else {
                None
            };

            match next_index {
                Some(next_index) => {
                    state.playlist.index = next_index;
                    let next = state.playlist.entries[next_index].clone();
                    if next == path {
                        self.restart_in_place(&mut state, &path);
                        return;
                    }
                    debug!("Advancing playlist to {}", next.display());
                    // Keep the device open across entries
                    if let Some(session) = self.session.take() {
                        self.handoff = Some(session.device);
                    }
                    state.active_path = None;
                    state.target_path = Some(next);
                    state.bytes_consumed = 0;
                    state.total_bytes = 0;
                    state.duration_estimate = 0.0;
                }
                None => self.halt(&mut state, StopReason::EndOfPlaylist),
            }
        } else if state.loop_enabled {
            self.restart_in_place(&mut state, &path);
        } else {
            self.halt(&mut state, StopReason::Finished);
        }
    }

    fn restart_in_place(&mut self, state: &mut ControlState, path: &Path) {
        let rewound = match self.session.as_mut() {
            Some(session) => session.source.seek(SeekFrom::Start(0)).map(|_| ()),
            None => return,
        };

        match rewound {
            Ok(()) => {
                state.bytes_consumed = 0;
                debug!("Looping {}", path.display());
                self.control.emit(PlaybackEvent::TrackLooped {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => {
                let text = format!("Cannot rewind '{}': {}", display_name(path), e);
                self.control.report_error(state, text);
                self.halt(state, StopReason::Failed);
            }
        }
    }
}

/// Fill `buf` from `reader` until full or end of file
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
