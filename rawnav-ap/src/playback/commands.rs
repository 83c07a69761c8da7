//! Command interface
//!
//! Each command takes the control block lock once, mutates the state,
//! reports a status line and wakes the worker. Commands never touch the
//! audio file or the device. Directory scans for `next` and
//! `load_playlist` run before the lock is taken. The only wait is the
//! bounded stop acknowledgement in `load_playlist`.

use crate::audio::format::display_name;
use crate::playback::control::{ControlState, PlaybackControl, Playlist};
use crate::playback::events::{PlaybackEvent, StopReason};
use crate::playback::fader::FadeState;
use crate::playback::playlist::scan_directory;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Absolute, canonical form of a user-supplied path when it resolves
fn resolve(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

impl PlaybackControl {
    /// Claim the next target: a stop still pending is superseded, and a
    /// playlist load waiting on that stop gives up
    fn take_over(&self, state: &mut ControlState) {
        state.generation = state.generation.wrapping_add(1);
        if state.stop.take().is_some() {
            self.acknowledge_stop();
        }
    }

    /// Play a single file, leaving playlist mode
    ///
    /// Playing the file that is already active only updates the loop flag.
    pub fn play(&self, path: impl AsRef<Path>, loop_enabled: bool) {
        let path = resolve(path.as_ref());
        let steps = self.settings().fade_steps;
        let mut state = self.lock();
        self.take_over(&mut state);

        let already_active = state.active_path.as_ref() == Some(&path)
            && state.target_path.as_ref() == Some(&path)
            && !state.restart_pending;
        if already_active {
            state.loop_enabled = loop_enabled;
            state.playlist.clear();
            let text = if loop_enabled {
                "Loop mode enabled"
            } else {
                "Loop mode disabled"
            };
            self.report_status(&mut state, text);
            self.notify();
            return;
        }

        debug!("Play requested: {}", path.display());
        state.playlist.clear();
        state.loop_enabled = loop_enabled;
        state.target_path = Some(path);
        state.restart_pending = false;
        state.reset_progress(steps);
        self.notify();
    }

    /// Toggle pause with a fade in the matching direction
    pub fn pause_resume(&self) {
        let mut state = self.lock();
        if !state.is_loaded() {
            self.report_status(&mut state, "Nothing to pause");
            return;
        }

        if state.paused {
            state.paused = false;
            state.fade = FadeState::FadingIn;
            self.report_status(&mut state, "RESUMED (fading in)");
        } else {
            state.paused = true;
            state.fade = FadeState::FadingOut;
            self.report_status(&mut state, "PAUSED (fading out)");
        }

        self.emit(PlaybackEvent::PauseToggled {
            paused: state.paused,
        });
        self.notify();
    }

    /// Queue a relative seek; the worker applies it at the next buffer boundary
    pub fn seek_relative(&self, delta_secs: i64) {
        let mut state = self.lock();
        if !state.is_loaded() {
            let text = if delta_secs >= 0 {
                "Nothing to fast-forward"
            } else {
                "Nothing to rewind"
            };
            self.report_status(&mut state, text);
            return;
        }
        if delta_secs == 0 {
            return;
        }

        state.seek_delta = state.seek_delta.saturating_add(delta_secs);
        debug!(delta_secs, pending = state.seek_delta, "Seek queued");
        self.notify();
    }

    /// Stop playback and leave playlist mode
    pub fn stop(&self) {
        let mut state = self.lock();
        state.generation = state.generation.wrapping_add(1);
        state.stop = Some(StopReason::User);
        self.report_status(&mut state, "Playback stopped");
        self.notify();
    }

    /// Advance to the file after the current one in its directory
    ///
    /// The directory is rescanned and becomes the active playlist.
    pub fn next(&self) {
        let current = {
            let mut state = self.lock();
            match state.active_path.clone().or_else(|| state.target_path.clone()) {
                Some(path) => path,
                None => {
                    self.report_status(&mut state, "Nothing is playing");
                    return;
                }
            }
        };

        let Some(dir) = current.parent().map(Path::to_path_buf) else {
            let mut state = self.lock();
            self.report_error(&mut state, "Cannot determine the current directory");
            return;
        };

        let entries = match scan_directory(&dir, &self.settings().playlist_extensions) {
            Ok(entries) if !entries.is_empty() => entries,
            Ok(_) => {
                let mut state = self.lock();
                self.report_error(&mut state, format!("No playable files in {}", dir.display()));
                return;
            }
            Err(e) => {
                let mut state = self.lock();
                self.report_error(&mut state, format!("Cannot read {}: {}", dir.display(), e));
                return;
            }
        };

        let steps = self.settings().fade_steps;
        let mut state = self.lock();
        let index = match entries.iter().position(|p| *p == current) {
            None => {
                let text = format!(
                    "File '{}' not found, starting from the first",
                    display_name(&current)
                );
                self.report_status(&mut state, text);
                0
            }
            Some(i) if i + 1 < entries.len() => i + 1,
            Some(_) if state.loop_enabled => {
                self.report_status(&mut state, "Beginning of the list (loop)");
                0
            }
            Some(_) => {
                self.report_status(&mut state, "End of the file list");
                return;
            }
        };

        let next = entries[index].clone();
        self.take_over(&mut state);
        state.restart_pending = state.active_path.as_ref() == Some(&next);
        state.playlist = Playlist::new(entries, dir, index);
        state.target_path = Some(next.clone());
        state.reset_progress(steps);
        self.report_status(&mut state, format!("Next: {}", display_name(&next)));
        self.notify();
    }

    /// Replace the playlist with the eligible files of `dir`
    ///
    /// Returns the number of entries loaded; zero leaves playback untouched.
    pub fn load_playlist(&self, dir: impl AsRef<Path>) -> usize {
        let dir = resolve(dir.as_ref());
        let entries = match scan_directory(&dir, &self.settings().playlist_extensions) {
            Ok(entries) => entries,
            Err(e) => {
                let mut state = self.lock();
                self.report_error(&mut state, format!("Cannot read {}: {}", dir.display(), e));
                return 0;
            }
        };
        if entries.is_empty() {
            let mut state = self.lock();
            self.report_status(&mut state, format!("No playable files in {}", dir.display()));
            return 0;
        }

        let steps = self.settings().fade_steps;
        let mut state = self.lock();
        let generation = state.generation;

        if state.is_loaded() || state.stop.is_some() {
            state.stop = Some(StopReason::Reload);
            self.notify();

            let (guard, acknowledged) =
                self.wait_for_stop_ack(state, self.settings().stop_ack_timeout);
            state = guard;
            if !acknowledged {
                warn!(
                    "Worker did not acknowledge stop within {:?}",
                    self.settings().stop_ack_timeout
                );
                state.stop = None;
                self.report_error(
                    &mut state,
                    "Warning: audio stream not responding, continuing without waiting",
                );
            }
        }
        if state.quit {
            return 0;
        }
        if state.generation != generation {
            debug!("Playlist load of {} superseded by a later command", dir.display());
            return 0;
        }

        state.generation = state.generation.wrapping_add(1);
        let count = entries.len();
        let first = entries[0].clone();
        state.playlist = Playlist::new(entries, dir.clone(), 0);
        state.target_path = Some(first);
        state.restart_pending = false;
        state.reset_progress(steps);
        self.report_status(
            &mut state,
            format!("Playlist: {} files from {}", count, dir.display()),
        );
        self.notify();
        count
    }

    /// Flip loop mode for the loaded file
    pub fn toggle_loop(&self) {
        let mut state = self.lock();
        if !state.is_loaded() {
            self.report_status(&mut state, "Nothing to loop");
            return;
        }

        state.loop_enabled = !state.loop_enabled;
        let text = if state.loop_enabled {
            "Loop mode enabled"
        } else {
            "Loop mode disabled"
        };
        self.report_status(&mut state, text);
        self.notify();
    }
}
