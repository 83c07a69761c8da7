//! Bounded shutdown of the playback worker
//!
//! When a file is open the worker may be blocked inside a device write, so
//! the join is bounded: the handle is polled until the timeout and then
//! abandoned. An idle worker is joined without a bound since it only ever
//! waits on the wake condition.

use crate::playback::control::PlaybackControl;
use rawnav_common::human_time::format_clock;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Interval between liveness checks while waiting for the worker
const JOIN_POLL: Duration = Duration::from_millis(100);

/// How the worker ended
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShutdownOutcome {
    /// The worker exited and was joined
    Joined,
    /// The worker did not exit in time and was left running
    Detached {
        /// Stream position when shutdown began
        elapsed_secs: f64,
    },
}

pub struct ShutdownCoordinator {
    control: Arc<PlaybackControl>,
    handle: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(control: Arc<PlaybackControl>, handle: JoinHandle<()>, timeout: Duration) -> Self {
        Self {
            control,
            handle: Some(handle),
            timeout,
        }
    }

    /// Ask the worker to quit and wait for it
    pub fn shutdown(mut self) -> ShutdownOutcome {
        let (was_active, elapsed_secs) = {
            let mut state = self.control.lock();
            let active = state.active_path.is_some();
            let elapsed = state.elapsed_secs();
            state.quit = true;
            (active, elapsed)
        };
        self.control.notify();
        self.control.acknowledge_stop();

        let Some(handle) = self.handle.take() else {
            return ShutdownOutcome::Joined;
        };

        if !was_active {
            join(handle);
            return ShutdownOutcome::Joined;
        }

        let started = Instant::now();
        while started.elapsed() < self.timeout {
            if handle.is_finished() {
                join(handle);
                return ShutdownOutcome::Joined;
            }
            thread::sleep(JOIN_POLL);
        }
        if handle.is_finished() {
            join(handle);
            return ShutdownOutcome::Joined;
        }

        warn!(
            "Playback worker did not finish within {:?}, interrupted at {}; leaving it",
            self.timeout,
            format_clock(elapsed_secs)
        );
        ShutdownOutcome::Detached { elapsed_secs }
    }
}

fn join(handle: JoinHandle<()>) {
    match handle.join() {
        Ok(()) => info!("Playback worker joined"),
        Err(_) => error!("Playback worker panicked"),
    }
}
