//! Audio device session interface
//!
//! The playback worker talks to the output hardware only through
//! [`AudioDevice`]. A session is opened through a [`DeviceOpener`] each
//! time a track starts; opening never aborts the process, it yields
//! [`DeviceError::Unavailable`] and the worker skips the track.
//!
//! Samples are interleaved stereo i16. Positions and counts are in frames
//! (one sample per channel).

use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Device-level failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Parameter negotiation or device lookup failed
    #[error("device unavailable: {0}")]
    Unavailable(String),

    /// The device ran dry; recoverable with [`AudioDevice::prepare`]
    #[error("buffer underrun")]
    Underrun,

    /// Unrecoverable failure, the session must be torn down
    #[error("device lost: {0}")]
    Lost(String),
}

/// An open output stream
pub trait AudioDevice {
    /// Block until at least one frame can be written or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout. A pending underrun reports `Ok(true)`
    /// so the next [`write`](AudioDevice::write) surfaces it.
    fn wait_writable(&mut self, timeout: Duration) -> Result<bool, DeviceError>;

    /// Queue interleaved samples, returning the number of frames accepted
    ///
    /// May accept fewer frames than offered (including zero) when the
    /// device buffer is full.
    fn write(&mut self, samples: &[i16]) -> Result<usize, DeviceError>;

    /// Skip up to `frames` queued frames that have not been played yet.
    /// Returns the number skipped.
    fn forward(&mut self, frames: u64) -> u64;

    /// Withdraw up to `frames` of the most recently queued frames.
    /// Returns the number withdrawn.
    fn rewind(&mut self, frames: u64) -> u64;

    /// Discard everything queued
    fn drop_pending(&mut self);

    /// Clear an underrun and make the device ready to accept writes again
    fn prepare(&mut self) -> Result<(), DeviceError>;

    /// Human-readable device description for logs
    fn describe(&self) -> String;
}

/// Factory for device sessions, shared with the worker thread
pub trait DeviceOpener: Send + Sync {
    fn open(&self) -> Result<Box<dyn AudioDevice>, DeviceError>;
}

/// Deliver a whole chunk to the device
///
/// Partial writes are continued after waiting for readiness. An underrun
/// gets one prepare-and-retry; a second underrun before any further
/// progress, a write that makes no progress for `stall_timeout`, or any
/// other failure is reported as [`DeviceError::Lost`].
pub fn write_chunk(
    device: &mut dyn AudioDevice,
    samples: &[i16],
    poll_interval: Duration,
    stall_timeout: Duration,
) -> Result<(), DeviceError> {
    let channels = super::format::CHANNELS as usize;
    let mut offset = 0;
    let mut retried_underrun = false;
    let mut last_progress = Instant::now();

    while offset < samples.len() {
        if last_progress.elapsed() >= stall_timeout {
            return Err(DeviceError::Lost(format!(
                "write stalled for {} ms",
                stall_timeout.as_millis()
            )));
        }

        let wait = poll_interval.min(stall_timeout);
        match device.wait_writable(wait) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(DeviceError::Underrun) => {}
            Err(e) => return Err(e),
        }

        match device.write(&samples[offset..]) {
            Ok(0) => {
                // Readiness without room; give the consumer a moment
                thread::sleep(Duration::from_millis(1));
            }
            Ok(frames) => {
                offset += frames * channels;
                retried_underrun = false;
                last_progress = Instant::now();
            }
            Err(DeviceError::Underrun) if !retried_underrun => {
                debug!("Underrun on write, re-preparing device");
                device.prepare()?;
                retried_underrun = true;
            }
            Err(DeviceError::Underrun) => {
                warn!("Underrun persisted after prepare");
                return Err(DeviceError::Lost("underrun persisted after prepare".to_string()));
            }
            Err(DeviceError::Unavailable(reason)) => return Err(DeviceError::Lost(reason)),
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
