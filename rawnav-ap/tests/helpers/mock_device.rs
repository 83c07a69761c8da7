//! Scripted audio device for driving the playback worker in tests
//!
//! Every device opened by a [`MockOpener`] shares one [`MockDeviceHandle`],
//! through which a test controls readiness, injects failures and inspects
//! what the worker did.

use rawnav_ap::audio::{AudioDevice, DeviceError, DeviceOpener};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// Device-side operations in the order they happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceLogEntry {
    Opened,
    Write { frames: usize },
    Prepare,
    Forward { frames: u64 },
    Rewind { frames: u64 },
    Closed,
}

#[derive(Debug, Default)]
struct MockState {
    /// Writes still allowed; `None` is unlimited
    budget: Option<usize>,
    faults: VecDeque<DeviceError>,
    fail_open: bool,
    blocked: bool,
    opens: usize,
    prepares: usize,
    writes: usize,
    written_frames: u64,
    /// Peak absolute sample of each write
    peaks: Vec<i16>,
    log: Vec<DeviceLogEntry>,
}

/// Test-side control over the mock devices
#[derive(Debug, Clone, Default)]
pub struct MockDeviceHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockDeviceHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hold writes until [`allow_writes`](Self::allow_writes) is called
    pub fn gate(&self) {
        self.lock().budget = Some(0);
    }

    pub fn allow_writes(&self, count: usize) {
        let mut state = self.lock();
        state.budget = Some(state.budget.unwrap_or(0) + count);
    }

    pub fn ungate(&self) {
        self.lock().budget = None;
    }

    /// Fail the next write with `error`
    pub fn inject_fault(&self, error: DeviceError) {
        self.lock().faults.push_back(error);
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Make writes hang until unblocked
    pub fn set_blocked(&self, blocked: bool) {
        self.lock().blocked = blocked;
    }

    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    pub fn prepares(&self) -> usize {
        self.lock().prepares
    }

    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn written_frames(&self) -> u64 {
        self.lock().written_frames
    }

    pub fn peaks(&self) -> Vec<i16> {
        self.lock().peaks.clone()
    }

    pub fn log(&self) -> Vec<DeviceLogEntry> {
        self.lock().log.clone()
    }
}

/// One open session
pub struct MockDevice {
    handle: MockDeviceHandle,
}

impl AudioDevice for MockDevice {
    fn wait_writable(&mut self, timeout: Duration) -> Result<bool, DeviceError> {
        {
            let state = self.handle.lock();
            if !state.faults.is_empty() || state.budget.map_or(true, |left| left > 0) {
                return Ok(true);
            }
        }
        thread::sleep(timeout.min(Duration::from_millis(2)));
        Ok(false)
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, DeviceError> {
        while self.handle.lock().blocked {
            thread::sleep(Duration::from_millis(5));
        }

        let mut state = self.handle.lock();
        if let Some(fault) = state.faults.pop_front() {
            return Err(fault);
        }
        match state.budget {
            Some(0) => return Ok(0),
            Some(left) => state.budget = Some(left - 1),
            None => {}
        }

        let frames = samples.len() / 2;
        let peak = samples.iter().map(|s| s.saturating_abs()).max().unwrap_or(0);
        state.writes += 1;
        state.written_frames += frames as u64;
        state.peaks.push(peak);
        state.log.push(DeviceLogEntry::Write { frames });
        Ok(frames)
    }

    fn forward(&mut self, frames: u64) -> u64 {
        self.handle.lock().log.push(DeviceLogEntry::Forward { frames });
        0
    }

    fn rewind(&mut self, frames: u64) -> u64 {
        self.handle.lock().log.push(DeviceLogEntry::Rewind { frames });
        0
    }

    fn drop_pending(&mut self) {}

    fn prepare(&mut self) -> Result<(), DeviceError> {
        let mut state = self.handle.lock();
        state.prepares += 1;
        state.log.push(DeviceLogEntry::Prepare);
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.handle.lock().log.push(DeviceLogEntry::Closed);
    }
}

pub struct MockOpener {
    handle: MockDeviceHandle,
}

impl MockOpener {
    pub fn new(handle: MockDeviceHandle) -> Self {
        Self { handle }
    }
}

impl DeviceOpener for MockOpener {
    fn open(&self) -> Result<Box<dyn AudioDevice>, DeviceError> {
        let mut state = self.handle.lock();
        if state.fail_open {
            return Err(DeviceError::Unavailable("mock device disabled".to_string()));
        }
        state.opens += 1;
        state.log.push(DeviceLogEntry::Opened);
        drop(state);

        Ok(Box::new(MockDevice {
            handle: self.handle.clone(),
        }))
    }
}
