//! Engine wired to a mock device

use super::mock_device::{MockDeviceHandle, MockOpener};
use super::mock_source::{MockSourceHandle, MockSourceOpener};
use rawnav_ap::config::PlayerConfig;
use rawnav_ap::playback::{
    PlaybackControl, PlaybackEngine, PlaybackEvent, ShutdownOutcome, StopReason,
};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Chunk of 0.1 s, so write counts map onto whole seconds
pub const TEST_CHUNK_BYTES: usize = 17_640;

pub const TEST_FADE_STEPS: u32 = 4;

/// Default wait for asynchronous effects
pub const WAIT: Duration = Duration::from_secs(5);

/// Short timeouts and small steps for fast tests
pub fn test_config() -> PlayerConfig {
    let mut config = PlayerConfig::default();
    config.playback.fade_steps = TEST_FADE_STEPS;
    config.playback.chunk_bytes = TEST_CHUNK_BYTES;
    config.playback.poll_interval = Duration::from_millis(10);
    config.playback.stop_ack_timeout = Duration::from_secs(2);
    config.playback.shutdown_timeout = Duration::from_millis(300);
    config.device.stall_timeout = Duration::from_millis(500);
    config
}

/// Poll `condition` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Collects every event published by the engine
pub struct EventRecorder {
    receiver: broadcast::Receiver<PlaybackEvent>,
    seen: Vec<PlaybackEvent>,
}

impl EventRecorder {
    pub fn new(control: &PlaybackControl) -> Self {
        Self {
            receiver: control.subscribe(),
            seen: Vec::new(),
        }
    }

    fn drain(&mut self) {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => self.seen.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    /// Wait for the `nth` (1-based) event matching `predicate`
    pub fn wait_for_nth(
        &mut self,
        nth: usize,
        timeout: Duration,
        predicate: impl Fn(&PlaybackEvent) -> bool,
    ) -> Option<PlaybackEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            self.drain();
            if let Some(event) = self.seen.iter().filter(|e| predicate(e)).nth(nth - 1) {
                return Some(event.clone());
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    pub fn wait_for(
        &mut self,
        predicate: impl Fn(&PlaybackEvent) -> bool,
    ) -> Option<PlaybackEvent> {
        self.wait_for_nth(1, WAIT, predicate)
    }

    pub fn wait_for_stop(&mut self) -> Option<StopReason> {
        match self.wait_for(|e| matches!(e, PlaybackEvent::Stopped { .. }))? {
            PlaybackEvent::Stopped { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Wait for a status line containing `text`
    pub fn wait_for_status(&mut self, text: &str) -> bool {
        self.wait_for(|e| matches!(e, PlaybackEvent::Status(m) if m.text.contains(text)))
            .is_some()
    }

    pub fn events(&mut self) -> Vec<PlaybackEvent> {
        self.drain();
        self.seen.clone()
    }

    pub fn started_count(&mut self, path: &Path) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, PlaybackEvent::TrackStarted { path: p, .. } if p == path))
            .count()
    }
}

/// Playback engine running against a mock device and mock sources
pub struct TestPlayer {
    pub engine: PlaybackEngine,
    pub device: MockDeviceHandle,
    pub source: MockSourceHandle,
    pub events: EventRecorder,
}

impl TestPlayer {
    pub fn start() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: PlayerConfig) -> Self {
        let device = MockDeviceHandle::new();
        let source = MockSourceHandle::new();
        let opener = Arc::new(MockOpener::new(device.clone()));
        let sources = Arc::new(MockSourceOpener::new(source.clone()));
        let engine =
            PlaybackEngine::with_sources(&config, opener, sources).expect("engine starts");
        let events = EventRecorder::new(engine.control());
        Self {
            engine,
            device,
            source,
            events,
        }
    }

    pub fn control(&self) -> &Arc<PlaybackControl> {
        self.engine.control()
    }

    /// Stream position in bytes
    pub fn position(&self) -> u64 {
        self.control().snapshot().bytes_consumed
    }

    pub fn shutdown(self) -> ShutdownOutcome {
        self.engine.shutdown()
    }
}
