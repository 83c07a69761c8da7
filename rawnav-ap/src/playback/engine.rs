//! Playback engine
//!
//! Owns the control block and the worker thread. The UI holds the engine,
//! issues commands through [`PlaybackEngine::control`] and consumes the
//! engine on exit through [`PlaybackEngine::shutdown`].

use crate::audio::device::DeviceOpener;
use crate::audio::source::{FileOpener, SourceOpener};
use crate::config::PlayerConfig;
use crate::error::Result;
use crate::playback::control::PlaybackControl;
use crate::playback::shutdown::{ShutdownCoordinator, ShutdownOutcome};
use crate::playback::worker::PlaybackWorker;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::info;

pub struct PlaybackEngine {
    control: Arc<PlaybackControl>,
    worker: JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl PlaybackEngine {
    /// Create the control block and start the worker, reading tracks from
    /// the filesystem
    pub fn start(config: &PlayerConfig, opener: Arc<dyn DeviceOpener>) -> Result<Self> {
        Self::with_sources(config, opener, Arc::new(FileOpener))
    }

    pub fn with_sources(
        config: &PlayerConfig,
        opener: Arc<dyn DeviceOpener>,
        sources: Arc<dyn SourceOpener>,
    ) -> Result<Self> {
        let control = Arc::new(PlaybackControl::new(config.playback.clone()));
        let worker = PlaybackWorker::spawn(
            Arc::clone(&control),
            opener,
            sources,
            config.device.stall_timeout,
        )?;

        info!(
            fade_steps = config.playback.fade_steps,
            fade_curve = %config.playback.fade_curve,
            "Playback engine started"
        );

        Ok(Self {
            control,
            worker,
            shutdown_timeout: config.playback.shutdown_timeout,
        })
    }

    pub fn control(&self) -> &Arc<PlaybackControl> {
        &self.control
    }

    /// Stop the worker, waiting at most the shutdown timeout while a file
    /// is open
    pub fn shutdown(self) -> ShutdownOutcome {
        ShutdownCoordinator::new(self.control, self.worker, self.shutdown_timeout).shutdown()
    }
}
