//! Audio output using cpal
//!
//! The worker pushes interleaved i16 frames into a bounded queue; the cpal
//! callback drains it on the audio thread. Write-readiness is signalled
//! through a condition variable whenever the callback frees space.
//!
//! The callback latches an underrun when the queue runs dry after audio
//! has been written, and the stream error callback latches device loss.
//! Both are reported to the worker on its next write.

use crate::audio::device::{AudioDevice, DeviceError, DeviceOpener};
use crate::audio::format::CHANNELS;
use crate::config::DeviceSettings;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig, StreamError,
    SupportedBufferSize,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Queue shared between the worker and the cpal callback
struct SampleQueue {
    samples: VecDeque<i16>,
    /// Audio has been written since the last prepare/drop
    primed: bool,
    underrun: bool,
    lost: Option<String>,
}

impl SampleQueue {
    /// Fill a device buffer, latching an underrun if the queue runs dry
    fn drain_into<T: Copy>(&mut self, out: &mut [T], silence: T, convert: impl Fn(i16) -> T) {
        let mut ran_dry = false;
        for slot in out.iter_mut() {
            *slot = match self.samples.pop_front() {
                Some(sample) => convert(sample),
                None => {
                    ran_dry = true;
                    silence
                }
            };
        }
        if ran_dry && self.primed {
            self.primed = false;
            self.underrun = true;
        }
    }
}

struct Shared {
    queue: Mutex<SampleQueue>,
    space: Condvar,
    /// Stream errors seen by the error callback
    error_count: AtomicU32,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SampleQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_stream_error(&self, err: StreamError) {
        self.error_count.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.lock();
        match err {
            StreamError::DeviceNotAvailable => {
                error!("Audio stream error: device not available");
                queue.lost = Some("device not available".to_string());
            }
            StreamError::BackendSpecific { err } => {
                warn!("Audio stream error: {} - marking for re-prepare", err);
                queue.underrun = true;
            }
        }
        drop(queue);
        self.space.notify_all();
    }
}

/// cpal-backed device session
pub struct CpalDevice {
    name: String,
    config: StreamConfig,
    sample_format: SampleFormat,
    /// Queue capacity in samples
    capacity: usize,
    shared: Arc<Shared>,
    stream: Stream,
}

impl CpalDevice {
    /// List available audio output devices
    pub fn list_devices() -> Result<Vec<String>, DeviceError> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| DeviceError::Unavailable(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open and start an output stream
    ///
    /// Falls back to the default device when the requested one is missing.
    pub fn open(settings: &DeviceSettings) -> Result<Self, DeviceError> {
        let (device, name) = select_device(settings.name.as_deref())?;
        let (config, sample_format) = negotiate_config(&device, settings)?;

        let capacity = settings.buffer_frames as usize * CHANNELS as usize;
        let shared = Arc::new(Shared {
            queue: Mutex::new(SampleQueue {
                samples: VecDeque::with_capacity(capacity),
                primed: false,
                underrun: false,
                lost: None,
            }),
            space: Condvar::new(),
            error_count: AtomicU32::new(0),
        });

        let stream = match sample_format {
            SampleFormat::I16 => build_stream(&device, &config, &shared, 0i16, |s| s)?,
            SampleFormat::F32 => {
                build_stream(&device, &config, &shared, 0.0f32, |s| s as f32 / 32768.0)?
            }
            other => {
                return Err(DeviceError::Unavailable(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| DeviceError::Unavailable(format!("Failed to start stream: {}", e)))?;

        info!(
            device = %name,
            sample_rate = config.sample_rate.0,
            format = ?sample_format,
            buffer_size = ?config.buffer_size,
            "Audio stream started"
        );

        Ok(Self {
            name,
            config,
            sample_format,
            capacity,
            shared,
            stream,
        })
    }

    fn has_room(queue: &SampleQueue, capacity: usize) -> bool {
        queue.samples.len() + CHANNELS as usize <= capacity
    }
}

impl AudioDevice for CpalDevice {
    fn wait_writable(&mut self, timeout: Duration) -> Result<bool, DeviceError> {
        let capacity = self.capacity;
        let queue = self.shared.lock();
        let (queue, _) = self
            .shared
            .space
            .wait_timeout_while(queue, timeout, |q| {
                q.lost.is_none() && !q.underrun && !Self::has_room(q, capacity)
            })
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(reason) = &queue.lost {
            return Err(DeviceError::Lost(reason.clone()));
        }
        Ok(queue.underrun || Self::has_room(&queue, capacity))
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, DeviceError> {
        let mut queue = self.shared.lock();
        if let Some(reason) = &queue.lost {
            return Err(DeviceError::Lost(reason.clone()));
        }
        if queue.underrun {
            return Err(DeviceError::Underrun);
        }

        let channels = CHANNELS as usize;
        let free_frames = self.capacity.saturating_sub(queue.samples.len()) / channels;
        let frames = free_frames.min(samples.len() / channels);
        queue.samples.extend(&samples[..frames * channels]);
        if frames > 0 {
            queue.primed = true;
        }
        Ok(frames)
    }

    fn forward(&mut self, frames: u64) -> u64 {
        let mut queue = self.shared.lock();
        let channels = CHANNELS as usize;
        let skip = (queue.samples.len() / channels).min(frames as usize);
        queue.samples.drain(..skip * channels);
        drop(queue);
        self.shared.space.notify_all();
        skip as u64
    }

    fn rewind(&mut self, frames: u64) -> u64 {
        let mut queue = self.shared.lock();
        let channels = CHANNELS as usize;
        let queued = queue.samples.len() / channels;
        let withdraw = queued.min(frames as usize);
        queue.samples.truncate((queued - withdraw) * channels);
        drop(queue);
        self.shared.space.notify_all();
        withdraw as u64
    }

    fn drop_pending(&mut self) {
        let mut queue = self.shared.lock();
        queue.samples.clear();
        queue.primed = false;
        drop(queue);
        self.shared.space.notify_all();
    }

    fn prepare(&mut self) -> Result<(), DeviceError> {
        let mut queue = self.shared.lock();
        if let Some(reason) = &queue.lost {
            return Err(DeviceError::Lost(reason.clone()));
        }
        queue.underrun = false;
        queue.primed = false;
        drop(queue);

        self.stream
            .play()
            .map_err(|e| DeviceError::Lost(format!("Failed to restart stream: {}", e)))
    }

    fn describe(&self) -> String {
        format!(
            "{} ({} Hz, {:?})",
            self.name, self.config.sample_rate.0, self.sample_format
        )
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        if let Err(e) = self.stream.pause() {
            warn!("Failed to pause stream on close: {}", e);
        }
        let errors = self.shared.error_count.load(Ordering::SeqCst);
        debug!(device = %self.name, stream_errors = errors, "Audio stream closed");
    }
}

fn select_device(requested: Option<&str>) -> Result<(Device, String), DeviceError> {
    let host = cpal::default_host();

    if let Some(name) = requested {
        let mut devices = host
            .output_devices()
            .map_err(|e| DeviceError::Unavailable(format!("Failed to enumerate devices: {}", e)))?;

        if let Some(dev) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            info!("Found requested audio device: {}", name);
            return Ok((dev, name.to_string()));
        }
        warn!("Requested device '{}' not found, falling back to default device", name);
    }

    let dev = host
        .default_output_device()
        .ok_or_else(|| DeviceError::Unavailable("No default output device found".to_string()))?;
    let name = dev.name().unwrap_or_else(|_| "Unknown".to_string());
    debug!("Using default audio device: {}", name);
    Ok((dev, name))
}

/// Pick a stereo i16 (preferred) or f32 configuration at the supported
/// rate nearest the requested one, with a fixed period when the device
/// reports a range.
fn negotiate_config(
    device: &Device,
    settings: &DeviceSettings,
) -> Result<(StreamConfig, SampleFormat), DeviceError> {
    let requested = settings.sample_rate;
    let candidates = device
        .supported_output_configs()
        .map_err(|e| DeviceError::Unavailable(format!("Failed to get device configs: {}", e)))?
        .filter(|c| c.channels() == CHANNELS)
        .filter(|c| matches!(c.sample_format(), SampleFormat::I16 | SampleFormat::F32));

    let mut best = None;
    for range in candidates {
        let rate = requested.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
        let distance = rate.abs_diff(requested);
        let format_rank = if range.sample_format() == SampleFormat::I16 { 0 } else { 1 };
        let key = (distance, format_rank);
        if best.as_ref().map_or(true, |(best_key, _, _)| key < *best_key) {
            best = Some((key, rate, range));
        }
    }

    let (_, rate, range) = best.ok_or_else(|| {
        DeviceError::Unavailable("no stereo i16 or f32 output configuration".to_string())
    })?;

    if rate != requested {
        warn!(
            requested,
            negotiated = rate,
            "Device does not support the requested rate; playback speed will differ"
        );
    }

    let sample_format = range.sample_format();
    let buffer_size = match range.buffer_size() {
        SupportedBufferSize::Range { min, max } => {
            BufferSize::Fixed(settings.period_frames.clamp(*min, *max))
        }
        SupportedBufferSize::Unknown => BufferSize::Default,
    };

    let mut config = range.with_sample_rate(SampleRate(rate)).config();
    config.buffer_size = buffer_size;
    Ok((config, sample_format))
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    shared: &Arc<Shared>,
    silence: T,
    convert: fn(i16) -> T,
) -> Result<Stream, DeviceError>
where
    T: cpal::SizedSample + Send + 'static,
{
    let data_shared = Arc::clone(shared);
    let error_shared = Arc::clone(shared);

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // Never block the audio thread on the worker
                match data_shared.queue.try_lock() {
                    Ok(mut queue) => {
                        queue.drain_into(data, silence, convert);
                        drop(queue);
                        data_shared.space.notify_one();
                    }
                    Err(_) => data.fill(silence),
                }
            },
            move |err| error_shared.on_stream_error(err),
            None,
        )
        .map_err(|e| DeviceError::Unavailable(format!("Failed to build stream: {}", e)))
}

/// Production opener: a fresh cpal stream per track
pub struct CpalOpener {
    settings: DeviceSettings,
}

impl CpalOpener {
    pub fn new(settings: DeviceSettings) -> Self {
        Self { settings }
    }
}

impl DeviceOpener for CpalOpener {
    fn open(&self) -> Result<Box<dyn AudioDevice>, DeviceError> {
        Ok(Box::new(CpalDevice::open(&self.settings)?))
    }
}
