//! Audio fixture generation
//!
//! Raw PCM fixtures are filled with a constant sample value so gain
//! changes show up directly in the peaks recorded by the mock device.
//! WAV fixtures exist only to exercise container rejection.

use hound::{WavSpec, WavWriter};
use rawnav_ap::audio::format::{BYTES_PER_FRAME, BYTES_PER_SECOND};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Sample value written to every channel of raw fixtures
pub const FIXTURE_LEVEL: i16 = 10_000;

/// Write `frames` stereo frames of [`FIXTURE_LEVEL`]
pub fn write_raw_pcm<P: AsRef<Path>>(path: P, frames: u64) -> io::Result<()> {
    let frame = {
        let le = FIXTURE_LEVEL.to_le_bytes();
        [le[0], le[1], le[0], le[1]]
    };
    let bytes: Vec<u8> = frame
        .iter()
        .copied()
        .cycle()
        .take((frames * BYTES_PER_FRAME) as usize)
        .collect();
    fs::write(path, bytes)
}

/// Write a raw fixture lasting `seconds`
pub fn write_raw_seconds<P: AsRef<Path>>(path: P, seconds: f64) -> io::Result<()> {
    let frames = (seconds * BYTES_PER_SECOND as f64) as u64 / BYTES_PER_FRAME;
    write_raw_pcm(path, frames)
}

/// Generate a silent stereo 16-bit WAV file
pub fn generate_silent_wav<P: AsRef<Path>>(path: P, duration_ms: u64) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;

    let total_samples = 44_100 * duration_ms / 1000 * 2;
    for _ in 0..total_samples {
        writer.write_sample(0i16)?;
    }
    writer.finalize()
}

/// Temporary directory holding fixtures for one test
pub struct FixtureDir {
    dir: TempDir,
}

impl FixtureDir {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    /// Canonical root, matching the paths the engine reports
    pub fn path(&self) -> PathBuf {
        fs::canonicalize(self.dir.path()).unwrap_or_else(|_| self.dir.path().to_path_buf())
    }

    pub fn raw(&self, name: &str, seconds: f64) -> io::Result<PathBuf> {
        let path = self.path().join(name);
        write_raw_seconds(&path, seconds)?;
        Ok(path)
    }

    pub fn bytes(&self, name: &str, content: &[u8]) -> io::Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    pub fn wav(&self, name: &str, duration_ms: u64) -> Result<PathBuf, hound::Error> {
        let path = self.path().join(name);
        generate_silent_wav(&path, duration_ms)?;
        Ok(path)
    }

    pub fn subdir(&self, name: &str) -> io::Result<PathBuf> {
        let path = self.path().join(name);
        fs::create_dir_all(&path)?;
        Ok(path)
    }
}
