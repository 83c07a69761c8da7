//! Test helper modules for rawnav-ap integration tests
//!
//! - MockDevice / MockOpener: scripted audio device with failure injection
//! - MockSource / MockSourceOpener: file-backed sources with read failures
//! - audio_generator: raw PCM and WAV fixtures
//! - harness: engine wired to a mock device, plus an event recorder

#![allow(dead_code)]

pub mod audio_generator;
pub mod harness;
pub mod mock_device;
pub mod mock_source;

pub use audio_generator::{generate_silent_wav, write_raw_pcm, write_raw_seconds, FixtureDir};
pub use harness::{test_config, wait_until, EventRecorder, TestPlayer};
pub use mock_device::{DeviceLogEntry, MockDeviceHandle, MockOpener};
pub use mock_source::{MockSourceHandle, MockSourceOpener};
