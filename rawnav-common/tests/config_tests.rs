//! Tests for bootstrap configuration and graceful degradation
//!
//! Covers:
//! - Missing TOML files do not cause termination (defaults apply)
//! - Explicit config paths must exist
//! - Section defaults when keys are omitted
//! - Priority order for start directory resolution
//!
//! Tests that manipulate RAWNAV_START_DIR are marked with #[serial]
//! so they never race on the process environment.

use rawnav_common::config::{resolve_start_dir, TomlConfig, START_DIR_ENV};
use rawnav_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[test]
fn test_empty_toml_uses_all_defaults() {
    let config = TomlConfig::from_toml_str("").unwrap();

    assert!(config.start_dir.is_none());
    assert_eq!(config.logging.level, "rawnav_ap=info,rawnav_common=info");
    assert!(config.logging.file.is_none());
    assert_eq!(config.playback.fade_steps, 24);
    assert_eq!(config.playback.fade_curve, "linear");
    assert_eq!(config.playback.chunk_bytes, 4096);
    assert_eq!(config.playback.poll_interval_ms, 100);
    assert_eq!(config.playback.stop_ack_timeout_ms, 3000);
    assert_eq!(config.playback.shutdown_timeout_ms, 3000);
    assert_eq!(config.playback.seek_step_secs, 10);
    assert_eq!(config.playback.playlist_extensions, vec!["raw".to_string()]);
    assert!(config.device.name.is_none());
    assert_eq!(config.device.sample_rate, 44_100);
    assert_eq!(config.device.period_frames, 256);
    assert_eq!(config.device.buffer_frames, 4096);
    assert_eq!(config.device.stall_timeout_ms, 2000);
}

#[test]
fn test_partial_sections_keep_remaining_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
start_dir = "/srv/audio"

[playback]
fade_steps = 8
playlist_extensions = ["raw", "pcm"]

[device]
name = "USB DAC"
"#,
    )
    .unwrap();

    assert_eq!(config.start_dir, Some(PathBuf::from("/srv/audio")));
    assert_eq!(config.playback.fade_steps, 8);
    assert_eq!(config.playback.chunk_bytes, 4096);
    assert_eq!(config.playback.playlist_extensions.len(), 2);
    assert_eq!(config.device.name.as_deref(), Some("USB DAC"));
    assert_eq!(config.device.period_frames, 256);
}

#[test]
fn test_malformed_toml_is_reported() {
    let err = TomlConfig::from_toml_str("[playback\nfade_steps = ").unwrap_err();
    assert!(matches!(err, Error::Toml(_)), "got {:?}", err);
}

#[test]
fn test_wrong_type_is_reported() {
    let err = TomlConfig::from_toml_str("[playback]\nfade_steps = \"many\"").unwrap_err();
    assert!(matches!(err, Error::Toml(_)));
}

#[test]
fn test_load_explicit_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();

    let config = TomlConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_load_explicit_missing_file_is_error() {
    let err = TomlConfig::load(Some(Path::new("/nonexistent/rawnav/config.toml"))).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(START_DIR_ENV, "/tmp/from-env");
    let config = TomlConfig {
        start_dir: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };

    let dir = resolve_start_dir(Some(Path::new("/tmp/from-cli")), START_DIR_ENV, &config);
    assert_eq!(dir, PathBuf::from("/tmp/from-cli"));

    env::remove_var(START_DIR_ENV);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    env::set_var(START_DIR_ENV, "/tmp/from-env");
    let config = TomlConfig {
        start_dir: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };

    let dir = resolve_start_dir(None, START_DIR_ENV, &config);
    assert_eq!(dir, PathBuf::from("/tmp/from-env"));

    env::remove_var(START_DIR_ENV);
}

#[test]
#[serial]
fn test_toml_used_when_no_overrides() {
    env::remove_var(START_DIR_ENV);
    let config = TomlConfig {
        start_dir: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };

    let dir = resolve_start_dir(None, START_DIR_ENV, &config);
    assert_eq!(dir, PathBuf::from("/tmp/from-toml"));
}

#[test]
#[serial]
fn test_falls_back_to_current_dir() {
    env::remove_var(START_DIR_ENV);

    let dir = resolve_start_dir(None, START_DIR_ENV, &TomlConfig::default());
    assert_eq!(dir, env::current_dir().unwrap());
}
