// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use autoshot::backends::camera::CameraBackendType;
use autoshot::Config;

#[test]
fn test_config_default() {
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(config.capture_interval_secs, 2.0, "Capture cadence should default to 2 seconds");
    assert_eq!(config.upload_field, "image");
    assert_eq!(config.backend, CameraBackendType::V4l2);
    assert!(config.upload_url.is_none());
}

#[test]
fn test_config_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        capture_interval_secs: 3.5,
        camera_index: Some(1),
        upload_url: Some("https://example.invalid/upload".to_string()),
        backend: CameraBackendType::Synthetic,
        ..Config::default()
    };

    config.save_to(&path).unwrap();
    let loaded = Config::load_from(&path);
    assert_eq!(loaded, config);
}

#[test]
fn test_corrupt_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{not json").unwrap();

    assert_eq!(Config::load_from(&path), Config::default());
}
