// SPDX-License-Identifier: GPL-3.0-only

//! User configuration handling
//!
//! Persisted as JSON under the user config dir. Missing or unparsable
//! files fall back to defaults so a broken config never blocks startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backends::camera::{CameraBackendType, CameraFacing};
use crate::constants::UPLOAD_FIELD;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Required camera facing; None accepts any device
    pub facing: Option<CameraFacing>,
    /// Explicit camera index override
    pub camera_index: Option<usize>,
    /// Seconds between periodic still captures
    pub capture_interval_secs: f64,
    /// Milliseconds between live metadata scans
    pub scan_interval_ms: u64,
    /// Upload endpoint; uploads are skipped when unset
    pub upload_url: Option<String>,
    /// Multipart field name the upload server expects
    pub upload_field: String,
    /// Directory for saved portraits; defaults to the pictures dir
    pub output_dir: Option<PathBuf>,
    /// Camera backend to use
    pub backend: CameraBackendType,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            facing: None,
            camera_index: None,
            capture_interval_secs: 2.0,
            scan_interval_ms: 200,
            upload_url: None,
            upload_field: UPLOAD_FIELD.to_string(),
            output_dir: None,
            backend: CameraBackendType::default(),
        }
    }
}

impl Config {
    /// Trigger cadence as a duration
    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs_f64(self.capture_interval_secs.max(0.1))
    }

    /// Live scan cadence as a duration
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(10))
    }

    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("autoshot").join("config.json"))
    }

    /// Load the config from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&data) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = ?path, error = %e, "Unparsable config; using defaults");
                Self::default()
            }
        }
    }

    /// Persist to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_conversions() {
        let config = Config::default();
        assert_eq!(config.capture_interval(), Duration::from_secs(2));
        assert_eq!(config.scan_interval(), Duration::from_millis(200));

        // Degenerate values are clamped
        let config = Config {
            capture_interval_secs: 0.0,
            scan_interval_ms: 0,
            ..Config::default()
        };
        assert!(config.capture_interval() >= Duration::from_millis(100));
        assert!(config.scan_interval() >= Duration::from_millis(10));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/config.json"));
        assert_eq!(config, Config::default());
    }
}
