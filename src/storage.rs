// SPDX-License-Identifier: GPL-3.0-only

//! Storage utilities for captured stills

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::errors::AppResult;

/// Default directory for saved portraits
pub fn default_picture_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("autoshot")
}

/// Save a captured JPEG under a timestamped name
///
/// Creates the directory if needed and returns the written path.
pub async fn save_still(jpeg: &[u8], dir: &Path) -> AppResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let name = format!("portrait_{}.jpg", Local::now().format("%Y-%m-%d_%H-%M-%S"));
    let path = dir.join(name);
    tokio::fs::write(&path, jpeg).await?;

    info!(path = ?path, size = jpeg.len(), "Saved captured still");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_still_writes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xD9];

        let path = save_still(&bytes, dir.path()).await.unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().unwrap(), "jpg");
        assert_eq!(tokio::fs::read(&path).await.unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_save_still_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");

        let path = save_still(&[0xFF, 0xD8], &nested).await.unwrap();
        assert!(path.exists());
    }
}
