// SPDX-License-Identifier: GPL-3.0-only

//! Image upload collaborator
//!
//! Ships a finished JPEG to a remote endpoint as one multipart form
//! field and reports the outcome asynchronously. Callers only log the
//! result; there is no retry policy here.

use std::path::Path;

use rust_embed::RustEmbed;
use tracing::debug;

use crate::constants::{SAMPLE_IMAGE, UPLOAD_FIELD};
use crate::errors::UploadError;

/// Bundled assets shipped with the binary
#[derive(RustEmbed)]
#[folder = "res/"]
struct Assets;

/// Multipart image uploader
pub struct Uploader {
    client: reqwest::Client,
    endpoint: String,
    field: String,
}

impl Uploader {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
            field: UPLOAD_FIELD.to_string(),
        }
    }

    /// Override the multipart field name the server expects
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    /// Upload JPEG bytes under the configured field name
    ///
    /// Returns the server's JSON response payload on success.
    pub async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<serde_json::Value, UploadError> {
        debug!(
            endpoint = %self.endpoint,
            field = %self.field,
            file_name,
            size = bytes.len(),
            "Uploading image"
        );

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")
            .map_err(|e| UploadError::Encoding(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part(self.field.clone(), part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| UploadError::Encoding(e.to_string()))
    }

    /// Upload a JPEG file from disk
    pub async fn upload_file(&self, path: &Path) -> Result<serde_json::Value, UploadError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::Encoding(format!("failed to read {:?}: {}", path, e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image.jpg".to_string());
        self.upload_bytes(bytes, &file_name).await
    }

    /// Upload the bundled sample image, independent of the capture pipeline
    pub async fn upload_sample(&self) -> Result<serde_json::Value, UploadError> {
        let asset = Assets::get(SAMPLE_IMAGE)
            .ok_or_else(|| UploadError::Encoding("bundled sample image missing".to_string()))?;
        self.upload_bytes(asset.data.into_owned(), SAMPLE_IMAGE)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_asset_is_bundled() {
        let asset = Assets::get(SAMPLE_IMAGE).expect("sample image must be embedded");
        // JPEG magic bytes
        assert_eq!(&asset.data[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        // Nothing listens on this port
        let uploader = Uploader::new("http://127.0.0.1:9/upload");
        let result = uploader.upload_bytes(vec![0xFF, 0xD8, 0xFF, 0xD9], "x.jpg").await;
        assert!(matches!(result, Err(UploadError::Transport(_))));
    }
}
