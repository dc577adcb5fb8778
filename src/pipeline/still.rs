// SPDX-License-Identifier: GPL-3.0-only

//! Still capture handling
//!
//! Issues one capture request per trigger fire and turns the completed
//! sample into a decoded image for classification. A request with no
//! active photo output fails silently: it logs and lets the next
//! scheduled fire try again.

use image::DynamicImage;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::PipelineEvent;
use crate::backends::camera::{BackendError, CaptureSettings};
use crate::constants::PREVIEW_THUMBNAIL_SIZE;
use crate::errors::CaptureError;
use crate::session::CaptureSessionManager;

/// Issues capture requests and decodes completed samples
pub struct StillCaptureHandler;

impl StillCaptureHandler {
    /// Request one still capture; the completion arrives as a
    /// [`PipelineEvent::PhotoCompleted`] event.
    ///
    /// Fails silently when the session has no active photo output.
    pub fn request_capture(session: &CaptureSessionManager, events: mpsc::Sender<PipelineEvent>) {
        let Some(outputs) = session.outputs() else {
            warn!("Capture requested with no active photo output");
            return;
        };

        let settings = CaptureSettings::from_advertised(
            &outputs.high_res.advertised_formats,
            PREVIEW_THUMBNAIL_SIZE,
        );
        let backend = session.backend();

        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                backend
                    .lock()
                    .unwrap()
                    .capture_still(&settings)
                    .map_err(CaptureError::from)
            })
            .await
            .unwrap_or_else(|e| Err(CaptureError::Backend(format!("capture task failed: {}", e))));

            if events
                .send(PipelineEvent::PhotoCompleted(result))
                .await
                .is_err()
            {
                debug!("Pipeline gone before capture completion");
            }
        });
    }

    /// Decode a completed capture into a still image at scale 1.0
    pub fn decode_still(capture: &crate::backends::camera::StillCapture) -> Result<DynamicImage, CaptureError> {
        image::load_from_memory(&capture.jpeg).map_err(|e| CaptureError::Decode(e.to_string()))
    }
}

impl From<BackendError> for CaptureError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NoFrame => CaptureError::NoSampleBuffer,
            other => CaptureError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{CameraFrame, StillCapture};
    use crate::backends::camera::v4l2::encode_still;
    use std::sync::Arc;

    #[test]
    fn test_decode_still_round_trip() {
        let frame = CameraFrame::from_rgba(16, 12, vec![180; 16 * 12 * 4]);
        let settings = CaptureSettings {
            preview_format: None,
            thumbnail_size: 0,
        };
        let capture = encode_still(&frame, &settings).unwrap();

        let image = StillCaptureHandler::decode_still(&capture).unwrap();
        assert_eq!(image.width(), 16);
        assert_eq!(image.height(), 12);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let capture = StillCapture {
            jpeg: Arc::from(vec![0u8; 32].into_boxed_slice()),
            width: 0,
            height: 0,
            thumbnail: None,
        };
        assert!(matches!(
            StillCaptureHandler::decode_still(&capture),
            Err(CaptureError::Decode(_))
        ));
    }

    #[test]
    fn test_no_frame_maps_to_missing_sample_buffer() {
        let err: CaptureError = BackendError::NoFrame.into();
        assert!(matches!(err, CaptureError::NoSampleBuffer));
    }
}
