// SPDX-License-Identifier: GPL-3.0-only

//! Live metadata scanning
//!
//! Produces per-frame metadata batches (decoded QR codes, face regions)
//! from the preview stream while the session is Running. Scanning is CPU
//! work, so each frame is analyzed on a blocking worker; frames are
//! downscaled before QR detection to keep up with the live cadence.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use image::GrayImage;
use image::imageops::FilterType;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::PipelineEvent;
use super::classify::{DetectorAccuracy, FaceDetector};
use crate::backends::camera::format_converters::frame_to_rgba;
use crate::backends::camera::{CameraFrame, FrameRegion, MetadataObject};
use crate::constants::{DETECTOR_ORIENTATION_HINT, SCAN_INTERVAL, SCAN_MAX_DIMENSION};
use crate::session::{SessionState, SharedBackend};

/// Live scan configuration, mirroring the session's metadata output
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Scan for machine-readable codes
    pub codes: bool,
    /// Scan for face regions
    pub faces: bool,
    /// Maximum dimension frames are downscaled to before code detection
    pub max_dimension: u32,
    /// Time between scans of the live stream
    pub cadence: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            codes: true,
            faces: true,
            max_dimension: SCAN_MAX_DIMENSION,
            cadence: SCAN_INTERVAL,
        }
    }
}

impl ScanConfig {
    /// A configuration that scans nothing; batches arrive empty
    pub fn disabled() -> Self {
        Self {
            codes: false,
            faces: false,
            ..Self::default()
        }
    }
}

/// Stream of preview frames, paced at the scan cadence
///
/// Pauses while the session is suspended and ends when the session's
/// state channel closes.
fn frames(
    backend: SharedBackend,
    mut state: watch::Receiver<SessionState>,
    cadence: Duration,
) -> impl Stream<Item = CameraFrame> {
    async_stream::stream! {
        let mut ticker = tokio::time::interval(cadence);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            let running = *state.borrow() == SessionState::Running;
            if !running {
                if state.changed().await.is_err() {
                    break;
                }
                continue;
            }
            ticker.tick().await;
            let frame = backend.lock().unwrap().latest_frame();
            if let Some(frame) = frame {
                yield frame;
            }
        }
    }
}

/// Spawn the live metadata scanner
///
/// Each scanned frame becomes one [`PipelineEvent::MetadataBatch`]; the
/// task exits when the event channel closes.
pub fn spawn_scanner(
    backend: SharedBackend,
    state: watch::Receiver<SessionState>,
    detector: Arc<dyn FaceDetector>,
    config: ScanConfig,
    events: mpsc::Sender<PipelineEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let stream = frames(backend, state, config.cadence);
        tokio::pin!(stream);

        while let Some(frame) = stream.next().await {
            let detector = Arc::clone(&detector);
            let config = config.clone();
            let batch =
                tokio::task::spawn_blocking(move || scan_frame(&frame, &config, detector.as_ref()))
                    .await
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "Metadata scan task panicked");
                        Vec::new()
                    });

            if events.send(PipelineEvent::MetadataBatch(batch)).await.is_err() {
                break;
            }
        }

        debug!("Metadata scanner exited");
    })
}

/// Scan one frame for codes and faces
///
/// Codes come first in the batch; the overlay gives machine-readable
/// codes priority over face regions.
pub fn scan_frame(
    frame: &CameraFrame,
    config: &ScanConfig,
    detector: &dyn FaceDetector,
) -> Vec<MetadataObject> {
    let Some(rgba) = frame_to_rgba(frame) else {
        warn!("Skipping unconvertible frame");
        return Vec::new();
    };

    let mut batch = Vec::new();

    if config.codes {
        batch.extend(detect_codes(&image::imageops::grayscale(&rgba), config.max_dimension));
    }

    if config.faces {
        for face in detector.detect(&rgba, DetectorAccuracy::Low, DETECTOR_ORIENTATION_HINT) {
            batch.push(MetadataObject::Face {
                region: face.bounding_box,
            });
        }
    }

    batch
}

/// Detect and decode QR codes in a grayscale frame
fn detect_codes(gray: &GrayImage, max_dimension: u32) -> Vec<MetadataObject> {
    let (width, height) = gray.dimensions();

    // Downscale for detection speed; regions are normalized so the scale
    // factor drops out
    let scaled = if width > max_dimension || height > max_dimension {
        let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
        image::imageops::resize(
            gray,
            (width as f32 / scale) as u32,
            (height as f32 / scale) as u32,
            FilterType::Triangle,
        )
    } else {
        gray.clone()
    };
    let (proc_width, proc_height) = scaled.dimensions();

    let mut prepared = rqrr::PreparedImage::prepare(scaled);
    let grids = prepared.detect_grids();
    trace!(count = grids.len(), "QR grid detection complete");

    let mut codes = Vec::new();
    for grid in grids {
        let xs: Vec<f32> = grid.bounds.iter().map(|p| p.x as f32).collect();
        let ys: Vec<f32> = grid.bounds.iter().map(|p| p.y as f32).collect();
        let min_x = xs.iter().cloned().fold(f32::MAX, f32::min).max(0.0);
        let max_x = xs.iter().cloned().fold(f32::MIN, f32::max);
        let min_y = ys.iter().cloned().fold(f32::MAX, f32::min).max(0.0);
        let max_y = ys.iter().cloned().fold(f32::MIN, f32::max);

        let payload = match grid.decode() {
            Ok((_meta, content)) => Some(content),
            Err(e) => {
                debug!(error = %e, "Detected code could not be decoded");
                None
            }
        };

        let region = FrameRegion {
            x: min_x / proc_width as f32,
            y: min_y / proc_height as f32,
            width: (max_x - min_x) / proc_width as f32,
            height: (max_y - min_y) / proc_height as f32,
        };

        codes.push(MetadataObject::Code { region, payload });
    }

    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::classify::SkinToneDetector;

    #[test]
    fn test_blank_frame_yields_empty_batch() {
        let frame = CameraFrame::from_rgba(64, 64, vec![255; 64 * 64 * 4]);
        let detector = SkinToneDetector::default();
        let batch = scan_frame(&frame, &ScanConfig::default(), &detector);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_disabled_scan_yields_empty_batch() {
        // Even a frame with a detectable face scans empty when disabled
        let mut rgba = image::RgbaImage::from_pixel(120, 120, image::Rgba([20, 40, 80, 255]));
        for y in 20..100 {
            for x in 20..100 {
                rgba.put_pixel(x, y, image::Rgba([210, 160, 120, 255]));
            }
        }
        let frame = CameraFrame::from_rgba(120, 120, rgba.into_raw());

        let detector = SkinToneDetector::default();
        assert!(scan_frame(&frame, &ScanConfig::disabled(), &detector).is_empty());
        assert!(!scan_frame(&frame, &ScanConfig::default(), &detector).is_empty());
    }

    #[test]
    fn test_face_scan_produces_face_objects() {
        let mut rgba = image::RgbaImage::from_pixel(120, 120, image::Rgba([20, 40, 80, 255]));
        for y in 20..100 {
            for x in 20..100 {
                rgba.put_pixel(x, y, image::Rgba([210, 160, 120, 255]));
            }
        }
        let frame = CameraFrame::from_rgba(120, 120, rgba.into_raw());

        let detector = SkinToneDetector::default();
        let batch = scan_frame(&frame, &ScanConfig::default(), &detector);
        assert!(batch
            .iter()
            .any(|obj| matches!(obj, MetadataObject::Face { .. })));
    }
}
