// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera backend
//!
//! Serves frames from memory or from a directory of image files instead of
//! hardware. Used by the test suite and by `run --source <dir>` for
//! headless demos. Captures can be scripted to fail, which is how the
//! per-cycle error paths are exercised.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info, warn};

use super::types::*;
use super::v4l2::encode_still;
use super::CameraBackend;

/// Scripted camera backend for tests and demos
pub struct SyntheticBackend {
    frames: Vec<CameraFrame>,
    cursor: AtomicUsize,
    attached: bool,
    streaming: bool,
    fail_captures: AtomicUsize,
}

impl SyntheticBackend {
    /// Create a backend with no frames; captures report `NoFrame`
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            cursor: AtomicUsize::new(0),
            attached: false,
            streaming: false,
            fail_captures: AtomicUsize::new(0),
        }
    }

    /// Create a backend cycling through the given frames
    pub fn from_frames(frames: Vec<CameraFrame>) -> Self {
        Self {
            frames,
            ..Self::new()
        }
    }

    /// Create a backend from the JPEG/PNG files in a directory
    pub fn from_dir(dir: &Path) -> std::io::Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| {
                        let ext = ext.to_string_lossy();
                        ext.eq_ignore_ascii_case("jpg")
                            || ext.eq_ignore_ascii_case("jpeg")
                            || ext.eq_ignore_ascii_case("png")
                    })
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut frames = Vec::new();
        for path in paths {
            match image::open(&path) {
                Ok(img) => {
                    let rgba = img.to_rgba8();
                    let (width, height) = rgba.dimensions();
                    frames.push(CameraFrame::from_rgba(width, height, rgba.into_raw()));
                }
                Err(e) => {
                    warn!(path = ?path, error = %e, "Skipping unreadable image");
                }
            }
        }

        info!(count = frames.len(), dir = ?dir, "Loaded synthetic frame source");
        Ok(Self::from_frames(frames))
    }

    /// Script the next `count` capture requests to fail
    pub fn fail_captures(self, count: usize) -> Self {
        self.fail_captures.store(count, Ordering::SeqCst);
        self
    }

    fn current_frame(&self) -> Option<CameraFrame> {
        if self.frames.is_empty() {
            return None;
        }
        let cursor = self.cursor.load(Ordering::SeqCst);
        Some(self.frames[cursor % self.frames.len()].clone())
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for SyntheticBackend {
    fn is_available(&self) -> bool {
        true
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        vec![CameraDevice {
            name: "Synthetic Camera".to_string(),
            path: "synthetic:0".to_string(),
            index: 0,
            facing: CameraFacing::Front,
            info: None,
        }]
    }

    fn attach(&mut self, device: &CameraDevice) -> BackendResult<()> {
        if device.index != 0 {
            return Err(BackendError::DeviceNotFound(format!(
                "no synthetic device at index {}",
                device.index
            )));
        }
        debug!("Attached synthetic frame source");
        self.attached = true;
        Ok(())
    }

    fn detach(&mut self) {
        self.streaming = false;
        self.attached = false;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn advertised_preview_formats(&self) -> Vec<PixelFormat> {
        vec![PixelFormat::Rgba, PixelFormat::Gray8]
    }

    fn start_streaming(&mut self) -> BackendResult<()> {
        if !self.attached {
            return Err(BackendError::DeviceNotFound(
                "no device attached".to_string(),
            ));
        }
        self.streaming = true;
        Ok(())
    }

    fn stop_streaming(&mut self) {
        self.streaming = false;
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn latest_frame(&self) -> Option<CameraFrame> {
        if !self.streaming {
            return None;
        }
        let frame = self.current_frame();
        if !self.frames.is_empty() {
            self.cursor.fetch_add(1, Ordering::SeqCst);
        }
        frame
    }

    fn capture_still(&self, settings: &CaptureSettings) -> BackendResult<StillCapture> {
        let pending = self.fail_captures.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_captures.store(pending - 1, Ordering::SeqCst);
            return Err(BackendError::Other("scripted capture failure".to_string()));
        }

        let frame = self.current_frame().ok_or(BackendError::NoFrame)?;
        encode_still(&frame, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(value: u8) -> CameraFrame {
        CameraFrame::from_rgba(4, 4, vec![value; 4 * 4 * 4])
    }

    #[test]
    fn test_frames_cycle_while_streaming() {
        let mut backend = SyntheticBackend::from_frames(vec![solid_frame(10), solid_frame(20)]);
        let device = backend.enumerate_cameras().remove(0);
        backend.attach(&device).unwrap();

        // Not streaming yet: no frames delivered
        assert!(backend.latest_frame().is_none());

        backend.start_streaming().unwrap();
        let a = backend.latest_frame().unwrap();
        let b = backend.latest_frame().unwrap();
        let c = backend.latest_frame().unwrap();
        assert_eq!(a.data[0], 10);
        assert_eq!(b.data[0], 20);
        assert_eq!(c.data[0], 10);
    }

    #[test]
    fn test_scripted_capture_failures_run_out() {
        let mut backend =
            SyntheticBackend::from_frames(vec![solid_frame(50)]).fail_captures(2);
        let device = backend.enumerate_cameras().remove(0);
        backend.attach(&device).unwrap();
        backend.start_streaming().unwrap();

        let settings = CaptureSettings {
            preview_format: Some(PixelFormat::Rgba),
            thumbnail_size: 2,
        };
        assert!(backend.capture_still(&settings).is_err());
        assert!(backend.capture_still(&settings).is_err());
        assert!(backend.capture_still(&settings).is_ok());
    }

    #[test]
    fn test_capture_without_frames_reports_no_sample() {
        let backend = SyntheticBackend::new();
        let settings = CaptureSettings {
            preview_format: None,
            thumbnail_size: 0,
        };
        assert!(matches!(
            backend.capture_still(&settings),
            Err(BackendError::NoFrame)
        ));
    }
}
