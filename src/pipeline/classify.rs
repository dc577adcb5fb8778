// SPDX-License-Identifier: GPL-3.0-only

//! Face classification of captured stills
//!
//! The classifier inspects one still image per capture cycle and reports
//! the first detected face. Detection itself is pluggable through the
//! [`FaceDetector`] trait; the built-in [`SkinToneDetector`] is a
//! dependency-free heuristic good enough for portraits against
//! non-skin-colored backgrounds.
//!
//! Smile and eye positions are reported and logged but never change
//! control flow: any detected face terminates the capture loop.

use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use tracing::{debug, info};

use crate::backends::camera::{FrameRegion, Point};
use crate::constants::DETECTOR_ORIENTATION_HINT;

/// Detector accuracy requested from [`FaceDetector`] implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorAccuracy {
    /// Favor speed
    Low,
    /// Favor detection quality
    #[default]
    High,
}

/// One detected face in a still image
///
/// Derived per classification call; not persisted across calls.
#[derive(Debug, Clone)]
pub struct FaceObservation {
    /// Face bounds, normalized to the image dimensions
    pub bounding_box: FrameRegion,
    /// Whether the face appears to be smiling; observational only
    pub has_smile: bool,
    /// Left eye position when resolvable
    pub left_eye: Option<Point>,
    /// Right eye position when resolvable
    pub right_eye: Option<Point>,
}

/// Pluggable face detection backend
///
/// The orientation hint is an EXIF-style value describing how the sensor
/// was oriented; implementations honoring it can detect rotated faces.
pub trait FaceDetector: Send + Sync {
    fn detect(
        &self,
        image: &RgbaImage,
        accuracy: DetectorAccuracy,
        orientation_hint: u32,
    ) -> Vec<FaceObservation>;
}

/// Classifies still images and decides loop continuation
#[derive(Clone)]
pub struct FaceClassifier {
    detector: Arc<dyn FaceDetector>,
    accuracy: DetectorAccuracy,
    orientation_hint: u32,
}

impl FaceClassifier {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            detector,
            accuracy: DetectorAccuracy::High,
            orientation_hint: DETECTOR_ORIENTATION_HINT,
        }
    }

    /// Shared handle to the detector, for the live metadata scanner
    pub fn detector(&self) -> Arc<dyn FaceDetector> {
        Arc::clone(&self.detector)
    }

    /// Inspect a still image and return the first detected face
    pub fn classify(&self, image: &DynamicImage) -> Option<FaceObservation> {
        let rgba = image.to_rgba8();
        let faces = self
            .detector
            .detect(&rgba, self.accuracy, self.orientation_hint);
        let observation = faces.into_iter().next();

        match &observation {
            Some(face) => {
                info!(
                    x = face.bounding_box.x,
                    y = face.bounding_box.y,
                    width = face.bounding_box.width,
                    height = face.bounding_box.height,
                    "Found face bounds"
                );
                if face.has_smile {
                    info!("Face is smiling");
                }
                if let Some(eye) = face.left_eye {
                    debug!(x = eye.x, y = eye.y, "Left eye position");
                }
                if let Some(eye) = face.right_eye {
                    debug!(x = eye.x, y = eye.y, "Right eye position");
                }
            }
            None => debug!("No face found in still"),
        }

        observation
    }
}

/// Heuristic skin-tone face detector
///
/// Classifies pixels with a classic RGB skin rule, projects the mask onto
/// rows and columns to find the dominant blob, and accepts it as a face
/// when the blob is dense enough. Eye positions are estimated from face
/// geometry once the blob is wide enough to resolve them; the smile test
/// looks for a dark mouth line in the lower face.
pub struct SkinToneDetector {
    /// Minimum fraction of skin pixels within the blob's bounding box
    min_coverage: f32,
    /// Minimum blob edge length in pixels
    min_region: u32,
    /// Minimum blob width in pixels before eye positions are reported
    min_eye_width: u32,
}

impl SkinToneDetector {
    pub fn new() -> Self {
        Self {
            min_coverage: 0.35,
            min_region: 16,
            min_eye_width: 40,
        }
    }
}

impl Default for SkinToneDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn is_skin(r: u8, g: u8, b: u8) -> bool {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    r > 95 && g > 40 && b > 20 && max - min > 15 && r > g && r > b && r - g > 15
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

impl FaceDetector for SkinToneDetector {
    fn detect(
        &self,
        image: &RgbaImage,
        _accuracy: DetectorAccuracy,
        _orientation_hint: u32,
    ) -> Vec<FaceObservation> {
        let (width, height) = image.dimensions();
        if width < self.min_region || height < self.min_region {
            return Vec::new();
        }

        // Project the skin mask onto rows and columns
        let mut rows = vec![0u32; height as usize];
        let mut cols = vec![0u32; width as usize];
        let mut total = 0u64;
        for (x, y, pixel) in image.enumerate_pixels() {
            let [r, g, b, _] = pixel.0;
            if is_skin(r, g, b) {
                rows[y as usize] += 1;
                cols[x as usize] += 1;
                total += 1;
            }
        }

        if total < (self.min_region * self.min_region) as u64 {
            return Vec::new();
        }

        let Some((top, bottom)) = projection_span(&rows) else {
            return Vec::new();
        };
        let Some((left, right)) = projection_span(&cols) else {
            return Vec::new();
        };

        let box_width = right - left + 1;
        let box_height = bottom - top + 1;
        if box_width < self.min_region || box_height < self.min_region {
            return Vec::new();
        }

        let coverage = total as f32 / (box_width as f32 * box_height as f32);
        if coverage < self.min_coverage {
            return Vec::new();
        }

        let bounding_box =
            FrameRegion::from_pixels(left, top, box_width, box_height, width, height);

        // Eyes sit roughly at 30%/70% across and 38% down the face
        let (left_eye, right_eye) = if box_width >= self.min_eye_width {
            let eye_y = (top as f32 + box_height as f32 * 0.38) / height as f32;
            let left_eye = Point {
                x: (left as f32 + box_width as f32 * 0.3) / width as f32,
                y: eye_y,
            };
            let right_eye = Point {
                x: (left as f32 + box_width as f32 * 0.7) / width as f32,
                y: eye_y,
            };
            (Some(left_eye), Some(right_eye))
        } else {
            (None, None)
        };

        let has_smile = self.mouth_band_is_dark(image, left, top, box_width, box_height);

        vec![FaceObservation {
            bounding_box,
            has_smile,
            left_eye,
            right_eye,
        }]
    }
}

impl SkinToneDetector {
    /// Smile heuristic: an open or smiling mouth reads as a dark band in
    /// the lower third of the face
    fn mouth_band_is_dark(
        &self,
        image: &RgbaImage,
        left: u32,
        top: u32,
        box_width: u32,
        box_height: u32,
    ) -> bool {
        let band_top = top + (box_height as f32 * 0.65) as u32;
        let band_bottom = top + (box_height as f32 * 0.80) as u32;
        let band_left = left + (box_width as f32 * 0.25) as u32;
        let band_right = left + (box_width as f32 * 0.75) as u32;

        let mut dark = 0u32;
        let mut sampled = 0u32;
        for y in band_top..band_bottom.min(image.height()) {
            for x in band_left..band_right.min(image.width()) {
                let [r, g, b, _] = image.get_pixel(x, y).0;
                if luma(r, g, b) < 80 {
                    dark += 1;
                }
                sampled += 1;
            }
        }

        sampled > 0 && dark as f32 / sampled as f32 > 0.04
    }
}

/// Find the span of indices whose projection count reaches a quarter of
/// the peak, trimming stray outliers
fn projection_span(counts: &[u32]) -> Option<(u32, u32)> {
    let peak = *counts.iter().max()?;
    if peak == 0 {
        return None;
    }
    let threshold = (peak / 4).max(1);
    let first = counts.iter().position(|&c| c >= threshold)?;
    let last = counts.iter().rposition(|&c| c >= threshold)?;
    Some((first as u32, last as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const SKIN: [u8; 4] = [210, 160, 120, 255];

    /// Image with a centered skin-colored block on a dark background
    fn portrait(width: u32, height: u32, face: Option<(u32, u32, u32, u32)>) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([20, 40, 80, 255]));
        if let Some((fx, fy, fw, fh)) = face {
            for y in fy..fy + fh {
                for x in fx..fx + fw {
                    img.put_pixel(x, y, Rgba(SKIN));
                }
            }
        }
        img
    }

    #[test]
    fn test_no_face_on_blank_image() {
        let detector = SkinToneDetector::default();
        let img = portrait(120, 120, None);
        assert!(
            detector
                .detect(&img, DetectorAccuracy::High, DETECTOR_ORIENTATION_HINT)
                .is_empty()
        );
    }

    #[test]
    fn test_detects_skin_block_with_eyes() {
        let detector = SkinToneDetector::default();
        let img = portrait(160, 160, Some((40, 30, 80, 100)));
        let faces = detector.detect(&img, DetectorAccuracy::High, DETECTOR_ORIENTATION_HINT);
        assert_eq!(faces.len(), 1);

        let face = &faces[0];
        assert!((face.bounding_box.x - 0.25).abs() < 0.05);
        assert!((face.bounding_box.width - 0.5).abs() < 0.05);
        // 80 px wide face resolves eye positions
        assert!(face.left_eye.is_some());
        assert!(face.right_eye.is_some());
        let (l, r) = (face.left_eye.unwrap(), face.right_eye.unwrap());
        assert!(l.x < r.x);
        // A flat skin block has no dark mouth line
        assert!(!face.has_smile);
    }

    #[test]
    fn test_smile_from_dark_mouth_band() {
        let detector = SkinToneDetector::default();
        let mut img = portrait(160, 160, Some((40, 30, 80, 100)));
        // Paint a dark mouth line in the lower face
        for y in 102..108 {
            for x in 60..100 {
                img.put_pixel(x, y, Rgba([30, 10, 10, 255]));
            }
        }
        let faces = detector.detect(&img, DetectorAccuracy::High, DETECTOR_ORIENTATION_HINT);
        assert_eq!(faces.len(), 1);
        assert!(faces[0].has_smile);
    }

    #[test]
    fn test_small_face_omits_eye_positions() {
        let detector = SkinToneDetector::default();
        let img = portrait(120, 120, Some((50, 50, 24, 24)));
        let faces = detector.detect(&img, DetectorAccuracy::High, DETECTOR_ORIENTATION_HINT);
        assert_eq!(faces.len(), 1);
        assert!(faces[0].left_eye.is_none());
        assert!(faces[0].right_eye.is_none());
    }

    #[test]
    fn test_classifier_returns_first_face() {
        let classifier = FaceClassifier::new(Arc::new(SkinToneDetector::default()));
        let img = DynamicImage::ImageRgba8(portrait(160, 160, Some((40, 30, 80, 100))));
        assert!(classifier.classify(&img).is_some());

        let blank = DynamicImage::ImageRgba8(portrait(160, 160, None));
        assert!(classifier.classify(&blank).is_none());
    }
}
