// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Interval between periodic still-capture requests.
pub const CAPTURE_INTERVAL: Duration = Duration::from_secs(2);

/// Interval between live metadata scans of the preview stream.
pub const SCAN_INTERVAL: Duration = Duration::from_millis(200);

/// Edge length in pixels of the preview thumbnail requested with each
/// still capture.
pub const PREVIEW_THUMBNAIL_SIZE: u32 = 160;

/// EXIF-style orientation hint handed to face detectors before detection.
pub const DETECTOR_ORIENTATION_HINT: u32 = 5;

/// Maximum dimension frames are downscaled to before QR scanning.
///
/// Codes are typically large enough to be detected at this resolution,
/// and scanning full-resolution frames at the live cadence is wasteful.
pub const SCAN_MAX_DIMENSION: u32 = 640;

/// Depth of the pipeline event queue.
pub const EVENT_QUEUE_DEPTH: usize = 16;

/// Default multipart field name for image uploads.
pub const UPLOAD_FIELD: &str = "image";

/// File name of the bundled sample image shipped by the manual upload hook.
pub const SAMPLE_IMAGE: &str = "sample.jpg";

/// JPEG quality used when encoding captured stills.
pub const JPEG_QUALITY: u8 = 90;
