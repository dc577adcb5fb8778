// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Pixel format for camera frames
///
/// RGBA is the canonical format used throughout the pipeline; the other
/// formats are converted on the way in (see `format_converters`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    Rgba,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved), common raw webcam format
    Yuyv,
    /// UYVY - Packed 4:2:2 (U Y0 V Y1 interleaved)
    Uyvy,
    /// Gray8 - 8-bit grayscale, used by monochrome and IR sensors
    Gray8,
    /// MJPEG - per-frame JPEG compression
    Mjpeg,
}

impl PixelFormat {
    /// Average bytes per pixel (accounting for chroma subsampling)
    pub fn bytes_per_pixel(&self) -> f32 {
        match self {
            Self::Rgba => 4.0,
            Self::Yuyv | Self::Uyvy => 2.0,
            Self::Gray8 => 1.0,
            // Compressed; no fixed size. Used only for buffer sizing hints.
            Self::Mjpeg => 1.0,
        }
    }

    /// FourCC code for this format as used by V4L2
    pub fn fourcc(&self) -> &'static [u8; 4] {
        match self {
            Self::Rgba => b"AB24",
            Self::Yuyv => b"YUYV",
            Self::Uyvy => b"UYVY",
            Self::Gray8 => b"GREY",
            Self::Mjpeg => b"MJPG",
        }
    }

    /// Parse a V4L2 FourCC code
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"AB24" | b"RGBA" => Some(Self::Rgba),
            b"YUYV" | b"YUY2" => Some(Self::Yuyv),
            b"UYVY" => Some(Self::Uyvy),
            b"GREY" | b"Y8  " => Some(Self::Gray8),
            b"MJPG" | b"JPEG" => Some(Self::Mjpeg),
            _ => None,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.fourcc()).trim_end())
    }
}

/// Physical placement of a camera relative to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CameraFacing {
    /// User-facing camera (selfie side)
    #[default]
    Front,
    /// World-facing camera
    Back,
    /// External or unknown placement (USB webcams)
    External,
}

impl std::fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraFacing::Front => write!(f, "front"),
            CameraFacing::Back => write!(f, "back"),
            CameraFacing::External => write!(f, "external"),
        }
    }
}

/// Device information from the driver
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Name of the device (driver card string)
    pub card: String,
    /// Driver name
    pub driver: String,
    /// Device path (e.g., /dev/video0)
    pub path: String,
}

/// Represents a camera device
#[derive(Debug, Clone)]
pub struct CameraDevice {
    pub name: String,
    pub path: String,
    /// Backend-local device index
    pub index: usize,
    /// Facing derived from the device name; External when unknown
    pub facing: CameraFacing,
    pub info: Option<DeviceInfo>,
}

/// Criteria used by the session manager to pick a device at start
#[derive(Debug, Clone, Default)]
pub struct DeviceSelector {
    /// Explicit device index override
    pub index: Option<usize>,
    /// Required facing; None accepts any device
    pub facing: Option<CameraFacing>,
}

impl DeviceSelector {
    /// Select the first device matching this selector
    pub fn select<'a>(&self, devices: &'a [CameraDevice]) -> Option<&'a CameraDevice> {
        if let Some(index) = self.index {
            return devices.iter().find(|d| d.index == index);
        }
        match self.facing {
            Some(facing) => devices.iter().find(|d| d.facing == facing),
            None => devices.first(),
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Frame data in `format`; shared so frames clone cheaply
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Timestamp when the frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build an RGBA frame from raw pixel bytes
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format: PixelFormat::Rgba,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }
}

/// Settings for a single still-capture request
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Preview thumbnail pixel format; the first format the photo output
    /// advertises
    pub preview_format: Option<PixelFormat>,
    /// Edge length of the square preview thumbnail
    pub thumbnail_size: u32,
}

impl CaptureSettings {
    /// Derive settings from the formats a photo output advertises
    pub fn from_advertised(formats: &[PixelFormat], thumbnail_size: u32) -> Self {
        Self {
            preview_format: formats.first().copied(),
            thumbnail_size,
        }
    }
}

/// A completed still capture: full-resolution JPEG plus preview thumbnail
#[derive(Debug, Clone)]
pub struct StillCapture {
    /// JPEG-encoded full-resolution image
    pub jpeg: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    /// Preview thumbnail in the requested format, when one was produced
    pub thumbnail: Option<CameraFrame>,
}

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame dimensions,
/// so regions survive downscaling and display scaling unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FrameRegion {
    /// Create a frame region from pixel coordinates
    pub fn from_pixels(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self {
            x: x as f32 / frame_width as f32,
            y: y as f32 / frame_height as f32,
            width: width as f32 / frame_width as f32,
            height: height as f32 / frame_height as f32,
        }
    }
}

/// A point within a frame, normalized like [`FrameRegion`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// A per-frame detection result delivered by the live metadata stream
///
/// No ownership beyond the current batch; the overlay consumes these and
/// drops them.
#[derive(Debug, Clone)]
pub enum MetadataObject {
    /// A machine-readable code with an optional decoded payload
    Code {
        region: FrameRegion,
        payload: Option<String>,
    },
    /// A detected face region; no identity, just geometry
    Face { region: FrameRegion },
}

impl MetadataObject {
    /// The region this object covers within the frame
    pub fn region(&self) -> &FrameRegion {
        match self {
            MetadataObject::Code { region, .. } => region,
            MetadataObject::Face { region } => region,
        }
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// No frame was available when one was required
    NoFrame,
    /// General I/O error
    Io(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::NoFrame => write!(f, "No frame available"),
            BackendError::Io(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_round_trip() {
        for format in [
            PixelFormat::Rgba,
            PixelFormat::Yuyv,
            PixelFormat::Uyvy,
            PixelFormat::Gray8,
            PixelFormat::Mjpeg,
        ] {
            assert_eq!(PixelFormat::from_fourcc(format.fourcc()), Some(format));
        }
        assert_eq!(PixelFormat::from_fourcc(b"H264"), None);
    }

    #[test]
    fn test_frame_region_from_pixels() {
        let region = FrameRegion::from_pixels(160, 120, 320, 240, 640, 480);
        assert_eq!(region.x, 0.25);
        assert_eq!(region.y, 0.25);
        assert_eq!(region.width, 0.5);
        assert_eq!(region.height, 0.5);
    }

    #[test]
    fn test_selector_prefers_index_override() {
        let devices = vec![
            CameraDevice {
                name: "Front Camera".into(),
                path: "/dev/video0".into(),
                index: 0,
                facing: CameraFacing::Front,
                info: None,
            },
            CameraDevice {
                name: "USB Webcam".into(),
                path: "/dev/video2".into(),
                index: 2,
                facing: CameraFacing::External,
                info: None,
            },
        ];

        let by_index = DeviceSelector {
            index: Some(2),
            facing: Some(CameraFacing::Front),
        };
        assert_eq!(by_index.select(&devices).unwrap().index, 2);

        let by_facing = DeviceSelector {
            index: None,
            facing: Some(CameraFacing::Front),
        };
        assert_eq!(by_facing.select(&devices).unwrap().index, 0);

        let any = DeviceSelector::default();
        assert_eq!(any.select(&devices).unwrap().index, 0);

        let missing = DeviceSelector {
            index: None,
            facing: Some(CameraFacing::Back),
        };
        assert!(missing.select(&devices).is_none());
    }
}
