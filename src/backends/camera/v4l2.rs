// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera backend
//!
//! Streams preview frames from a Video4Linux capture device on a dedicated
//! thread and serves still captures from the most recent frame. Format
//! negotiation prefers packed YUV since that is what most webcam sensors
//! deliver raw.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use image::DynamicImage;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use super::format_converters::frame_to_rgba;
use super::frame_loop::StreamLoop;
use super::types::*;
use super::CameraBackend;
use crate::constants::JPEG_QUALITY;

/// Preview resolution requested from the device
const PREVIEW_WIDTH: u32 = 640;
const PREVIEW_HEIGHT: u32 = 480;

/// Formats tried during negotiation, most preferred first
const PREFERRED_FORMATS: [PixelFormat; 4] = [
    PixelFormat::Yuyv,
    PixelFormat::Uyvy,
    PixelFormat::Mjpeg,
    PixelFormat::Gray8,
];

/// V4L2 camera backend
pub struct V4l2Backend {
    device: Option<CameraDevice>,
    advertised: Vec<PixelFormat>,
    stream: Option<StreamLoop>,
    latest: Arc<Mutex<Option<CameraFrame>>>,
}

impl V4l2Backend {
    pub fn new() -> Self {
        Self {
            device: None,
            advertised: Vec::new(),
            stream: None,
            latest: Arc::new(Mutex::new(None)),
        }
    }
}

impl Default for V4l2Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for V4l2Backend {
    fn is_available(&self) -> bool {
        !video_device_indices().is_empty()
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        let mut cameras = Vec::new();

        for index in video_device_indices() {
            let path = format!("/dev/video{}", index);

            // Only list devices that can actually capture video
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps
                .capabilities
                .contains(v4l::capability::Flags::VIDEO_CAPTURE)
            {
                continue;
            }

            // Prefer the sysfs name; it carries placement hints on laptops
            let sysfs_name =
                std::fs::read_to_string(format!("/sys/class/video4linux/video{}/name", index))
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
            let name = if sysfs_name.is_empty() {
                caps.card.clone()
            } else {
                sysfs_name
            };
            let facing = facing_from_name(&name);

            debug!(index, name = %name, facing = %facing, "Found V4L2 capture device");

            cameras.push(CameraDevice {
                name,
                path: path.clone(),
                index,
                facing,
                info: Some(DeviceInfo {
                    card: caps.card.clone(),
                    driver: caps.driver.clone(),
                    path,
                }),
            });
        }

        cameras
    }

    fn attach(&mut self, device: &CameraDevice) -> BackendResult<()> {
        let dev = Device::with_path(&device.path)
            .map_err(|e| BackendError::Io(format!("failed to open {}: {}", device.path, e)))?;

        let descriptions = dev
            .enum_formats()
            .map_err(|e| BackendError::Io(format!("failed to enumerate formats: {}", e)))?;

        let mut advertised = Vec::new();
        for desc in &descriptions {
            if let Some(format) = PixelFormat::from_fourcc(&desc.fourcc.repr) {
                if !advertised.contains(&format) {
                    advertised.push(format);
                }
            }
        }
        if advertised.is_empty() {
            return Err(BackendError::FormatNotSupported(format!(
                "{} advertises no supported pixel format",
                device.name
            )));
        }

        info!(
            device = %device.name,
            formats = ?advertised,
            "Attached V4L2 device as session input"
        );

        self.advertised = advertised;
        self.device = Some(device.clone());
        Ok(())
    }

    fn detach(&mut self) {
        self.stop_streaming();
        if let Some(device) = self.device.take() {
            debug!(device = %device.name, "Detached V4L2 device");
        }
        self.advertised.clear();
    }

    fn is_attached(&self) -> bool {
        self.device.is_some()
    }

    fn advertised_preview_formats(&self) -> Vec<PixelFormat> {
        self.advertised.clone()
    }

    fn start_streaming(&mut self) -> BackendResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| BackendError::DeviceNotFound("no device attached".to_string()))?;

        let path = device.path.clone();
        let latest = Arc::clone(&self.latest);
        self.stream = Some(StreamLoop::spawn("v4l2-preview", move |stop| {
            if let Err(e) = run_capture_loop(&path, stop, latest) {
                warn!(error = %e, "V4L2 capture loop failed");
            }
        }));
        Ok(())
    }

    fn stop_streaming(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
        self.latest.lock().unwrap().take();
    }

    fn is_streaming(&self) -> bool {
        self.stream.as_ref().map(StreamLoop::is_running).unwrap_or(false)
    }

    fn latest_frame(&self) -> Option<CameraFrame> {
        self.latest.lock().unwrap().clone()
    }

    fn capture_still(&self, settings: &CaptureSettings) -> BackendResult<StillCapture> {
        let frame = self.latest_frame().ok_or(BackendError::NoFrame)?;
        encode_still(&frame, settings)
    }
}

/// Blocking capture loop; owns the device and stream on its own stack
fn run_capture_loop(
    path: &str,
    stop_signal: Arc<AtomicBool>,
    latest: Arc<Mutex<Option<CameraFrame>>>,
) -> Result<(), String> {
    let dev = Device::with_path(path).map_err(|e| format!("failed to open device: {}", e))?;

    // Negotiate a format the converters understand
    let mut negotiated = None;
    for format in PREFERRED_FORMATS {
        let request = Format::new(PREVIEW_WIDTH, PREVIEW_HEIGHT, FourCC::new(format.fourcc()));
        if let Ok(actual) = dev.set_format(&request) {
            if let Some(pixel_format) = PixelFormat::from_fourcc(&actual.fourcc.repr) {
                negotiated = Some((actual, pixel_format));
                break;
            }
        }
    }
    let (actual, pixel_format) =
        negotiated.ok_or_else(|| "no supported pixel format negotiated".to_string())?;

    let width = actual.width;
    let height = actual.height;
    let stride = (width as f32 * pixel_format.bytes_per_pixel()) as u32;

    info!(
        width,
        height,
        format = %pixel_format,
        "V4L2 preview format configured"
    );

    let mut stream = Stream::with_buffers(&dev, Type::VideoCapture, 4)
        .map_err(|e| format!("failed to create stream: {}", e))?;

    while !stop_signal.load(Ordering::SeqCst) {
        let (buf, _meta) = match stream.next() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Failed to capture preview frame");
                continue;
            }
        };

        let frame = CameraFrame {
            width,
            height,
            data: Arc::from(buf.to_vec().into_boxed_slice()),
            format: pixel_format,
            stride,
            captured_at: Instant::now(),
        };

        *latest.lock().unwrap() = Some(frame);
    }

    info!("V4L2 capture loop stopped");
    Ok(())
}

/// Encode a live frame into a still capture with preview thumbnail
pub(crate) fn encode_still(
    frame: &CameraFrame,
    settings: &CaptureSettings,
) -> BackendResult<StillCapture> {
    let rgba = frame_to_rgba(frame)
        .ok_or_else(|| BackendError::Other("frame conversion failed".to_string()))?;
    let (width, height) = rgba.dimensions();

    let image = DynamicImage::ImageRgba8(rgba);
    let mut jpeg = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut jpeg), JPEG_QUALITY);
    encoder
        .encode_image(&image.to_rgb8())
        .map_err(|e| BackendError::Other(format!("JPEG encoding failed: {}", e)))?;

    let thumbnail = build_thumbnail(&image, settings);

    Ok(StillCapture {
        jpeg: Arc::from(jpeg.into_boxed_slice()),
        width,
        height,
        thumbnail,
    })
}

/// Produce the square preview thumbnail the capture settings request
fn build_thumbnail(image: &DynamicImage, settings: &CaptureSettings) -> Option<CameraFrame> {
    let size = settings.thumbnail_size;
    if size == 0 {
        return None;
    }

    let scaled = image.thumbnail_exact(size, size);
    let frame = match settings.preview_format {
        Some(PixelFormat::Gray8) => {
            let gray = scaled.to_luma8();
            CameraFrame {
                width: size,
                height: size,
                data: Arc::from(gray.into_raw().into_boxed_slice()),
                format: PixelFormat::Gray8,
                stride: size,
                captured_at: Instant::now(),
            }
        }
        _ => CameraFrame::from_rgba(size, size, scaled.to_rgba8().into_raw()),
    };
    Some(frame)
}

/// Scan /dev for video capture nodes, sorted by index
fn video_device_indices() -> Vec<usize> {
    let mut indices = Vec::new();
    let Ok(entries) = std::fs::read_dir("/dev") else {
        return indices;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(rest) = name.strip_prefix("video") {
            if let Ok(index) = rest.parse::<usize>() {
                indices.push(index);
            }
        }
    }
    indices.sort_unstable();
    indices
}

/// Guess camera facing from the device name
fn facing_from_name(name: &str) -> CameraFacing {
    let lower = name.to_ascii_lowercase();
    if lower.contains("front") {
        CameraFacing::Front
    } else if lower.contains("back") || lower.contains("rear") {
        CameraFacing::Back
    } else {
        CameraFacing::External
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_heuristic() {
        assert_eq!(facing_from_name("Front Camera: ov5693"), CameraFacing::Front);
        assert_eq!(facing_from_name("Rear Camera"), CameraFacing::Back);
        assert_eq!(facing_from_name("HD Pro Webcam C920"), CameraFacing::External);
    }

    #[test]
    fn test_encode_still_produces_jpeg_and_thumbnail() {
        let frame = CameraFrame::from_rgba(8, 6, vec![200u8; 8 * 6 * 4]);
        let settings = CaptureSettings {
            preview_format: Some(PixelFormat::Rgba),
            thumbnail_size: 4,
        };

        let still = encode_still(&frame, &settings).unwrap();
        assert_eq!(still.width, 8);
        assert_eq!(still.height, 6);
        // JPEG magic bytes
        assert_eq!(&still.jpeg[..2], &[0xFF, 0xD8]);

        let thumb = still.thumbnail.unwrap();
        assert_eq!(thumb.width, 4);
        assert_eq!(thumb.height, 4);
        assert_eq!(thumb.format, PixelFormat::Rgba);
    }

    #[test]
    fn test_encode_still_gray_thumbnail() {
        let frame = CameraFrame::from_rgba(8, 8, vec![128u8; 8 * 8 * 4]);
        let settings = CaptureSettings {
            preview_format: Some(PixelFormat::Gray8),
            thumbnail_size: 2,
        };

        let still = encode_still(&frame, &settings).unwrap();
        let thumb = still.thumbnail.unwrap();
        assert_eq!(thumb.format, PixelFormat::Gray8);
        assert_eq!(thumb.data.len(), 4);
    }
}
