// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion utilities
//!
//! Converts the packed YUV and grayscale formats delivered by webcam sensors
//! into the RGBA frames the rest of the pipeline consumes. BT.601
//! coefficients are used for YUV conversion.

use super::types::{CameraFrame, PixelFormat};
use image::RgbaImage;

/// Convert a camera frame to an [`RgbaImage`], handling stride padding
pub fn frame_to_rgba(frame: &CameraFrame) -> Option<RgbaImage> {
    let rgba = match frame.format {
        PixelFormat::Rgba => strip_stride(&frame.data, frame.width, frame.height, frame.stride, 4),
        PixelFormat::Yuyv => {
            packed_yuv422_to_rgba(&frame.data, frame.width, frame.height, frame.stride, false)
        }
        PixelFormat::Uyvy => {
            packed_yuv422_to_rgba(&frame.data, frame.width, frame.height, frame.stride, true)
        }
        PixelFormat::Gray8 => gray_to_rgba(&frame.data, frame.width, frame.height, frame.stride),
        PixelFormat::Mjpeg => {
            let img = image::load_from_memory(&frame.data).ok()?;
            return Some(img.to_rgba8());
        }
    };
    RgbaImage::from_raw(frame.width, frame.height, rgba)
}

/// Copy pixel data row by row, dropping any stride padding
fn strip_stride(data: &[u8], width: u32, height: u32, stride: u32, bpp: usize) -> Vec<u8> {
    let row_bytes = width as usize * bpp;
    let stride = stride as usize;
    let mut out = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        let start = y * stride;
        let end = start + row_bytes;
        if end <= data.len() {
            out.extend_from_slice(&data[start..end]);
        }
    }
    out
}

/// Convert packed 4:2:2 YUV (YUYV or UYVY) to RGBA
///
/// Each 4-byte group encodes two pixels. `u_first` selects UYVY byte order.
fn packed_yuv422_to_rgba(data: &[u8], width: u32, height: u32, stride: u32, u_first: bool) -> Vec<u8> {
    let stride = stride as usize;
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);

    for row in 0..height as usize {
        let line = data.get(row * stride..).unwrap_or(&[]);
        let mut emitted = 0u32;
        for chunk in line.chunks_exact(4) {
            if emitted >= width {
                break;
            }
            let (y0, u, y1, v) = if u_first {
                (chunk[1], chunk[0], chunk[3], chunk[2])
            } else {
                (chunk[0], chunk[1], chunk[2], chunk[3])
            };
            for y in [y0, y1] {
                if emitted >= width {
                    break;
                }
                push_yuv_pixel(&mut rgba, y, u, v);
                emitted += 1;
            }
        }
    }

    rgba
}

fn push_yuv_pixel(rgba: &mut Vec<u8>, y: u8, u: u8, v: u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    rgba.extend_from_slice(&[r, g, b, 255]);
}

/// Expand 8-bit grayscale to RGBA
fn gray_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    let stride = stride as usize;
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for row in 0..height as usize {
        let line = data.get(row * stride..).unwrap_or(&[]);
        for &value in line.iter().take(width as usize) {
            rgba.extend_from_slice(&[value, value, value, 255]);
        }
    }
    rgba
}
