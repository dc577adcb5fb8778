// SPDX-License-Identifier: GPL-3.0-only
// Camera backend with trait-based abstraction

//! Camera backend abstraction
//!
//! The session manager talks to cameras exclusively through the
//! [`CameraBackend`] trait. Two implementations exist:
//!
//! - [`v4l2::V4l2Backend`]: real hardware via Video4Linux
//! - [`synthetic::SyntheticBackend`]: scripted frames from files or memory,
//!   used by tests and headless demos

pub mod format_converters;
pub mod frame_loop;
pub mod synthetic;
pub mod types;
pub mod v4l2;

pub use types::*;

use serde::{Deserialize, Serialize};

/// Camera backend trait
///
/// Lifecycle: `attach` binds a device as the session's video input,
/// `start_streaming`/`stop_streaming` control live frame delivery, and
/// `detach` releases the device. Still captures are served from the most
/// recent live frame.
pub trait CameraBackend: Send {
    /// Check if the backend can be used on this system
    fn is_available(&self) -> bool;

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Attach a device as the session's video input
    fn attach(&mut self, device: &CameraDevice) -> BackendResult<()>;

    /// Release the attached device
    fn detach(&mut self);

    /// Check whether a device is attached
    fn is_attached(&self) -> bool;

    /// Pixel formats the photo output advertises for preview thumbnails
    ///
    /// Only meaningful after `attach`.
    fn advertised_preview_formats(&self) -> Vec<PixelFormat>;

    /// Begin live frame delivery
    fn start_streaming(&mut self) -> BackendResult<()>;

    /// Halt live frame delivery; idempotent
    fn stop_streaming(&mut self);

    /// Check whether frames are currently being delivered
    fn is_streaming(&self) -> bool;

    /// Most recent live frame, if any has been delivered
    fn latest_frame(&self) -> Option<CameraFrame>;

    /// Capture a still image from the live stream
    fn capture_still(&self, settings: &CaptureSettings) -> BackendResult<StillCapture>;
}

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Video4Linux backend (Linux standard)
    #[default]
    V4l2,
    /// Scripted frame source for tests and headless demos
    Synthetic,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::Synthetic => write!(f, "Synthetic"),
        }
    }
}

/// Instantiate the backend for the given type
pub fn get_backend_for_type(backend_type: CameraBackendType) -> Box<dyn CameraBackend> {
    match backend_type {
        CameraBackendType::V4l2 => Box::new(v4l2::V4l2Backend::new()),
        CameraBackendType::Synthetic => Box::new(synthetic::SyntheticBackend::new()),
    }
}
