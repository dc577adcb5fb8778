// SPDX-License-Identifier: GPL-3.0-only

//! Presentation collaborator
//!
//! The pipeline never draws anything itself; it hands geometry and images
//! to a [`Presenter`]. The trait exposes completion signals for settling
//! and teardown so the pipeline can sequence against the presentation
//! layer instead of guessing with timed delays.

use std::future::Future;

use image::DynamicImage;
use tracing::{debug, info};

use crate::backends::camera::{CameraDevice, FrameRegion};

/// Geometry of the content view hosting the live preview
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Map a normalized frame region into this viewport's coordinates
    pub fn transform(&self, region: &FrameRegion) -> ScreenRect {
        ScreenRect {
            x: region.x * self.width,
            y: region.y * self.height,
            width: region.width * self.width,
            height: region.height * self.height,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 480.0,
        }
    }
}

/// A rectangle in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    /// The collapsed rectangle shown when nothing is highlighted
    pub const ZERO: ScreenRect = ScreenRect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn is_zero(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

/// Hosts the live preview surface and overlay
///
/// `settle` and `teardown` resolve once the corresponding presentation
/// work has completed, which is what the pipeline sequences against.
pub trait Presenter: Send {
    /// Geometry of the content view the preview layer is sized against
    fn viewport(&self) -> Viewport;

    /// Attach the live preview surface for a device
    fn attach_preview(&mut self, device: &CameraDevice);

    /// Move/resize the highlight overlay
    fn set_highlight(&mut self, rect: ScreenRect);

    /// Promote a captured still into the display slot
    fn display_still(&mut self, image: &DynamicImage);

    /// Resolves once in-flight presentation work has settled
    fn settle(&mut self) -> impl Future<Output = ()> + Send;

    /// Release the preview surface; resolves once it is gone
    fn teardown(&mut self) -> impl Future<Output = ()> + Send;
}

/// Headless presenter that narrates presentation events to the log
pub struct ConsolePresenter {
    viewport: Viewport,
    highlight: ScreenRect,
}

impl ConsolePresenter {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            highlight: ScreenRect::ZERO,
        }
    }
}

impl Default for ConsolePresenter {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl Presenter for ConsolePresenter {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn attach_preview(&mut self, device: &CameraDevice) {
        info!(
            device = %device.name,
            width = self.viewport.width,
            height = self.viewport.height,
            "Preview attached"
        );
    }

    fn set_highlight(&mut self, rect: ScreenRect) {
        if rect != self.highlight {
            debug!(
                x = rect.x,
                y = rect.y,
                width = rect.width,
                height = rect.height,
                "Highlight region updated"
            );
            self.highlight = rect;
        }
    }

    fn display_still(&mut self, image: &DynamicImage) {
        info!(
            width = image.width(),
            height = image.height(),
            "Captured still promoted to display slot"
        );
    }

    fn settle(&mut self) -> impl Future<Output = ()> + Send {
        std::future::ready(())
    }

    fn teardown(&mut self) -> impl Future<Output = ()> + Send {
        info!("Preview surface released");
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_transform() {
        let viewport = Viewport::new(800.0, 600.0);
        let region = FrameRegion {
            x: 0.25,
            y: 0.5,
            width: 0.5,
            height: 0.25,
        };

        let rect = viewport.transform(&region);
        assert_eq!(rect.x, 200.0);
        assert_eq!(rect.y, 300.0);
        assert_eq!(rect.width, 400.0);
        assert_eq!(rect.height, 150.0);
    }

    #[test]
    fn test_zero_rect() {
        assert!(ScreenRect::ZERO.is_zero());
        let rect = Viewport::default().transform(&FrameRegion::default());
        assert!(rect.is_zero());
    }
}
