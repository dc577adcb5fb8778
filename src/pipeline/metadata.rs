// SPDX-License-Identifier: GPL-3.0-only

//! Live metadata stream handling
//!
//! Consumes the per-frame metadata batches produced by the scanner and
//! maintains the on-screen highlight region. Only the first object of a
//! batch drives the highlight; decisions about the capture loop happen
//! exclusively in the still-capture path.

use tracing::info;

use crate::backends::camera::MetadataObject;
use crate::presenter::{ScreenRect, Viewport};

/// Maintains the highlight region from live metadata
pub struct MetadataStreamHandler {
    viewport: Viewport,
    highlight: ScreenRect,
    last_payload: Option<String>,
}

impl MetadataStreamHandler {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            highlight: ScreenRect::ZERO,
            last_payload: None,
        }
    }

    /// Process one metadata batch and return the new highlight rectangle
    ///
    /// The highlight always reflects the most recent batch: an empty batch
    /// collapses it to the zero rectangle.
    pub fn handle_batch(&mut self, batch: &[MetadataObject]) -> ScreenRect {
        let rect = match batch.first() {
            None => ScreenRect::ZERO,
            Some(MetadataObject::Code { region, payload }) => {
                if let Some(payload) = payload {
                    info!(payload = %payload, "Decoded machine-readable code");
                    self.last_payload = Some(payload.clone());
                }
                self.viewport.transform(region)
            }
            Some(MetadataObject::Face { region }) => self.viewport.transform(region),
        };
        self.highlight = rect;
        rect
    }

    /// The current highlight rectangle
    pub fn highlight(&self) -> ScreenRect {
        self.highlight
    }

    /// The most recently surfaced code payload
    pub fn last_payload(&self) -> Option<&str> {
        self.last_payload.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::FrameRegion;

    fn handler() -> MetadataStreamHandler {
        MetadataStreamHandler::new(Viewport::new(640.0, 480.0))
    }

    fn region() -> FrameRegion {
        FrameRegion {
            x: 0.25,
            y: 0.25,
            width: 0.5,
            height: 0.5,
        }
    }

    #[test]
    fn test_empty_batch_collapses_highlight() {
        let mut handler = handler();
        handler.handle_batch(&[MetadataObject::Face { region: region() }]);
        assert!(!handler.highlight().is_zero());

        let rect = handler.handle_batch(&[]);
        assert!(rect.is_zero());
        assert!(handler.highlight().is_zero());
    }

    #[test]
    fn test_code_sets_transformed_bounds_and_surfaces_payload() {
        let mut handler = handler();
        let rect = handler.handle_batch(&[MetadataObject::Code {
            region: region(),
            payload: Some("ABC123".to_string()),
        }]);

        assert_eq!(rect.x, 160.0);
        assert_eq!(rect.y, 120.0);
        assert_eq!(rect.width, 320.0);
        assert_eq!(rect.height, 240.0);
        assert_eq!(handler.last_payload(), Some("ABC123"));
    }

    #[test]
    fn test_face_region_sets_bounds_without_payload() {
        let mut handler = handler();
        let rect = handler.handle_batch(&[MetadataObject::Face { region: region() }]);
        assert_eq!(rect.width, 320.0);
        assert!(handler.last_payload().is_none());
    }

    #[test]
    fn test_first_object_wins() {
        let mut handler = handler();
        let rect = handler.handle_batch(&[
            MetadataObject::Code {
                region: region(),
                payload: None,
            },
            MetadataObject::Face {
                region: FrameRegion {
                    x: 0.0,
                    y: 0.0,
                    width: 1.0,
                    height: 1.0,
                },
            },
        ]);
        // The code's bounds win, not the face's
        assert_eq!(rect.width, 320.0);
    }
}
