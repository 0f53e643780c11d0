// SPDX-License-Identifier: MPL-2.0

//! Camera preview layer
//!
//! The preview layer owns the mapping between frame coordinates and the
//! preview surface. Detections use normalized frame coordinates (0.0 to 1.0);
//! the layer transforms them to surface coordinates, accounting for video
//! gravity (stretch, letterbox or crop) and mirroring.

use crate::app::detection::RegionMapper;
use crate::app::frame_processor::DetectedSymbol;
use crate::backends::camera::types::CameraFrame;
use serde::{Deserialize, Serialize};

/// A rectangle on the preview surface
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    /// The empty rectangle at the origin
    pub const ZERO: ScreenRect = ScreenRect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the rectangle covers no area
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Overlap of two rectangles, `None` when they do not touch
    pub fn intersection(&self, other: &ScreenRect) -> Option<ScreenRect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= x || bottom <= y {
            None
        } else {
            Some(ScreenRect::new(x, y, right - x, bottom - y))
        }
    }
}

/// How video content fills the preview surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoGravity {
    /// Stretch to the surface, ignoring aspect ratio
    Resize,
    /// Scale to fit within the surface (letterbox)
    Aspect,
    /// Scale to cover the surface, cropping the overflow
    #[default]
    AspectFill,
}

/// Live camera preview surface
#[derive(Debug, Clone)]
pub struct PreviewLayer {
    /// Surface bounds in preview pixels
    bounds: ScreenRect,
    gravity: VideoGravity,
    /// Horizontal flip (front cameras)
    mirrored: bool,
    /// Latest frame, shown by the preview widget
    frame: Option<CameraFrame>,
    /// Dimensions of the video being shown, known once a frame arrives
    video_size: Option<(u32, u32)>,
}

impl PreviewLayer {
    pub fn new(gravity: VideoGravity, mirrored: bool) -> Self {
        Self {
            bounds: ScreenRect::ZERO,
            gravity,
            mirrored,
            frame: None,
            video_size: None,
        }
    }

    /// Resize the surface (called whenever the screen size changes)
    pub fn set_bounds(&mut self, bounds: ScreenRect) {
        self.bounds = bounds;
    }

    pub fn bounds(&self) -> ScreenRect {
        self.bounds
    }

    pub fn gravity(&self) -> VideoGravity {
        self.gravity
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    /// Announce the video size before the first frame arrives
    pub fn set_video_size(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.video_size = Some((width, height));
        }
    }

    /// Show a new frame
    pub fn update_frame(&mut self, frame: CameraFrame) {
        self.set_video_size(frame.width, frame.height);
        self.frame = Some(frame);
    }

    pub fn frame(&self) -> Option<&CameraFrame> {
        self.frame.as_ref()
    }

    /// Where the full video frame lands on the surface
    ///
    /// With `AspectFill` the result extends past the surface bounds on the
    /// cropped axis.
    pub fn video_rect(&self) -> Option<ScreenRect> {
        let (frame_width, frame_height) = self.video_size?;
        if self.bounds.is_empty() {
            return None;
        }

        let (fw, fh) = (frame_width as f32, frame_height as f32);
        let (bw, bh) = (self.bounds.width, self.bounds.height);

        let (video_width, video_height) = match self.gravity {
            VideoGravity::Resize => (bw, bh),
            VideoGravity::Aspect => {
                let scale = (bw / fw).min(bh / fh);
                (fw * scale, fh * scale)
            }
            VideoGravity::AspectFill => {
                let scale = (bw / fw).max(bh / fh);
                (fw * scale, fh * scale)
            }
        };

        Some(ScreenRect::new(
            self.bounds.x + (bw - video_width) / 2.0,
            self.bounds.y + (bh - video_height) / 2.0,
            video_width,
            video_height,
        ))
    }

    /// Map a normalized frame point to the surface
    pub fn point_for_frame(&self, nx: f32, ny: f32) -> Option<(f32, f32)> {
        let video = self.video_rect()?;
        let nx = if self.mirrored { 1.0 - nx } else { nx };
        Some((video.x + nx * video.width, video.y + ny * video.height))
    }

    /// Map a surface point back to normalized frame coordinates
    ///
    /// Used by the preview widget to sample the frame for each cell.
    pub fn frame_point_for_surface(&self, sx: f32, sy: f32) -> Option<(f32, f32)> {
        let video = self.video_rect()?;
        let nx = (sx - video.x) / video.width;
        let ny = (sy - video.y) / video.height;
        let nx = if self.mirrored { 1.0 - nx } else { nx };
        Some((nx, ny))
    }

    /// Transform a detected symbol's frame region to surface coordinates
    pub fn transformed_region(&self, symbol: &DetectedSymbol) -> Option<ScreenRect> {
        let video = self.video_rect()?;
        let region = &symbol.bounds;

        let mut x = region.x * video.width;
        if self.mirrored {
            x = video.width - x - region.width * video.width;
        }

        Some(ScreenRect::new(
            video.x + x,
            video.y + region.y * video.height,
            region.width * video.width,
            region.height * video.height,
        ))
    }
}

impl RegionMapper for PreviewLayer {
    fn map_region(&self, symbol: &DetectedSymbol) -> Option<ScreenRect> {
        self.transformed_region(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::frame_processor::{FrameRegion, SymbologyType};

    fn symbol(x: f32, y: f32, width: f32, height: f32) -> DetectedSymbol {
        DetectedSymbol::new(
            SymbologyType::Qr,
            None,
            FrameRegion {
                x,
                y,
                width,
                height,
            },
        )
    }

    fn layer(gravity: VideoGravity, mirrored: bool) -> PreviewLayer {
        let mut layer = PreviewLayer::new(gravity, mirrored);
        layer.set_bounds(ScreenRect::new(0.0, 0.0, 200.0, 100.0));
        layer
    }

    #[test]
    fn test_no_mapping_before_video_size_known() {
        let layer = layer(VideoGravity::AspectFill, false);
        assert!(layer.transformed_region(&symbol(0.0, 0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn test_resize_stretches() {
        let mut layer = layer(VideoGravity::Resize, false);
        layer.set_video_size(100, 100);
        let rect = layer
            .transformed_region(&symbol(0.5, 0.5, 0.25, 0.25))
            .unwrap();
        assert_eq!(rect, ScreenRect::new(100.0, 50.0, 50.0, 25.0));
    }

    #[test]
    fn test_aspect_letterboxes() {
        // Square video in a 2:1 surface: 100x100 centred with 50px bars
        let mut layer = layer(VideoGravity::Aspect, false);
        layer.set_video_size(400, 400);
        assert_eq!(
            layer.video_rect().unwrap(),
            ScreenRect::new(50.0, 0.0, 100.0, 100.0)
        );
        let rect = layer.transformed_region(&symbol(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert_eq!(rect, ScreenRect::new(50.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_aspect_fill_crops() {
        // Square video covering a 2:1 surface: 200x200, top/bottom 50px cropped
        let mut layer = layer(VideoGravity::AspectFill, false);
        layer.set_video_size(400, 400);
        assert_eq!(
            layer.video_rect().unwrap(),
            ScreenRect::new(0.0, -50.0, 200.0, 200.0)
        );
        let rect = layer
            .transformed_region(&symbol(0.25, 0.25, 0.5, 0.5))
            .unwrap();
        assert_eq!(rect, ScreenRect::new(50.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn test_mirroring_flips_horizontally() {
        let mut layer = layer(VideoGravity::Resize, true);
        layer.set_video_size(100, 100);
        let rect = layer.transformed_region(&symbol(0.0, 0.0, 0.25, 0.5)).unwrap();
        assert_eq!(rect, ScreenRect::new(150.0, 0.0, 50.0, 50.0));
    }

    #[test]
    fn test_surface_point_round_trip() {
        let mut layer = layer(VideoGravity::AspectFill, true);
        layer.set_video_size(640, 480);
        let (sx, sy) = layer.point_for_frame(0.3, 0.6).unwrap();
        let (nx, ny) = layer.frame_point_for_surface(sx, sy).unwrap();
        assert!((nx - 0.3).abs() < 1e-4);
        assert!((ny - 0.6).abs() < 1e-4);
    }

    #[test]
    fn test_intersection() {
        let a = ScreenRect::new(0.0, 0.0, 10.0, 10.0);
        let b = ScreenRect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), Some(ScreenRect::new(5.0, 5.0, 5.0, 5.0)));
        let c = ScreenRect::new(20.0, 20.0, 1.0, 1.0);
        assert_eq!(a.intersection(&c), None);
        assert!(ScreenRect::ZERO.is_empty());
    }
}
