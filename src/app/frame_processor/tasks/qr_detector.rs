// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection task
//!
//! This module implements QR code recognition using the rqrr crate.
//! Frames are sampled to grayscale (downscaled on the fly when large) and
//! searched for QR grids, returning their positions and decoded content.

use crate::app::frame_processor::tasks::{SymbolRecognizer, processing_scale};
use crate::app::frame_processor::types::{
    DetectedSymbol, FrameRegion, SupportedCodeTypes, SymbologyType,
};
use crate::backends::camera::types::CameraFrame;
use crate::constants::capture;
use tracing::{debug, trace};

/// QR code detector
///
/// Analyzes camera frames to detect and decode QR codes.
/// Optimized for real-time processing with frame downscaling.
pub struct QrDetector {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    /// Create a new QR detector with default settings
    pub fn new() -> Self {
        Self {
            max_dimension: capture::MAX_DETECTION_DIMENSION,
        }
    }

    /// Create a QR detector with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }
}

impl SymbolRecognizer for QrDetector {
    fn name(&self) -> &'static str {
        "qr"
    }

    fn recognize(&self, frame: &CameraFrame, types: &SupportedCodeTypes) -> Vec<DetectedSymbol> {
        if !types.contains(SymbologyType::Qr) {
            return Vec::new();
        }
        detect_sync(frame, self.max_dimension)
    }
}

/// Synchronous QR detection (runs in a blocking task)
fn detect_sync(frame: &CameraFrame, max_dimension: u32) -> Vec<DetectedSymbol> {
    let start = std::time::Instant::now();

    let width = frame.width;
    let height = frame.height;
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let scale = processing_scale(width, height, max_dimension);
    let proc_width = ((width as f32 / scale) as u32).max(1);
    let proc_height = ((height as f32 / scale) as u32).max(1);

    // Nearest-neighbour sampling straight from the frame; no intermediate buffer
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        proc_width as usize,
        proc_height as usize,
        |x, y| frame.luma_at((x as f32 * scale) as u32, (y as f32 * scale) as u32),
    );
    let grids = prepared.detect_grids();

    trace!(
        proc_width,
        proc_height,
        scale,
        grids = grids.len(),
        detection_ms = start.elapsed().as_millis(),
        "QR grid search complete"
    );

    let mut detections = Vec::with_capacity(grids.len());

    for grid in grids {
        // Corners in processing coordinates, scaled back to the frame
        let corners: Vec<(f32, f32)> = grid
            .bounds
            .iter()
            .map(|p| (p.x as f32 * scale, p.y as f32 * scale))
            .collect();

        let Some(region) = FrameRegion::bounding(&corners, width, height) else {
            continue;
        };

        // A located grid that fails to decode is still reported, without text
        let text = match grid.decode() {
            Ok((_meta, content)) => Some(content),
            Err(e) => {
                debug!(error = ?e, "Failed to decode QR code");
                None
            }
        };

        debug!(
            content = text.as_deref().unwrap_or("<undecoded>"),
            x = region.x,
            y = region.y,
            width = region.width,
            height = region.height,
            "Detected QR code"
        );

        detections.push(DetectedSymbol::new(SymbologyType::Qr, text, region));
    }

    if !detections.is_empty() {
        debug!(
            count = detections.len(),
            total_ms = start.elapsed().as_millis(),
            "QR detection found codes"
        );
    }

    detections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::frame_processor::tasks::test_frames::{DarkBounds, near, render};
    use rxing::BarcodeFormat;

    fn blank_frame(width: u32, height: u32) -> CameraFrame {
        CameraFrame::from_rgba(width, height, vec![255; (width * height * 4) as usize])
    }

    /// The reported region hugs the finder patterns within `tolerance`
    fn assert_region(region: FrameRegion, bounds: DarkBounds, frame: &CameraFrame, tolerance: f32) {
        let (left, top, right, bottom) = bounds;
        let (fw, fh) = (frame.width as f32, frame.height as f32);
        assert!(near(region.x, left as f32 / fw, tolerance), "{:?}", region);
        assert!(near(region.y, top as f32 / fh, tolerance), "{:?}", region);
        assert!(
            near(region.x + region.width, (right + 1) as f32 / fw, tolerance),
            "{:?}",
            region
        );
        assert!(
            near(region.y + region.height, (bottom + 1) as f32 / fh, tolerance),
            "{:?}",
            region
        );
    }

    #[test]
    fn test_decodes_url_with_region() {
        let (frame, bounds) = render(
            BarcodeFormat::QR_CODE,
            "https://example.com",
            (240, 240),
            (480, 360),
            (160, 60),
        );
        let symbols = QrDetector::new().recognize(&frame, &SupportedCodeTypes::default());

        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].symbology, SymbologyType::Qr);
        assert_eq!(symbols[0].text.as_deref(), Some("https://example.com"));
        assert_region(symbols[0].bounds, bounds, &frame, 0.025);
    }

    #[test]
    fn test_decodes_when_downscaled() {
        let (frame, bounds) = render(
            BarcodeFormat::QR_CODE,
            "https://example.com",
            (480, 480),
            (1280, 720),
            (600, 120),
        );
        let symbols =
            QrDetector::with_max_dimension(640).recognize(&frame, &SupportedCodeTypes::default());

        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].text.as_deref(), Some("https://example.com"));
        // One processing pixel is two frame pixels
        assert_region(symbols[0].bounds, bounds, &frame, 0.03);
    }

    #[test]
    fn test_two_codes_in_one_frame() {
        let (left, _) = render(BarcodeFormat::QR_CODE, "first", (160, 160), (400, 200), (10, 20));
        let (right, _) = render(BarcodeFormat::QR_CODE, "second", (160, 160), (400, 200), (230, 20));

        // Paste the right half of one canvas onto the other
        let mut data = left.data_slice().to_vec();
        for y in 0..200usize {
            for x in 200..400usize {
                data[y * 400 + x] = right.data_slice()[y * 400 + x];
            }
        }
        let frame = CameraFrame {
            data: std::sync::Arc::from(data.into_boxed_slice()),
            ..left
        };

        let mut texts: Vec<String> = QrDetector::new()
            .recognize(&frame, &SupportedCodeTypes::default())
            .into_iter()
            .filter_map(|s| s.text)
            .collect();
        texts.sort();
        assert_eq!(texts, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_blank_frame_has_no_codes() {
        let detector = QrDetector::new();
        let symbols = detector.recognize(&blank_frame(64, 48), &SupportedCodeTypes::default());
        assert!(symbols.is_empty());
    }

    #[test]
    fn test_large_blank_frame_is_downscaled() {
        let detector = QrDetector::with_max_dimension(32);
        let symbols = detector.recognize(&blank_frame(128, 96), &SupportedCodeTypes::default());
        assert!(symbols.is_empty());
    }

    #[test]
    fn test_qr_not_requested() {
        let detector = QrDetector::new();
        let types = SupportedCodeTypes::new([SymbologyType::Ean13]);
        assert!(detector.recognize(&blank_frame(16, 16), &types).is_empty());
    }

    #[test]
    fn test_empty_frame() {
        let detector = QrDetector::new();
        let frame = CameraFrame::from_rgba(0, 0, Vec::new());
        assert!(
            detector
                .recognize(&frame, &SupportedCodeTypes::default())
                .is_empty()
        );
    }
}
