// SPDX-License-Identifier: GPL-3.0-only

//! Multi-format barcode detection task
//!
//! Linear (EAN, UPC, Code 39/93/128, ITF, Codabar, GS1 DataBar) and stacked or
//! matrix symbologies (PDF417, Aztec, Data Matrix, Micro QR) are recognized
//! with the rxing crate. Plain QR codes are left to
//! [`QrDetector`](super::QrDetector).

use crate::app::frame_processor::tasks::{SymbolRecognizer, processing_scale};
use crate::app::frame_processor::types::{
    DetectedSymbol, FrameRegion, SupportedCodeTypes, SymbologyType,
};
use crate::backends::camera::types::CameraFrame;
use crate::constants::capture;
use rxing::{BarcodeFormat, RXingResult};
use tracing::{debug, trace};

/// Height given to a linear code's region, as a fraction of its width
///
/// Linear readers locate a code along a single scan line.
const LINEAR_HEIGHT_RATIO: f32 = 0.25;

/// Code 39 character set in check-character order
const CODE39_ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

/// Barcode detector for every family except plain QR
pub struct BarcodeDetector {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for BarcodeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl BarcodeDetector {
    pub fn new() -> Self {
        Self {
            max_dimension: capture::MAX_DETECTION_DIMENSION,
        }
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    /// Whether this detector can report `ty`
    pub fn handles(ty: SymbologyType) -> bool {
        matches!(
            ty,
            SymbologyType::UpcE
                | SymbologyType::UpcA
                | SymbologyType::Code39
                | SymbologyType::Code39Mod43
                | SymbologyType::Code93
                | SymbologyType::Code128
                | SymbologyType::Ean8
                | SymbologyType::Ean13
                | SymbologyType::Aztec
                | SymbologyType::Pdf417
                | SymbologyType::Itf14
                | SymbologyType::DataMatrix
                | SymbologyType::Interleaved2of5
                | SymbologyType::MicroQr
                | SymbologyType::Codabar
                | SymbologyType::Gs1DataBar
        )
    }
}

impl SymbolRecognizer for BarcodeDetector {
    fn name(&self) -> &'static str {
        "barcode"
    }

    fn recognize(&self, frame: &CameraFrame, types: &SupportedCodeTypes) -> Vec<DetectedSymbol> {
        if !types.iter().any(|ty| Self::handles(*ty)) {
            return Vec::new();
        }
        detect_sync(frame, self.max_dimension, types)
    }
}

/// Synchronous barcode detection (runs in a blocking task)
fn detect_sync(
    frame: &CameraFrame,
    max_dimension: u32,
    types: &SupportedCodeTypes,
) -> Vec<DetectedSymbol> {
    let start = std::time::Instant::now();

    let width = frame.width;
    let height = frame.height;
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let scale = processing_scale(width, height, max_dimension);
    let proc_width = ((width as f32 / scale) as u32).max(1);
    let proc_height = ((height as f32 / scale) as u32).max(1);

    let mut luma = Vec::with_capacity((proc_width * proc_height) as usize);
    for y in 0..proc_height {
        for x in 0..proc_width {
            luma.push(frame.luma_at((x as f32 * scale) as u32, (y as f32 * scale) as u32));
        }
    }

    // Nothing found is reported as an error by rxing
    let results = match rxing::helpers::detect_multiple_in_luma(luma, proc_width, proc_height) {
        Ok(results) => results,
        Err(e) => {
            trace!(error = %e, "No barcodes in frame");
            Vec::new()
        }
    };

    trace!(
        proc_width,
        proc_height,
        scale,
        results = results.len(),
        detection_ms = start.elapsed().as_millis(),
        "Barcode search complete"
    );

    let detections: Vec<DetectedSymbol> = results
        .iter()
        .filter_map(|result| to_symbol(result, scale, width, height, types))
        .collect();

    if !detections.is_empty() {
        debug!(
            count = detections.len(),
            total_ms = start.elapsed().as_millis(),
            "Barcode detection found codes"
        );
    }

    detections
}

/// Convert one rxing result, dropping formats that were not requested
fn to_symbol(
    result: &RXingResult,
    scale: f32,
    frame_width: u32,
    frame_height: u32,
    types: &SupportedCodeTypes,
) -> Option<DetectedSymbol> {
    let (symbology, text) = classify(result.getBarcodeFormat(), result.getText(), types)?;
    if !types.contains(symbology) {
        return None;
    }

    let mut corners: Vec<(f32, f32)> = result
        .getPoints()
        .iter()
        .map(|p| (p.x * scale, p.y * scale))
        .collect();
    widen_scan_line(&mut corners);
    let region = FrameRegion::bounding(&corners, frame_width, frame_height)?;

    debug!(
        symbology = %symbology,
        content = %text,
        x = region.x,
        y = region.y,
        width = region.width,
        height = region.height,
        "Detected barcode"
    );

    Some(DetectedSymbol::new(symbology, Some(text), region))
}

/// Map an rxing format to a symbology, fixing up the decoded text
///
/// UPC-A is reported as EAN-13 with a leading zero when only EAN-13 is
/// requested. A Code 39 payload whose last character is a valid mod 43 check
/// character counts as Code 39 Mod 43 when that type is requested.
fn classify(
    format: &BarcodeFormat,
    text: &str,
    types: &SupportedCodeTypes,
) -> Option<(SymbologyType, String)> {
    let symbology = match format {
        BarcodeFormat::UPC_A => {
            if !types.contains(SymbologyType::UpcA) && types.contains(SymbologyType::Ean13) {
                return Some((SymbologyType::Ean13, format!("0{}", text)));
            }
            SymbologyType::UpcA
        }
        BarcodeFormat::UPC_E => SymbologyType::UpcE,
        BarcodeFormat::EAN_8 => SymbologyType::Ean8,
        BarcodeFormat::EAN_13 => SymbologyType::Ean13,
        BarcodeFormat::CODE_39 => {
            if types.contains(SymbologyType::Code39Mod43) && has_mod43_check(text) {
                SymbologyType::Code39Mod43
            } else {
                SymbologyType::Code39
            }
        }
        BarcodeFormat::CODE_93 => SymbologyType::Code93,
        BarcodeFormat::CODE_128 => SymbologyType::Code128,
        BarcodeFormat::ITF if text.len() == 14 => SymbologyType::Itf14,
        BarcodeFormat::ITF => SymbologyType::Interleaved2of5,
        BarcodeFormat::CODABAR => SymbologyType::Codabar,
        BarcodeFormat::RSS_14 | BarcodeFormat::RSS_EXPANDED => SymbologyType::Gs1DataBar,
        BarcodeFormat::AZTEC => SymbologyType::Aztec,
        BarcodeFormat::DATA_MATRIX => SymbologyType::DataMatrix,
        BarcodeFormat::PDF_417 => SymbologyType::Pdf417,
        BarcodeFormat::MICRO_QR_CODE => SymbologyType::MicroQr,
        _ => return None,
    };
    Some((symbology, text.to_string()))
}

/// Whether the last character is the mod 43 check of the ones before it
fn has_mod43_check(text: &str) -> bool {
    let values: Option<Vec<usize>> = text.chars().map(|c| CODE39_ALPHABET.find(c)).collect();
    match values.as_deref() {
        Some([data @ .., check]) if !data.is_empty() => data.iter().sum::<usize>() % 43 == *check,
        _ => false,
    }
}

/// Give a code located on a scan line a visible height
fn widen_scan_line(corners: &mut Vec<(f32, f32)>) {
    if corners.is_empty() {
        return;
    }
    let min_x = corners.iter().map(|p| p.0).fold(f32::MAX, f32::min);
    let max_x = corners.iter().map(|p| p.0).fold(f32::MIN, f32::max);
    let min_y = corners.iter().map(|p| p.1).fold(f32::MAX, f32::min);
    let max_y = corners.iter().map(|p| p.1).fold(f32::MIN, f32::max);

    let min_height = (max_x - min_x) * LINEAR_HEIGHT_RATIO;
    if max_y - min_y < min_height {
        let mid = (min_y + max_y) / 2.0;
        corners.push((min_x, mid - min_height / 2.0));
        corners.push((max_x, mid + min_height / 2.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::frame_processor::tasks::test_frames::{near, render};

    #[test]
    fn test_code128_text_and_region() {
        let (frame, (left, top, right, bottom)) = render(
            BarcodeFormat::CODE_128,
            "SHELF-0042",
            (600, 120),
            (640, 240),
            (20, 60),
        );
        let symbols = BarcodeDetector::new().recognize(&frame, &SupportedCodeTypes::default());

        assert_eq!(symbols.len(), 1);
        let symbol = &symbols[0];
        assert_eq!(symbol.symbology, SymbologyType::Code128);
        assert_eq!(symbol.text.as_deref(), Some("SHELF-0042"));

        // The scan line runs between the start and stop guards
        let region = symbol.bounds;
        assert!(near(region.x, left as f32 / 640.0, 0.05), "{:?}", region);
        assert!(
            near(region.x + region.width, (right + 1) as f32 / 640.0, 0.05),
            "{:?}",
            region
        );
        let center_y = (region.y + region.height / 2.0) * 240.0;
        assert!(center_y >= top as f32 && center_y <= bottom as f32, "{:?}", region);
        assert!(region.height > 0.0);
    }

    #[test]
    fn test_code128_downscaled() {
        let (frame, (left, _, right, _)) = render(
            BarcodeFormat::CODE_128,
            "SHELF-0042",
            (1200, 200),
            (1280, 360),
            (40, 80),
        );
        let symbols = BarcodeDetector::with_max_dimension(640)
            .recognize(&frame, &SupportedCodeTypes::default());

        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].text.as_deref(), Some("SHELF-0042"));
        let region = symbols[0].bounds;
        assert!(near(region.x, left as f32 / 1280.0, 0.05), "{:?}", region);
        assert!(
            near(region.x + region.width, (right + 1) as f32 / 1280.0, 0.05),
            "{:?}",
            region
        );
    }

    #[test]
    fn test_ean13() {
        let (frame, _) = render(
            BarcodeFormat::EAN_13,
            "4006381333931",
            (400, 120),
            (480, 200),
            (40, 40),
        );
        let symbols = BarcodeDetector::new().recognize(&frame, &SupportedCodeTypes::default());
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].symbology, SymbologyType::Ean13);
        assert_eq!(symbols[0].text.as_deref(), Some("4006381333931"));
    }

    #[test]
    fn test_data_matrix_region() {
        let (frame, (left, top, right, bottom)) = render(
            BarcodeFormat::DATA_MATRIX,
            "BIN 7",
            (160, 160),
            (320, 240),
            (80, 40),
        );
        let symbols = BarcodeDetector::new().recognize(&frame, &SupportedCodeTypes::default());

        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].symbology, SymbologyType::DataMatrix);
        assert_eq!(symbols[0].text.as_deref(), Some("BIN 7"));
        let region = symbols[0].bounds;
        let tolerance = 0.06;
        assert!(near(region.x, left as f32 / 320.0, tolerance), "{:?}", region);
        assert!(near(region.y, top as f32 / 240.0, tolerance), "{:?}", region);
        assert!(
            near(region.x + region.width, (right + 1) as f32 / 320.0, tolerance),
            "{:?}",
            region
        );
        assert!(
            near(region.y + region.height, (bottom + 1) as f32 / 240.0, tolerance),
            "{:?}",
            region
        );
    }

    #[test]
    fn test_unrequested_type_is_dropped() {
        let (frame, _) = render(
            BarcodeFormat::CODE_128,
            "SHELF-0042",
            (400, 100),
            (480, 160),
            (40, 30),
        );
        let types = SupportedCodeTypes::new([SymbologyType::Ean13, SymbologyType::Qr]);
        assert!(BarcodeDetector::new().recognize(&frame, &types).is_empty());
    }

    #[test]
    fn test_qr_left_to_qr_detector() {
        let (frame, _) = render(
            BarcodeFormat::QR_CODE,
            "https://example.com",
            (200, 200),
            (320, 240),
            (60, 20),
        );
        assert!(
            BarcodeDetector::new()
                .recognize(&frame, &SupportedCodeTypes::default())
                .is_empty()
        );
    }

    #[test]
    fn test_classify_upc_a_as_ean13() {
        let ean_only = SupportedCodeTypes::new([SymbologyType::Ean13]);
        assert_eq!(
            classify(&BarcodeFormat::UPC_A, "036000291452", &ean_only),
            Some((SymbologyType::Ean13, "0036000291452".to_string()))
        );

        let upc = SupportedCodeTypes::new([SymbologyType::UpcA, SymbologyType::Ean13]);
        assert_eq!(
            classify(&BarcodeFormat::UPC_A, "036000291452", &upc),
            Some((SymbologyType::UpcA, "036000291452".to_string()))
        );
    }

    #[test]
    fn test_classify_itf_length() {
        let types = SupportedCodeTypes::default();
        assert_eq!(
            classify(&BarcodeFormat::ITF, "15400141288763", &types).map(|s| s.0),
            Some(SymbologyType::Itf14)
        );
        assert_eq!(
            classify(&BarcodeFormat::ITF, "123456", &types).map(|s| s.0),
            Some(SymbologyType::Interleaved2of5)
        );
        assert_eq!(classify(&BarcodeFormat::QR_CODE, "x", &types), None);
    }

    #[test]
    fn test_mod43_check() {
        // CODE39: C=12 O=24 D=13 E=14 3=3 9=9, sum 75, 75 % 43 = 32 = W
        assert!(has_mod43_check("CODE39W"));
        assert!(!has_mod43_check("CODE39X"));
        assert!(!has_mod43_check("W"));
        assert!(!has_mod43_check("code39w"));

        let types = SupportedCodeTypes::default();
        assert_eq!(
            classify(&BarcodeFormat::CODE_39, "CODE39W", &types).map(|s| s.0),
            Some(SymbologyType::Code39Mod43)
        );
        let plain = SupportedCodeTypes::new([SymbologyType::Code39]);
        assert_eq!(
            classify(&BarcodeFormat::CODE_39, "CODE39W", &plain).map(|s| s.0),
            Some(SymbologyType::Code39)
        );
    }

    #[test]
    fn test_widen_scan_line() {
        let mut corners = vec![(10.0, 50.0), (110.0, 50.0)];
        widen_scan_line(&mut corners);
        let region = FrameRegion::bounding(&corners, 200, 200).unwrap();
        assert!(near(region.height * 200.0, 25.0, 0.01));
        assert!(near(region.y * 200.0, 37.5, 0.01));

        let mut square = vec![(0.0, 0.0), (40.0, 0.0), (40.0, 40.0), (0.0, 40.0)];
        widen_scan_line(&mut square);
        assert_eq!(square.len(), 4);
    }

    #[test]
    fn test_blank_frame() {
        let frame = CameraFrame::from_rgba(64, 48, vec![255; 64 * 48 * 4]);
        assert!(
            BarcodeDetector::new()
                .recognize(&frame, &SupportedCodeTypes::default())
                .is_empty()
        );
    }
}
