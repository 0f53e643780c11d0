// SPDX-License-Identifier: MPL-2.0

//! Core types for frame processing results
//!
//! These types represent the output of recognition and are consumed by the
//! scanner screen to update its status label and highlight.

use serde::{Deserialize, Serialize};

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame dimensions.
/// This allows easy transformation to screen coordinates regardless of
/// the actual frame size or display scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRegion {
    /// Left edge (0.0 = left of frame, 1.0 = right of frame)
    pub x: f32,
    /// Top edge (0.0 = top of frame, 1.0 = bottom of frame)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
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

    /// Smallest region containing all points (pixel coordinates)
    ///
    /// Returns `None` for an empty point list or a zero-sized frame.
    pub fn bounding(points: &[(f32, f32)], frame_width: u32, frame_height: u32) -> Option<Self> {
        if points.is_empty() || frame_width == 0 || frame_height == 0 {
            return None;
        }

        let (fw, fh) = (frame_width as f32, frame_height as f32);
        let min_x = points.iter().map(|p| p.0).fold(f32::MAX, f32::min).clamp(0.0, fw);
        let max_x = points.iter().map(|p| p.0).fold(f32::MIN, f32::max).clamp(0.0, fw);
        let min_y = points.iter().map(|p| p.1).fold(f32::MAX, f32::min).clamp(0.0, fh);
        let max_y = points.iter().map(|p| p.1).fold(f32::MIN, f32::max).clamp(0.0, fh);

        Some(Self {
            x: min_x / fw,
            y: min_y / fh,
            width: (max_x - min_x) / fw,
            height: (max_y - min_y) / fh,
        })
    }
}

/// Format family of a recognized code
///
/// Covers the machine-readable code families a recognizer can report,
/// including families the scanner does not act on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbologyType {
    UpcE,
    UpcA,
    Code39,
    Code39Mod43,
    Code93,
    Code128,
    Ean8,
    Ean13,
    Aztec,
    Pdf417,
    MicroPdf417,
    Itf14,
    DataMatrix,
    Interleaved2of5,
    Qr,
    MicroQr,
    Codabar,
    Gs1DataBar,
    /// Face region (not a barcode, but reported through the same channel)
    Face,
    /// Human body region
    HumanBody,
}

impl SymbologyType {
    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::UpcE => "UPC-E",
            Self::UpcA => "UPC-A",
            Self::Code39 => "Code 39",
            Self::Code39Mod43 => "Code 39 Mod 43",
            Self::Code93 => "Code 93",
            Self::Code128 => "Code 128",
            Self::Ean8 => "EAN-8",
            Self::Ean13 => "EAN-13",
            Self::Aztec => "Aztec",
            Self::Pdf417 => "PDF417",
            Self::MicroPdf417 => "Micro PDF417",
            Self::Itf14 => "ITF-14",
            Self::DataMatrix => "Data Matrix",
            Self::Interleaved2of5 => "Interleaved 2 of 5",
            Self::Qr => "QR",
            Self::MicroQr => "Micro QR",
            Self::Codabar => "Codabar",
            Self::Gs1DataBar => "GS1 DataBar",
            Self::Face => "Face",
            Self::HumanBody => "Human body",
        }
    }
}

impl std::fmt::Display for SymbologyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The symbology families the scanner recognizes and highlights
///
/// Fixed once the session is configured. Order is kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupportedCodeTypes(Vec<SymbologyType>);

impl SupportedCodeTypes {
    /// The default set: common 1D and 2D barcodes and QR
    ///
    /// Face regions are not included; no bundled recognizer reports them.
    pub const DEFAULT: [SymbologyType; 13] = [
        SymbologyType::UpcE,
        SymbologyType::Code39,
        SymbologyType::Code39Mod43,
        SymbologyType::Code93,
        SymbologyType::Code128,
        SymbologyType::Ean8,
        SymbologyType::Ean13,
        SymbologyType::Aztec,
        SymbologyType::Pdf417,
        SymbologyType::Itf14,
        SymbologyType::DataMatrix,
        SymbologyType::Interleaved2of5,
        SymbologyType::Qr,
    ];

    /// Build a set from a list, dropping duplicates
    pub fn new(types: impl IntoIterator<Item = SymbologyType>) -> Self {
        let mut unique = Vec::new();
        for ty in types {
            if !unique.contains(&ty) {
                unique.push(ty);
            }
        }
        Self(unique)
    }

    pub fn contains(&self, ty: SymbologyType) -> bool {
        self.0.contains(&ty)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbologyType> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SupportedCodeTypes {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

/// A symbol recognized in one frame
///
/// Ephemeral: produced per processed frame and dropped once the screen has
/// reacted to it.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedSymbol {
    /// Format family
    pub symbology: SymbologyType,
    /// Decoded payload, absent when the symbol was located but not decoded
    pub text: Option<String>,
    /// Bounding box in normalized frame coordinates
    pub bounds: FrameRegion,
}

impl DetectedSymbol {
    pub fn new(symbology: SymbologyType, text: Option<String>, bounds: FrameRegion) -> Self {
        Self {
            symbology,
            text,
            bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_region_from_pixels() {
        let region = FrameRegion::from_pixels(100, 50, 200, 100, 1000, 500);
        assert!((region.x - 0.1).abs() < 0.001);
        assert!((region.y - 0.1).abs() < 0.001);
        assert!((region.width - 0.2).abs() < 0.001);
        assert!((region.height - 0.2).abs() < 0.001);
    }

    #[test]
    fn test_frame_region_bounding_clamps_to_frame() {
        let points = [(-10.0, 20.0), (60.0, 20.0), (60.0, 70.0), (-10.0, 70.0)];
        let region = FrameRegion::bounding(&points, 100, 100).unwrap();
        assert_eq!(region.x, 0.0);
        assert!((region.y - 0.2).abs() < 0.001);
        assert!((region.width - 0.6).abs() < 0.001);
        assert!((region.height - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_frame_region_bounding_empty() {
        assert!(FrameRegion::bounding(&[], 100, 100).is_none());
        assert!(FrameRegion::bounding(&[(1.0, 1.0)], 0, 100).is_none());
    }

    #[test]
    fn test_default_supported_types() {
        let supported = SupportedCodeTypes::default();
        assert_eq!(supported.len(), 13);
        assert!(supported.contains(SymbologyType::Qr));
        assert!(!supported.contains(SymbologyType::Face));
        assert!(!supported.contains(SymbologyType::Codabar));
        assert!(!supported.contains(SymbologyType::MicroQr));
    }

    #[test]
    fn test_supported_types_deduplicate() {
        let supported =
            SupportedCodeTypes::new([SymbologyType::Qr, SymbologyType::Ean13, SymbologyType::Qr]);
        assert_eq!(supported.len(), 2);
    }

    #[test]
    fn test_symbology_serde_names() {
        let json = serde_json::to_string(&SymbologyType::Interleaved2of5).unwrap();
        assert_eq!(json, "\"interleaved2of5\"");
        let parsed: SymbologyType = serde_json::from_str("\"code39_mod43\"").unwrap();
        assert_eq!(parsed, SymbologyType::Code39Mod43);
    }
}
