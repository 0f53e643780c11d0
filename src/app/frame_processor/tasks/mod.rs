// SPDX-License-Identifier: GPL-3.0-only

//! Frame recognition tasks
//!
//! Recognizers are synchronous and CPU bound. [`recognize`] runs one on the
//! blocking pool so the async metadata output never stalls the runtime.

pub mod barcode_detector;
pub mod qr_detector;

pub use barcode_detector::BarcodeDetector;
pub use qr_detector::QrDetector;

use crate::app::frame_processor::types::{DetectedSymbol, SupportedCodeTypes};
use crate::backends::camera::types::CameraFrame;
use std::sync::Arc;
use tracing::warn;

/// Finds machine-readable symbols in a frame
pub trait SymbolRecognizer: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Recognize symbols, reporting only the requested types
    fn recognize(&self, frame: &CameraFrame, types: &SupportedCodeTypes) -> Vec<DetectedSymbol>;
}

/// Several recognizers run in order over the same frame
///
/// Results are concatenated, so earlier recognizers win the "first symbol"
/// slot the screen reacts to.
pub struct RecognizerChain {
    recognizers: Vec<Arc<dyn SymbolRecognizer>>,
}

impl RecognizerChain {
    pub fn new(recognizers: Vec<Arc<dyn SymbolRecognizer>>) -> Self {
        Self { recognizers }
    }

    /// QR codes through rqrr, every other barcode family through rxing
    pub fn standard(max_dimension: u32) -> Self {
        Self::new(vec![
            Arc::new(QrDetector::with_max_dimension(max_dimension)),
            Arc::new(BarcodeDetector::with_max_dimension(max_dimension)),
        ])
    }
}

impl SymbolRecognizer for RecognizerChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn recognize(&self, frame: &CameraFrame, types: &SupportedCodeTypes) -> Vec<DetectedSymbol> {
        self.recognizers
            .iter()
            .flat_map(|recognizer| recognizer.recognize(frame, types))
            .collect()
    }
}

/// Scale factor that brings the frame within `max_dimension`
pub(crate) fn processing_scale(width: u32, height: u32, max_dimension: u32) -> f32 {
    if width > max_dimension || height > max_dimension {
        (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32)
    } else {
        1.0
    }
}

/// Run a recognizer on the blocking pool
///
/// A panicking recognizer yields an empty detection list.
pub async fn recognize(
    recognizer: Arc<dyn SymbolRecognizer>,
    frame: CameraFrame,
    types: Arc<SupportedCodeTypes>,
) -> Vec<DetectedSymbol> {
    let name = recognizer.name();
    tokio::task::spawn_blocking(move || recognizer.recognize(&frame, &types))
        .await
        .unwrap_or_else(|e| {
            warn!(recognizer = name, error = %e, "Recognition task panicked");
            Vec::new()
        })
}
