// SPDX-License-Identifier: MPL-2.0

//! Frame processor module for symbol recognition
//!
//! This module turns camera frames into per-frame lists of detected symbols.
//! Recognizers sit behind [`tasks::SymbolRecognizer`]. QR codes are handled by
//! [`tasks::QrDetector`], every other barcode family by
//! [`tasks::BarcodeDetector`], and [`tasks::RecognizerChain`] runs both.

pub mod tasks;
pub mod types;

pub use tasks::{BarcodeDetector, QrDetector, RecognizerChain, SymbolRecognizer};
pub use types::{DetectedSymbol, FrameRegion, SupportedCodeTypes, SymbologyType};
