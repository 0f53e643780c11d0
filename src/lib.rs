// SPDX-License-Identifier: MPL-2.0

//! QR Scanner - scan QR codes and barcodes with a camera
//!
//! This library provides a terminal scanner screen: a live camera preview,
//! a status line with the last decoded text, a highlight around the detected
//! symbol and a confirmation prompt before a decoded URL is opened.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Capture session, recognition, detection handling and screen state
//! - [`backends`]: Camera backend abstraction (V4L2, still image)
//! - [`config`]: User configuration handling
//! - [`terminal`]: Terminal rendering and event loop
//!
//! # Example
//!
//! ```ignore
//! // Run the scanner screen:
//! // qr-scanner
//! // Decode an image without a camera:
//! // qr-scanner decode code.png
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod terminal;

// Re-export commonly used types
pub use app::frame_processor::{DetectedSymbol, SupportedCodeTypes, SymbologyType};
pub use app::{ConfirmationPrompt, ScannerScreen, UrlOpener};
pub use config::Config;
pub use errors::{AppError, AppResult, CameraError};
