// SPDX-License-Identifier: GPL-3.0-only

//! Scanner screen and the pieces it is built from
//!
//! - [`session`]: camera discovery, binding and the capture session
//! - [`frame_processor`]: symbol recognition on sampled frames
//! - [`detection`]: turns a detection list into screen updates
//! - [`confirm`]: open-URL confirmation prompt and URL open service
//! - [`preview`], [`highlight`], [`screen`]: the views

pub mod confirm;
pub mod detection;
pub mod frame_processor;
pub mod highlight;
pub mod preview;
pub mod screen;
pub mod session;

pub use confirm::{ConfirmationPrompt, DecodedUrl, SystemUrlOpener, UrlOpener};
pub use detection::{DetectionOutcome, HighlightUpdate, RegionMapper, evaluate};
pub use preview::{PreviewLayer, ScreenRect, VideoGravity};
pub use screen::{Layer, ScannerScreen, ViewStack};
pub use session::{CaptureSession, DiscoverySession, configure_session};
