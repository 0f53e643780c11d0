// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │   Capture Session   │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend Trait│  ← Enumeration, format query, open
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────┐
//!       ▼          ▼
//!   ┌──────┐ ┌───────────┐
//!   │ V4L2 │ │Still image│
//!   └──────┘ └───────────┘
//! ```
//!
//! Opening a device yields a [`CaptureStream`]. Starting the stream spawns a
//! capture thread that pushes frames into a [`FrameOutputs`] fan-out.

pub mod still_image;
pub mod types;
pub mod v4l2;

pub use types::*;

use crate::config::Config;
use std::sync::Arc;

/// Camera backend trait
pub trait CameraBackend: Send + Sync {
    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;

    /// Check if this backend is available on the current system
    fn is_available(&self) -> bool;

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Get the formats a device can deliver in a layout the scanner reads
    fn get_formats(&self, device: &CameraDevice) -> Vec<CameraFormat>;

    /// Open a device with the given format
    ///
    /// The returned stream is configured but idle until
    /// [`CaptureStream::start`] is called.
    fn open(
        &self,
        device: &CameraDevice,
        format: &CameraFormat,
    ) -> BackendResult<Box<dyn CaptureStream>>;
}

/// An opened camera that can stream frames
pub trait CaptureStream: Send {
    /// Spawn the capture thread and start delivering frames
    fn start(&mut self, outputs: FrameOutputs) -> BackendResult<()>;

    /// Stop delivering frames and release the device
    fn stop(&mut self) -> BackendResult<()>;

    /// Check whether the capture thread is delivering frames
    fn is_running(&self) -> bool;

    /// The format frames are captured in
    fn format(&self) -> &CameraFormat;
}

/// Build the backend selected by the configuration
pub fn get_backend(config: &Config) -> Arc<dyn CameraBackend> {
    match config.backend {
        CameraBackendType::V4l2 => Arc::new(v4l2::V4l2Backend::new(
            config.position_overrides.clone(),
        )),
        CameraBackendType::StillImage => Arc::new(still_image::StillImageBackend::new(
            config.still_image_path.clone().unwrap_or_default(),
            config.camera_position.unwrap_or_default(),
        )),
    }
}

/// Pick the format closest to the preferred resolution
///
/// Formats with a known framerate win ties over formats without one.
pub fn select_format(formats: &[CameraFormat], width: u32, height: u32) -> Option<CameraFormat> {
    let target_pixels = width as i64 * height as i64;

    formats
        .iter()
        .min_by_key(|f| {
            let diff = (f.pixels() as i64 - target_pixels).abs();
            let fps_penalty = if f.framerate.is_some() { 0 } else { 1 };
            (diff, fps_penalty)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(width: u32, height: u32, fps: Option<u32>) -> CameraFormat {
        CameraFormat {
            width,
            height,
            framerate: fps.map(Framerate::from_int),
            pixel_format: "YUYV".to_string(),
        }
    }

    #[test]
    fn test_select_format_closest_resolution() {
        let formats = vec![
            format(1920, 1080, Some(30)),
            format(640, 480, Some(30)),
            format(320, 240, Some(30)),
        ];
        let selected = select_format(&formats, 640, 480).unwrap();
        assert_eq!((selected.width, selected.height), (640, 480));
    }

    #[test]
    fn test_select_format_prefers_known_framerate() {
        let formats = vec![format(640, 480, None), format(640, 480, Some(15))];
        let selected = select_format(&formats, 640, 480).unwrap();
        assert_eq!(selected.framerate, Some(Framerate::from_int(15)));
    }

    #[test]
    fn test_select_format_empty() {
        assert!(select_format(&[], 640, 480).is_none());
    }
}
