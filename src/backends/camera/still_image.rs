// SPDX-License-Identifier: GPL-3.0-only

//! Still image camera
//!
//! Presents an image file as a camera that delivers the same frame at a
//! steady rate. Useful on machines without a suitable camera and for driving
//! the whole scanner pipeline without hardware.

use super::types::*;
use super::{CameraBackend, CaptureStream};
use crate::constants::{file_formats, timing};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// FourCC reported for still image formats
const STILL_IMAGE_FOURCC: &str = "RGBA";

/// Backend exposing one image file as one camera
pub struct StillImageBackend {
    path: PathBuf,
    position: CameraPosition,
}

impl StillImageBackend {
    pub fn new(path: PathBuf, position: CameraPosition) -> Self {
        Self { path, position }
    }
}

impl CameraBackend for StillImageBackend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::StillImage
    }

    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        if !self.is_available() {
            debug!(path = %self.path.display(), "Still image not found");
            return Vec::new();
        }

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "Still image".to_string());

        vec![CameraDevice {
            name,
            path: self.path.to_string_lossy().to_string(),
            position: self.position,
            device_type: CameraDeviceType::WideAngle,
            device_info: None,
        }]
    }

    fn get_formats(&self, device: &CameraDevice) -> Vec<CameraFormat> {
        match image::image_dimensions(&device.path) {
            Ok((width, height)) => vec![CameraFormat {
                width,
                height,
                framerate: Some(Framerate::from_int(30)),
                pixel_format: STILL_IMAGE_FOURCC.to_string(),
            }],
            Err(e) => {
                warn!(path = %device.path, error = %e, "Cannot read image dimensions");
                Vec::new()
            }
        }
    }

    fn open(
        &self,
        device: &CameraDevice,
        format: &CameraFormat,
    ) -> BackendResult<Box<dyn CaptureStream>> {
        let frame = load_image_as_frame(Path::new(&device.path))?;
        Ok(Box::new(StillImageStream {
            frame,
            format: format.clone(),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        }))
    }
}

/// Load an image file as an RGBA frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !file_formats::is_image_extension(&extension) {
        return Err(BackendError::FormatNotSupported(format!(
            "Unsupported file format: {}",
            extension
        )));
    }

    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        BackendError::Other(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();

    debug!(width, height, "Image loaded successfully");

    Ok(CameraFrame::from_rgba(width, height, rgba.into_raw()))
}

/// Replays one frame until stopped
pub struct StillImageStream {
    frame: CameraFrame,
    format: CameraFormat,
    running: Arc<AtomicBool>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl CaptureStream for StillImageStream {
    fn start(&mut self, mut outputs: FrameOutputs) -> BackendResult<()> {
        if self.thread_handle.is_some() {
            return Err(BackendError::AlreadyStreaming);
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let template = self.frame.clone();

        let handle = std::thread::Builder::new()
            .name("still-image".into())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    let mut frame = template.clone();
                    frame.captured_at = Instant::now();
                    if !outputs.dispatch(&frame) {
                        break;
                    }
                    std::thread::sleep(timing::STILL_IMAGE_FRAME_INTERVAL);
                }
                running.store(false, Ordering::SeqCst);
                debug!("Still image replay ended");
            })?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take()
            && handle.join().is_err()
        {
            warn!("Still image thread panicked");
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn format(&self) -> &CameraFormat {
        &self.format
    }
}

impl Drop for StillImageStream {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_has_no_cameras() {
        let backend = StillImageBackend::new(
            PathBuf::from("/nonexistent/qr.png"),
            CameraPosition::Back,
        );
        assert!(!backend.is_available());
        assert!(backend.enumerate_cameras().is_empty());
    }

    #[test]
    fn test_rejects_non_image_extension() {
        let result = load_image_as_frame(Path::new("/tmp/notes.txt"));
        assert!(matches!(result, Err(BackendError::FormatNotSupported(_))));
    }

    #[test]
    fn test_replays_frames_until_stopped() {
        let path = std::env::temp_dir().join(format!("qr-scanner-{}.png", uuid::Uuid::new_v4()));
        image::RgbaImage::from_pixel(8, 6, image::Rgba([255, 255, 255, 255]))
            .save(&path)
            .unwrap();

        let backend = StillImageBackend::new(path.clone(), CameraPosition::Back);
        let cameras = backend.enumerate_cameras();
        assert_eq!(cameras.len(), 1);
        assert_eq!(cameras[0].position, CameraPosition::Back);

        let formats = backend.get_formats(&cameras[0]);
        assert_eq!((formats[0].width, formats[0].height), (8, 6));

        let mut stream = backend.open(&cameras[0], &formats[0]).unwrap();
        let mut outputs = FrameOutputs::new();
        let mut receiver = outputs.add("test", 2);
        stream.start(outputs).unwrap();

        let frame = futures::executor::block_on(futures::StreamExt::next(&mut receiver)).unwrap();
        assert_eq!((frame.width, frame.height), (8, 6));

        stream.stop().unwrap();
        assert!(!stream.is_running());
        let _ = std::fs::remove_file(path);
    }
}
