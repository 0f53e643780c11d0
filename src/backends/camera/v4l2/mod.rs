// SPDX-License-Identifier: GPL-3.0-only

//! Video4Linux2 camera backend
//!
//! Uses the v4l crate directly: enumeration through the device nodes and
//! capture through an mmap stream on a dedicated thread.

pub mod capture;
pub mod enumeration;

use super::types::*;
use super::{CameraBackend, CaptureStream};
use capture::NegotiatedFormat;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use v4l::video::Capture;
use v4l::video::capture::Parameters;
use v4l::{Device, FourCC};

/// V4L2 backend
pub struct V4l2Backend {
    /// Per-device position overrides (key = device path)
    position_overrides: HashMap<String, CameraPosition>,
}

impl V4l2Backend {
    pub fn new(position_overrides: HashMap<String, CameraPosition>) -> Self {
        Self { position_overrides }
    }
}

impl CameraBackend for V4l2Backend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    fn is_available(&self) -> bool {
        !v4l::context::enum_devices().is_empty()
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        enumeration::enumerate_devices(&self.position_overrides)
    }

    fn get_formats(&self, device: &CameraDevice) -> Vec<CameraFormat> {
        enumeration::enumerate_formats(&device.path)
    }

    fn open(
        &self,
        device: &CameraDevice,
        format: &CameraFormat,
    ) -> BackendResult<Box<dyn CaptureStream>> {
        Ok(Box::new(V4l2Stream::open(device, format)?))
    }
}

/// An opened V4L2 device with a negotiated format
pub struct V4l2Stream {
    device_path: String,
    format: CameraFormat,
    negotiated: NegotiatedFormat,
    /// Held until `start` moves it into the capture thread
    device: Option<Device>,
    running: Arc<AtomicBool>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

impl V4l2Stream {
    /// Open the device and negotiate the requested format
    pub fn open(device: &CameraDevice, format: &CameraFormat) -> BackendResult<Self> {
        let dev = Device::with_path(&device.path).map_err(|e| {
            BackendError::DeviceNotFound(format!("Failed to open {}: {}", device.path, e))
        })?;

        let fourcc_bytes: [u8; 4] = format
            .pixel_format
            .as_bytes()
            .try_into()
            .map_err(|_| BackendError::FormatNotSupported(format.pixel_format.clone()))?;
        let fourcc = FourCC::new(&fourcc_bytes);

        let mut requested = dev
            .format()
            .map_err(|e| BackendError::InitializationFailed(format!("Failed to get format: {}", e)))?;
        requested.width = format.width;
        requested.height = format.height;
        requested.fourcc = fourcc;

        let applied = dev
            .set_format(&requested)
            .map_err(|e| BackendError::InitializationFailed(format!("Failed to set format: {}", e)))?;

        if applied.fourcc != fourcc {
            return Err(BackendError::FormatNotSupported(format!(
                "{} rejected {}, got {}",
                device.path,
                format.pixel_format,
                applied.fourcc.str().unwrap_or("????")
            )));
        }

        if let Some(fps) = format.framerate
            && let Err(e) = dev.set_params(&Parameters::with_fps(fps.as_int()))
        {
            warn!(error = %e, fps = %fps, "Could not set framerate, using driver default");
        }

        info!(
            device = %device.path,
            width = applied.width,
            height = applied.height,
            stride = applied.stride,
            fourcc = %format.pixel_format,
            "Negotiated V4L2 format"
        );

        Ok(Self {
            device_path: device.path.clone(),
            format: CameraFormat {
                width: applied.width,
                height: applied.height,
                framerate: format.framerate,
                pixel_format: format.pixel_format.clone(),
            },
            negotiated: NegotiatedFormat {
                width: applied.width,
                height: applied.height,
                stride: applied.stride,
                fourcc: format.pixel_format.clone(),
            },
            device: Some(dev),
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: None,
        })
    }
}

impl CaptureStream for V4l2Stream {
    fn start(&mut self, outputs: FrameOutputs) -> BackendResult<()> {
        let device = self.device.take().ok_or(BackendError::AlreadyStreaming)?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let negotiated = self.negotiated.clone();
        let device_path = self.device_path.clone();

        let handle = std::thread::Builder::new()
            .name("v4l2-capture".into())
            .spawn(move || {
                if let Err(e) = capture::capture_loop(device, negotiated, outputs, Arc::clone(&running)) {
                    error!(device = %device_path, error = %e, "Capture loop failed");
                }
                running.store(false, Ordering::SeqCst);
            })?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        info!(device = %self.device_path, "Stopping V4L2 stream");
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            match handle.join() {
                Ok(_) => info!("Capture thread stopped"),
                Err(_) => warn!("Capture thread panicked"),
            }
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

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        // Don't wait for the thread in drop; it exits after the next dequeue
        self.running.store(false, Ordering::SeqCst);
    }
}
