// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use futures::channel::mpsc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// Video4Linux2 capture devices (`/dev/video*`)
    #[default]
    V4l2,
    /// A still image replayed as a camera
    StillImage,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::StillImage => write!(f, "still image"),
        }
    }
}

/// Device information from V4L2 capability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Bus the device hangs off (e.g. `usb-0000:00:14.0-6`)
    pub bus: String,
    /// Device path (e.g., /dev/video0)
    pub path: String,
    /// Real device path (resolved symlinks)
    pub real_path: String,
}

/// Physical position of a camera relative to the device it is mounted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    /// Facing the user
    Front,
    /// Facing away from the user
    #[default]
    Back,
    /// Plugged-in camera with no fixed mounting (USB webcams)
    External,
    /// The system does not say
    Unspecified,
}

impl CameraPosition {
    /// Map a device tree `orientation` property value
    ///
    /// 0 = front, 1 = back, 2 = external (see the video-interface-devices
    /// device tree binding).
    pub fn from_orientation(value: u32) -> Self {
        match value {
            0 => CameraPosition::Front,
            1 => CameraPosition::Back,
            2 => CameraPosition::External,
            _ => CameraPosition::Unspecified,
        }
    }

    /// Parse a position name as used on the command line
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "front" => Some(CameraPosition::Front),
            "back" | "rear" => Some(CameraPosition::Back),
            "external" => Some(CameraPosition::External),
            "unspecified" => Some(CameraPosition::Unspecified),
            _ => None,
        }
    }

    /// Front cameras preview mirrored
    pub fn is_mirrored(&self) -> bool {
        matches!(self, CameraPosition::Front)
    }
}

impl std::fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraPosition::Front => write!(f, "front"),
            CameraPosition::Back => write!(f, "back"),
            CameraPosition::External => write!(f, "external"),
            CameraPosition::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Physical kind of camera module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraDeviceType {
    /// General purpose colour camera
    #[default]
    WideAngle,
    /// Shorter focal length than wide angle
    UltraWide,
    /// Longer focal length than wide angle
    Telephoto,
    /// Depth sensor (structured light, time of flight)
    Depth,
    /// Monochrome infrared sensor
    Infrared,
}

impl std::fmt::Display for CameraDeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraDeviceType::WideAngle => write!(f, "wide angle"),
            CameraDeviceType::UltraWide => write!(f, "ultra wide"),
            CameraDeviceType::Telephoto => write!(f, "telephoto"),
            CameraDeviceType::Depth => write!(f, "depth"),
            CameraDeviceType::Infrared => write!(f, "infrared"),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq)]
pub struct CameraDevice {
    pub name: String,
    pub path: String, // Capture node (/dev/videoN) or image file path
    pub position: CameraPosition,
    pub device_type: CameraDeviceType,
    pub device_info: Option<DeviceInfo>, // V4L2 device information (card, driver, bus, path)
}

impl std::fmt::Display for CameraDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {} camera, {})",
            self.name, self.path, self.position, self.device_type
        )
    }
}

/// Framerate as a fraction (numerator/denominator)
/// Stores exact framerate to handle NTSC rates like 59.94fps (60000/1001)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    /// Create a new framerate from numerator and denominator
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    /// Create a framerate from an integer (e.g., 30 becomes 30/1)
    pub fn from_int(fps: u32) -> Self {
        Self { num: fps, denom: 1 }
    }

    /// Get the framerate as a floating point value
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    /// Get the rounded integer framerate
    pub fn as_int(&self) -> u32 {
        self.num / self.denom
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show decimal for non-integer framerates (NTSC)
        if self.denom != 1 {
            write!(f, "{:.2}", self.as_f64())
        } else {
            write!(f, "{}", self.num)
        }
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self { num: 30, denom: 1 }
    }
}

/// Camera format specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: Option<Framerate>,
    pub pixel_format: String, // FourCC code (e.g., "MJPG", "YUYV")
}

impl CameraFormat {
    /// Pixel count, used when ranking formats
    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(fps) = &self.framerate {
            write!(
                f,
                "{}x{} @ {}fps {}",
                self.width, self.height, fps, self.pixel_format
            )
        } else {
            write!(f, "{}x{} {}", self.width, self.height, self.pixel_format)
        }
    }
}

/// Pixel layout of frame data after it leaves the backend
///
/// Compressed capture formats (MJPG) are decoded to RGBA in the capture
/// thread, so consumers only ever see these layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    /// Common raw format from webcam sensors
    YUYV,
}

impl PixelFormat {
    /// Map a V4L2 FourCC to the layout delivered to consumers
    pub fn from_fourcc(fourcc: &str) -> Option<Self> {
        match fourcc {
            "YUYV" => Some(Self::YUYV),
            "RGB3" => Some(Self::RGB24),
            "GREY" => Some(Self::Gray8),
            "MJPG" | "JPEG" => Some(Self::RGBA),
            _ => None,
        }
    }

    /// Average bytes per pixel (accounting for chroma subsampling)
    pub fn bytes_per_pixel(&self) -> f32 {
        match self {
            Self::RGBA => 4.0,
            Self::RGB24 => 3.0,
            Self::YUYV => 2.0,
            Self::Gray8 => 1.0,
        }
    }
}

/// A single frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data, rows `stride` bytes apart
    pub data: Arc<[u8]>,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride (bytes per row, may include padding)
    pub stride: u32,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a tightly packed RGBA frame
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format: PixelFormat::RGBA,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// Data as a byte slice
    pub fn data_slice(&self) -> &[u8] {
        &self.data
    }

    /// Luma (0-255) of the pixel at (x, y), clamped to the frame
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let data = self.data_slice();

        match self.format {
            PixelFormat::Gray8 => {
                let idx = (y * self.stride + x) as usize;
                data.get(idx).copied().unwrap_or(0)
            }
            PixelFormat::YUYV => {
                // Y sits on every even byte
                let idx = (y * self.stride + x * 2) as usize;
                data.get(idx).copied().unwrap_or(0)
            }
            PixelFormat::RGBA | PixelFormat::RGB24 => {
                let (r, g, b) = self.rgb_at(x, y);
                // BT.601 luma
                ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
            }
        }
    }

    /// RGB of the pixel at (x, y), clamped to the frame
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if self.width == 0 || self.height == 0 {
            return (0, 0, 0);
        }
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let data = self.data_slice();

        match self.format {
            PixelFormat::RGBA => {
                let idx = (y * self.stride + x * 4) as usize;
                if idx + 2 < data.len() {
                    (data[idx], data[idx + 1], data[idx + 2])
                } else {
                    (0, 0, 0)
                }
            }
            PixelFormat::RGB24 => {
                let idx = (y * self.stride + x * 3) as usize;
                if idx + 2 < data.len() {
                    (data[idx], data[idx + 1], data[idx + 2])
                } else {
                    (0, 0, 0)
                }
            }
            PixelFormat::Gray8 => {
                let idx = (y * self.stride + x) as usize;
                let v = data.get(idx).copied().unwrap_or(0);
                (v, v, v)
            }
            PixelFormat::YUYV => {
                // Packed 4:2:2: two pixels share chroma
                // YUYV: Y0 U  Y1 V  (4 bytes per 2 pixels)
                let pair_x = (x & !1) as usize;
                let base = (y as usize) * (self.stride as usize) + pair_x * 2;
                if base + 3 >= data.len() {
                    return (0, 0, 0);
                }
                let luma = if x & 1 == 0 {
                    data[base]
                } else {
                    data[base + 2]
                };
                yuv_to_rgb(luma, data[base + 1], data[base + 3])
            }
        }
    }
}

/// Convert YUV (BT.601) to RGB
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

/// Frame receiver type for preview and recognition streams
pub type FrameReceiver = mpsc::Receiver<CameraFrame>;

/// Frame sender type for preview and recognition streams
pub type FrameSender = mpsc::Sender<CameraFrame>;

/// Fan-out of one capture stream to several consumers
///
/// Each consumer gets its own bounded channel. Delivery uses `try_send`, so
/// a consumer that falls behind misses frames instead of queueing them.
#[derive(Default)]
pub struct FrameOutputs {
    senders: Vec<(&'static str, FrameSender)>,
}

impl FrameOutputs {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named consumer and return its receiving end
    pub fn add(&mut self, name: &'static str, capacity: usize) -> FrameReceiver {
        let (sender, receiver) = mpsc::channel(capacity);
        self.senders.push((name, sender));
        receiver
    }

    /// Number of consumers still connected
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// True when every consumer has hung up
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Deliver a frame to every consumer
    ///
    /// Consumers whose receiver was dropped are removed. Returns false once
    /// no consumer is left, which capture loops treat as a stop request.
    pub fn dispatch(&mut self, frame: &CameraFrame) -> bool {
        self.senders.retain_mut(|(name, sender)| match sender.try_send(frame.clone()) {
            Ok(()) => true,
            Err(e) if e.is_full() => {
                trace!(consumer = *name, "Frame dropped (channel full)");
                true
            }
            Err(_) => false,
        });
        !self.senders.is_empty()
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// Stream is already running
    AlreadyStreaming,
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::AlreadyStreaming => write!(f, "Stream already running"),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}
