// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 mmap capture loop
//!
//! Runs on its own thread. Each dequeued buffer is turned into a
//! [`CameraFrame`] and pushed to every consumer with `try_send`; consumers
//! that are busy simply miss the frame.

use crate::backends::camera::types::{CameraFrame, FrameOutputs, PixelFormat};
use crate::constants::{capture, timing};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::Device;
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream as _;

/// Geometry of the negotiated capture format
#[derive(Debug, Clone)]
pub struct NegotiatedFormat {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub fourcc: String,
}

/// Main capture loop running in a separate thread
pub fn capture_loop(
    device: Device,
    format: NegotiatedFormat,
    mut outputs: FrameOutputs,
    running: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut stream =
        MmapStream::with_buffers(&device, Type::VideoCapture, capture::V4L2_BUFFER_COUNT)
            .map_err(|e| format!("Failed to create buffer stream: {}", e))?;

    info!(
        width = format.width,
        height = format.height,
        fourcc = %format.fourcc,
        "V4L2 capture stream started"
    );

    while running.load(Ordering::SeqCst) {
        match stream.next() {
            Ok((buf, meta)) => {
                let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);
                let used = (meta.bytesused as usize).min(buf.len());
                let used = if used == 0 { buf.len() } else { used };

                let Some(frame) = frame_from_buffer(&buf[..used], &format) else {
                    if frame_num % 30 == 0 {
                        debug!(frame = frame_num, size = used, "Could not convert V4L2 buffer");
                    }
                    continue;
                };

                if !outputs.dispatch(&frame) {
                    info!("All frame consumers disconnected");
                    break;
                }

                if frame_num % 300 == 0 {
                    debug!(
                        frame = frame_num,
                        sequence = meta.sequence,
                        size = used,
                        "Camera frame captured"
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to capture frame");
                std::thread::sleep(timing::CAPTURE_RETRY_DELAY);
            }
        }
    }

    info!("V4L2 capture loop ended");
    Ok(())
}

/// Turn a raw V4L2 buffer into a frame consumers can sample
///
/// Raw formats are copied as-is (respecting the driver's stride). MJPG is
/// decoded to RGBA here so nothing downstream needs a JPEG decoder.
pub fn frame_from_buffer(buf: &[u8], format: &NegotiatedFormat) -> Option<CameraFrame> {
    let captured_at = Instant::now();

    if format.fourcc == "MJPG" || format.fourcc == "JPEG" {
        let img = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg).ok()?;
        let rgba = img.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        let mut frame = CameraFrame::from_rgba(width, height, rgba.into_raw());
        frame.captured_at = captured_at;
        return Some(frame);
    }

    let pixel_format = PixelFormat::from_fourcc(&format.fourcc)?;
    let packed_stride = (format.width as f32 * pixel_format.bytes_per_pixel()) as u32;
    let stride = if format.stride >= packed_stride {
        format.stride
    } else {
        packed_stride
    };

    let expected = stride as usize * format.height.saturating_sub(1) as usize
        + packed_stride as usize;
    if buf.len() < expected {
        return None;
    }

    Some(CameraFrame {
        width: format.width,
        height: format.height,
        data: Arc::from(buf),
        format: pixel_format,
        stride,
        captured_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn negotiated(fourcc: &str, width: u32, height: u32, stride: u32) -> NegotiatedFormat {
        NegotiatedFormat {
            width,
            height,
            stride,
            fourcc: fourcc.to_string(),
        }
    }

    #[test]
    fn test_yuyv_buffer_keeps_stride() {
        let buf = vec![0u8; 12 * 2];
        let frame = frame_from_buffer(&buf, &negotiated("YUYV", 4, 2, 12)).unwrap();
        assert_eq!(frame.format, PixelFormat::YUYV);
        assert_eq!(frame.stride, 12);
    }

    #[test]
    fn test_missing_stride_falls_back_to_packed() {
        let buf = vec![0u8; 4 * 2];
        let frame = frame_from_buffer(&buf, &negotiated("GREY", 4, 2, 0)).unwrap();
        assert_eq!(frame.stride, 4);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let buf = vec![0u8; 5];
        assert!(frame_from_buffer(&buf, &negotiated("RGB3", 4, 2, 12)).is_none());
    }

    #[test]
    fn test_unknown_fourcc_rejected() {
        let buf = vec![0u8; 64];
        assert!(frame_from_buffer(&buf, &negotiated("Y10B", 4, 2, 5)).is_none());
    }

    #[test]
    fn test_corrupt_jpeg_rejected() {
        let buf = vec![0xffu8, 0xd8, 0x00, 0x01];
        assert!(frame_from_buffer(&buf, &negotiated("MJPG", 4, 2, 0)).is_none());
    }
}
