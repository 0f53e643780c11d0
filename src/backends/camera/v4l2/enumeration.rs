// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 device discovery
//!
//! Walks the video4linux nodes, keeps the ones that can capture, and works out
//! where each camera sits and what kind of sensor it is. The kernel exposes
//! neither directly, so both are inferred:
//!
//! - position: device tree `orientation` property, then the bus (USB cameras
//!   are external), then per-path overrides from the config
//! - type: nodes that only offer depth or monochrome formats are not colour
//!   wide-angle cameras

use crate::backends::camera::types::{
    CameraDevice, CameraDeviceType, CameraFormat, CameraPosition, DeviceInfo, Framerate,
};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, trace};
use v4l::capability::Flags;
use v4l::frameinterval::FrameIntervalEnum;
use v4l::framesize::FrameSizeEnum;
use v4l::video::Capture;
use v4l::{Device, FourCC};

/// FourCCs the capture thread knows how to hand on
pub const READABLE_FOURCCS: &[&str] = &["YUYV", "MJPG", "RGB3", "GREY"];

/// FourCCs that only carry depth data
const DEPTH_FOURCCS: &[&str] = &["Z16 ", "Y16 ", "INVZ"];

/// FourCCs that carry monochrome (usually infrared) data
const MONO_FOURCCS: &[&str] = &["GREY", "Y10B", "Y10 ", "Y12 "];

/// Enumerate capture-capable V4L2 nodes
pub fn enumerate_devices(overrides: &HashMap<String, CameraPosition>) -> Vec<CameraDevice> {
    let mut cameras = Vec::new();

    for node in v4l::context::enum_devices() {
        let path = node.path().to_string_lossy().to_string();

        let device = match Device::with_path(node.path()) {
            Ok(device) => device,
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping V4L2 node that cannot be opened");
                continue;
            }
        };

        let caps = match device.query_caps() {
            Ok(caps) => caps,
            Err(e) => {
                debug!(path = %path, error = %e, "Skipping V4L2 node without capabilities");
                continue;
            }
        };

        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            trace!(path = %path, "Skipping non-capture V4L2 node");
            continue;
        }

        let fourccs: Vec<String> = device
            .enum_formats()
            .unwrap_or_default()
            .iter()
            .filter_map(|desc| desc.fourcc.str().ok().map(str::to_string))
            .collect();

        // Metadata nodes advertise VIDEO_CAPTURE but list no formats
        if fourccs.is_empty() {
            trace!(path = %path, "Skipping V4L2 node without pixel formats");
            continue;
        }

        let device_info = build_device_info(&path, &caps.card, &caps.driver, &caps.bus);
        let position = overrides
            .get(&path)
            .copied()
            .unwrap_or_else(|| detect_position(&path, &caps.bus));
        let device_type = classify_device_type(&fourccs);

        let camera = CameraDevice {
            name: node.name().unwrap_or_else(|| caps.card.clone()),
            path,
            position,
            device_type,
            device_info: Some(device_info),
        };

        debug!(camera = %camera, formats = ?fourccs, "Found V4L2 camera");
        cameras.push(camera);
    }

    cameras
}

/// Build DeviceInfo from V4L2 device path and capability strings
///
/// Resolves symlinks to get the real device path.
pub fn build_device_info(v4l2_path: &str, card: &str, driver: &str, bus: &str) -> DeviceInfo {
    let real_path = std::fs::canonicalize(v4l2_path)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| v4l2_path.to_string());

    DeviceInfo {
        card: card.to_string(),
        driver: driver.to_string(),
        bus: bus.to_string(),
        path: v4l2_path.to_string(),
        real_path,
    }
}

/// Work out where a camera is mounted
pub fn detect_position(v4l2_path: &str, bus: &str) -> CameraPosition {
    if let Some(position) = read_device_tree_orientation(v4l2_path) {
        return position;
    }
    position_from_bus(bus)
}

/// USB (and other hot-pluggable bus) cameras are external
pub fn position_from_bus(bus: &str) -> CameraPosition {
    if bus.starts_with("usb-") {
        CameraPosition::External
    } else {
        CameraPosition::Unspecified
    }
}

/// Read the `orientation` property of the node's device tree entry
///
/// The property is a single big-endian u32.
fn read_device_tree_orientation(v4l2_path: &str) -> Option<CameraPosition> {
    let node_name = Path::new(v4l2_path).file_name()?.to_str()?;
    let property = format!(
        "/sys/class/video4linux/{}/device/of_node/orientation",
        node_name
    );
    let bytes = std::fs::read(&property).ok()?;
    let value = parse_orientation_property(&bytes)?;

    debug!(path = v4l2_path, value, "Read device tree orientation");
    Some(CameraPosition::from_orientation(value))
}

/// Decode a device tree u32 cell
pub fn parse_orientation_property(bytes: &[u8]) -> Option<u32> {
    let cell: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    Some(u32::from_be_bytes(cell))
}

/// Infer the sensor kind from the formats a node offers
pub fn classify_device_type(fourccs: &[String]) -> CameraDeviceType {
    let has_colour = fourccs
        .iter()
        .any(|f| !DEPTH_FOURCCS.contains(&f.as_str()) && !MONO_FOURCCS.contains(&f.as_str()));
    if has_colour {
        return CameraDeviceType::WideAngle;
    }

    if fourccs.iter().any(|f| DEPTH_FOURCCS.contains(&f.as_str())) {
        CameraDeviceType::Depth
    } else {
        CameraDeviceType::Infrared
    }
}

/// List formats the scanner can read, one entry per size and best framerate
pub fn enumerate_formats(device_path: &str) -> Vec<CameraFormat> {
    let device = match Device::with_path(device_path) {
        Ok(device) => device,
        Err(e) => {
            debug!(path = device_path, error = %e, "Cannot open device to query formats");
            return Vec::new();
        }
    };

    let mut formats = Vec::new();

    for desc in device.enum_formats().unwrap_or_default() {
        let Ok(fourcc) = desc.fourcc.str() else {
            continue;
        };
        if !READABLE_FOURCCS.contains(&fourcc) {
            continue;
        }

        for size in device.enum_framesizes(desc.fourcc).unwrap_or_default() {
            let (width, height) = match size.size {
                FrameSizeEnum::Discrete(discrete) => (discrete.width, discrete.height),
                // Stepwise devices accept anything in range; offer the largest
                FrameSizeEnum::Stepwise(stepwise) => (stepwise.max_width, stepwise.max_height),
            };

            formats.push(CameraFormat {
                width,
                height,
                framerate: best_framerate(&device, desc.fourcc, width, height),
                pixel_format: fourcc.to_string(),
            });
        }
    }

    formats
}

/// Highest discrete framerate for a size, if the driver reports one
fn best_framerate(device: &Device, fourcc: FourCC, width: u32, height: u32) -> Option<Framerate> {
    device
        .enum_frameintervals(fourcc, width, height)
        .unwrap_or_default()
        .iter()
        .filter_map(|interval| match &interval.interval {
            // Intervals are seconds per frame; invert for frames per second
            FrameIntervalEnum::Discrete(fraction) if fraction.numerator > 0 => {
                Some(Framerate::new(fraction.denominator, fraction.numerator))
            }
            _ => None,
        })
        .max_by(|a, b| a.as_f64().total_cmp(&b.as_f64()))
}
