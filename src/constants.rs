// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Application identifier used for config, cache and log paths
pub const APP_ID: &str = "qr-scanner";

/// Title shown in the top bar
pub const APP_TITLE: &str = "QR Code Reader";

/// Status label text shown when a frame carries no symbol
pub const NO_CODE_DETECTED: &str = "No QR code is detected";

/// Confirmation prompt strings
pub mod prompt {
    /// Prompt title
    pub const TITLE: &str = "Open App";

    /// Confirm action label
    pub const CONFIRM: &str = "Confirm";

    /// Cancel action label
    pub const CANCEL: &str = "Cancel";

    /// Prompt body naming the target URL
    pub fn message(text: &str) -> String {
        format!("You're going to open {}", text)
    }
}

/// URL schemes the system opener will accept by default
pub const DEFAULT_OPENABLE_SCHEMES: &[&str] =
    &["http", "https", "mailto", "tel", "sms", "geo", "ftp"];

/// Highlight rectangle look
pub mod highlight {
    /// Border width in the reference look (points)
    pub const BORDER_WIDTH: u16 = 5;

    /// Border widths at or above this are drawn with thick line glyphs
    pub const THICK_BORDER_THRESHOLD: u16 = 3;
}

/// Capture and recognition timing
pub mod timing {
    use super::Duration;

    /// Default interval between frames handed to the recognizer
    pub const DEFAULT_DETECTION_INTERVAL: Duration = Duration::from_millis(200);

    /// Frame rate for still image replay (~30fps)
    pub const STILL_IMAGE_FRAME_INTERVAL: Duration = Duration::from_millis(33);

    /// Back-off after a failed V4L2 dequeue
    pub const CAPTURE_RETRY_DELAY: Duration = Duration::from_millis(10);

    /// Terminal input poll timeout (one redraw per poll)
    pub const UI_POLL_INTERVAL: Duration = Duration::from_millis(16);
}

/// Channel capacities
///
/// Frames are pushed with `try_send`; a full channel drops the frame.
pub mod channels {
    /// Preview frames waiting for the screen
    pub const PREVIEW_CAPACITY: usize = 2;

    /// Frames waiting for the recognizer
    pub const RECOGNITION_CAPACITY: usize = 1;

    /// Detection lists waiting for the screen
    pub const METADATA_CAPACITY: usize = 4;
}

/// Capture format defaults
pub mod capture {
    /// Preferred capture width (recognition gains nothing from more)
    pub const PREFERRED_WIDTH: u32 = 640;

    /// Preferred capture height
    pub const PREFERRED_HEIGHT: u32 = 480;

    /// Frames are downscaled to this before recognition
    pub const MAX_DETECTION_DIMENSION: u32 = 640;

    /// Number of mmap buffers requested from V4L2
    pub const V4L2_BUFFER_COUNT: u32 = 4;
}

/// File format helpers
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}
