// SPDX-License-Identifier: MPL-2.0

//! Error types for the scanner

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera and capture session errors
    Camera(CameraError),
    /// Configuration errors
    Config(String),
    /// Filesystem errors
    Storage(String),
}

/// Capture session errors
///
/// Every variant is terminal for the screen that hit it: there is no retry
/// path, the user has to re-open the scanner.
#[derive(Debug, Clone)]
pub enum CameraError {
    /// No camera matched the requested device types and position
    NoCameraFound,
    /// The device was found but could not be bound as a session input
    BindingFailed(String),
    /// Backend error (e.g. V4L2 ioctl failure)
    BackendError(String),
    /// Input or output was added twice, or the session is missing one
    SessionConfiguration(String),
    /// `start_running` was called on a running session
    AlreadyRunning,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoCameraFound => write!(f, "Failed to get device"),
            CameraError::BindingFailed(msg) => write!(f, "Failed to bind device: {}", msg),
            CameraError::BackendError(msg) => write!(f, "Backend error: {}", msg),
            CameraError::SessionConfiguration(msg) => {
                write!(f, "Session configuration error: {}", msg)
            }
            CameraError::AlreadyRunning => write!(f, "Capture session is already running"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<crate::backends::camera::BackendError> for CameraError {
    fn from(err: crate::backends::camera::BackendError) -> Self {
        CameraError::BackendError(err.to_string())
    }
}

impl From<crate::backends::camera::BackendError> for AppError {
    fn from(err: crate::backends::camera::BackendError) -> Self {
        AppError::Camera(err.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
