// SPDX-License-Identifier: GPL-3.0-only

//! Scanner configuration
//!
//! Stored as JSON under the user's config directory. Every field has a
//! default, so partial files are fine and a missing file means defaults.

use crate::app::frame_processor::SupportedCodeTypes;
use crate::app::preview::VideoGravity;
use crate::backends::camera::{CameraBackendType, CameraDeviceType, CameraPosition};
use crate::constants::{APP_ID, DEFAULT_OPENABLE_SCHEMES, capture, timing};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Config file name inside the app's config directory
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera backend (V4L2 or a still image)
    pub backend: CameraBackendType,
    /// Required camera position, `None` accepts any camera
    pub camera_position: Option<CameraPosition>,
    /// Accepted physical camera types
    pub device_types: Vec<CameraDeviceType>,
    /// Camera position per device path, for cameras that do not report one
    pub position_overrides: HashMap<String, CameraPosition>,
    /// Symbol types that are highlighted and offered for opening
    pub supported_types: SupportedCodeTypes,
    pub preferred_width: u32,
    pub preferred_height: u32,
    /// Minimum time between recognized frames
    pub detection_interval_ms: u64,
    /// Frames are downscaled to this before recognition
    pub max_detection_dimension: u32,
    /// How the preview fills the screen
    pub video_gravity: VideoGravity,
    /// Mirror the preview horizontally, `None` mirrors front cameras only
    pub mirror_preview: Option<bool>,
    /// URL schemes that may be opened after confirmation
    pub openable_schemes: Vec<String>,
    /// Image replayed by the still image backend
    pub still_image_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            camera_position: Some(CameraPosition::Back),
            device_types: vec![CameraDeviceType::WideAngle],
            position_overrides: HashMap::new(),
            supported_types: SupportedCodeTypes::default(),
            preferred_width: capture::PREFERRED_WIDTH,
            preferred_height: capture::PREFERRED_HEIGHT,
            detection_interval_ms: timing::DEFAULT_DETECTION_INTERVAL.as_millis() as u64,
            max_detection_dimension: capture::MAX_DETECTION_DIMENSION,
            video_gravity: VideoGravity::default(),
            mirror_preview: None,
            openable_schemes: DEFAULT_OPENABLE_SCHEMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            still_image_path: None,
        }
    }
}

impl Config {
    /// Default config location (`$XDG_CONFIG_HOME/qr-scanner/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_ID).join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => {
                warn!("No config directory, using default configuration");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing, unreadable or invalid file yields defaults
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring config file");
                Self::default()
            }
        }
    }

    /// Load from `path`, reporting any failure
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(self.detection_interval_ms)
    }

    /// Whether the preview should be mirrored for a camera at `position`
    pub fn should_mirror(&self, position: CameraPosition) -> bool {
        self.mirror_preview
            .unwrap_or_else(|| position.is_mirrored())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: Config = serde_json::from_str(r#"{"preferred_width": 1280}"#).unwrap();
        assert_eq!(config.preferred_width, 1280);
        assert_eq!(config.preferred_height, 480);
        assert_eq!(config.camera_position, Some(CameraPosition::Back));
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let config: Config = serde_json::from_str(r#"{"app_theme": "Dark"}"#).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_null_position_means_any() {
        let config: Config = serde_json::from_str(r#"{"camera_position": null}"#).unwrap();
        assert_eq!(config.camera_position, None);
    }

    #[test]
    fn test_mirroring() {
        let mut config = Config::default();
        assert!(config.should_mirror(CameraPosition::Front));
        assert!(!config.should_mirror(CameraPosition::Back));
        config.mirror_preview = Some(true);
        assert!(config.should_mirror(CameraPosition::Back));
    }

    #[test]
    fn test_detection_interval() {
        assert_eq!(
            Config::default().detection_interval(),
            Duration::from_millis(200)
        );
    }
}
