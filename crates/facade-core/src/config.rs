//! Scene tuning parameters.

use crate::camera::{DEFAULT_CAMERA_Z, DEFAULT_FOV_DEGREES};
use crate::geometry::{BACKGROUND_DEPTH, DIAGRAM_MAX_SIZE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default name of the exported PNG.
pub const EXPORT_FILENAME: &str = "wall-design-3d.png";

/// Default wait between hiding the gizmo and reading the frame.
pub const DEFAULT_CAPTURE_DELAY_MS: u64 = 100;

/// Scene configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub camera_z: f32,
    pub background_depth: f32,
    /// Long-axis cap for diagram planes.
    pub diagram_max_size: f32,
    pub capture_delay_ms: u64,
    pub export_filename: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            fov_degrees: DEFAULT_FOV_DEGREES,
            camera_z: DEFAULT_CAMERA_Z,
            background_depth: BACKGROUND_DEPTH,
            diagram_max_size: DIAGRAM_MAX_SIZE,
            capture_delay_ms: DEFAULT_CAPTURE_DELAY_MS,
            export_filename: EXPORT_FILENAME.to_string(),
        }
    }
}

impl SceneConfig {
    pub fn capture_delay(&self) -> Duration {
        Duration::from_millis(self.capture_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SceneConfig::default();
        assert_eq!(config.fov_degrees, 60.0);
        assert_eq!(config.camera_z, 5.0);
        assert_eq!(config.background_depth, -5.0);
        assert_eq!(config.capture_delay(), Duration::from_millis(100));
        assert_eq!(config.export_filename, "wall-design-3d.png");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: SceneConfig = serde_json::from_str(r#"{"fov_degrees": 45.0}"#).unwrap();
        assert_eq!(config.fov_degrees, 45.0);
        assert_eq!(config.diagram_max_size, 2.0);
    }
}
