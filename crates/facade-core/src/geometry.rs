//! Plane sizing from image aspect ratios and the camera frustum.

use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Long-axis cap for diagram planes, in scene units.
pub const DIAGRAM_MAX_SIZE: f32 = 2.0;

/// Depth at which the background plane is placed.
pub const BACKGROUND_DEPTH: f32 = -5.0;

/// Width and height of a plane mesh in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneSize {
    pub width: f32,
    pub height: f32,
}

impl PlaneSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

/// Replace zero, negative or non-finite dimensions with 1.
fn sanitize_dimension(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 { value } else { 1.0 }
}

/// Fit an image into a square of `max_size`, preserving its aspect ratio.
///
/// The longer side of the result equals `max_size`. Degenerate dimensions
/// fall back to 1, so a zero-height image yields a square plane.
pub fn fit_to_max_dimension(image_width: f32, image_height: f32, max_size: f32) -> PlaneSize {
    let aspect = sanitize_dimension(image_width) / sanitize_dimension(image_height);

    if aspect > 1.0 {
        PlaneSize::new(max_size, max_size / aspect)
    } else {
        PlaneSize::new(max_size * aspect, max_size)
    }
}

/// The inputs that determine a frustum fit.
///
/// Two equal keys always produce the same plane, so callers compare keys
/// to decide whether a refit is needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumKey {
    pub fov_degrees: f32,
    pub camera_z: f32,
    pub plane_z: f32,
    pub viewport: Size,
}

impl FrustumKey {
    /// Frustum height at the plane's distance from the camera.
    pub fn frustum_height(&self) -> f32 {
        let distance = (self.camera_z - self.plane_z).abs();
        2.0 * (self.fov_degrees.to_radians() / 2.0).tan() * distance
    }

    /// Viewport aspect ratio, with the height floored at one pixel.
    pub fn viewport_aspect(&self) -> f32 {
        (self.viewport.width / self.viewport.height.max(1.0)) as f32
    }

    /// Fit a plane of the given image aspect to this frustum.
    pub fn fit(&self, image_aspect: f32) -> PlaneSize {
        fit_to_frustum(
            self.fov_degrees,
            self.camera_z,
            self.plane_z,
            self.viewport.width as f32,
            self.viewport.height as f32,
            image_aspect,
        )
    }
}

/// Size a plane at `plane_z` so it spans the camera frustum along one axis.
///
/// If the image is wider than the frustum the plane takes the full frustum
/// width, otherwise the full frustum height. The image's own proportions
/// are never distorted.
pub fn fit_to_frustum(
    fov_degrees: f32,
    camera_z: f32,
    plane_z: f32,
    viewport_width: f32,
    viewport_height: f32,
    image_aspect: f32,
) -> PlaneSize {
    let distance = (camera_z - plane_z).abs();
    let frustum_height = 2.0 * (fov_degrees.to_radians() / 2.0).tan() * distance;
    let frustum_width = frustum_height * (viewport_width / viewport_height.max(1.0));
    let frustum_aspect = frustum_width / frustum_height;
    let image_aspect = sanitize_dimension(image_aspect);

    if image_aspect > frustum_aspect {
        PlaneSize::new(frustum_width, frustum_width / image_aspect)
    } else {
        PlaneSize::new(frustum_height * image_aspect, frustum_height)
    }
}
