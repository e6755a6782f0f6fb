//! Perspective camera looking down the negative Z axis.

use crate::geometry::FrustumKey;
use glam::{Mat4, Vec3, Vec4};
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Default camera distance from the origin along +Z.
pub const DEFAULT_CAMERA_Z: f32 = 5.0;
/// Default vertical field of view in degrees.
pub const DEFAULT_FOV_DEGREES: f32 = 60.0;

/// A ray in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Camera manages the view and projection transforms for the scene.
///
/// Rotation is fixed: the camera always looks along -Z. Panning moves it
/// in its own XY plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerspectiveCamera {
    /// World-space position.
    pub position: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Distance to the point panning is measured at.
    pub target_distance: f32,
    /// Viewport size in physical pixels.
    pub viewport: Size,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, DEFAULT_CAMERA_Z),
            fov_degrees: DEFAULT_FOV_DEGREES,
            near: 0.1,
            far: 1000.0,
            target_distance: DEFAULT_CAMERA_Z,
            viewport: Size::new(1280.0, 800.0),
        }
    }
}

impl PerspectiveCamera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = Size::new(width, height);
        self
    }

    /// Viewport aspect ratio, height floored at one pixel.
    pub fn aspect(&self) -> f32 {
        (self.viewport.width / self.viewport.height.max(1.0)) as f32
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(-self.position)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_degrees.to_radians(), self.aspect(), self.near, self.far)
    }

    /// World to clip space.
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a world point into clip space.
    pub fn to_clip(&self, world: Vec3) -> Vec4 {
        self.view_projection() * world.extend(1.0)
    }

    /// Convert a world point to screen pixels. `None` behind the camera.
    pub fn world_to_screen(&self, world: Vec3) -> Option<Point> {
        let clip = self.to_clip(world);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Point::new(
            (ndc.x as f64 + 1.0) * 0.5 * self.viewport.width,
            (1.0 - ndc.y as f64) * 0.5 * self.viewport.height,
        ))
    }

    /// Ray from the camera through a screen pixel.
    pub fn screen_ray(&self, screen: Point) -> Ray {
        let width = self.viewport.width.max(1.0);
        let height = self.viewport.height.max(1.0);
        let ndc_x = (2.0 * screen.x / width - 1.0) as f32;
        let ndc_y = (1.0 - 2.0 * screen.y / height) as f32;
        let half_height = (self.fov_degrees.to_radians() / 2.0).tan();
        let direction = Vec3::new(ndc_x * half_height * self.aspect(), ndc_y * half_height, -1.0);
        Ray {
            origin: self.position,
            direction: direction.normalize(),
        }
    }

    /// World units covered by one screen pixel at the pan target.
    pub fn world_per_pixel(&self) -> f32 {
        let half_height = (self.fov_degrees.to_radians() / 2.0).tan();
        2.0 * self.target_distance * half_height / self.viewport.height.max(1.0) as f32
    }

    /// Pan the camera by a delta in screen coordinates.
    ///
    /// Content follows the pointer: dragging right moves the camera left.
    pub fn pan(&mut self, delta: Vec2) {
        let scale = self.world_per_pixel();
        self.position.x -= delta.x as f32 * scale;
        self.position.y += delta.y as f32 * scale;
    }

    /// Reset camera to default position, keeping viewport and fov.
    pub fn reset(&mut self) {
        self.position = Vec3::new(0.0, 0.0, DEFAULT_CAMERA_Z);
    }

    /// Frustum fit inputs for a plane at `plane_z`.
    pub fn frustum_key(&self, plane_z: f32) -> FrustumKey {
        FrustumKey {
            fov_degrees: self.fov_degrees,
            camera_z: self.position.z,
            plane_z,
            viewport: self.viewport,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new().with_viewport(800.0, 600.0)
    }

    #[test]
    fn test_default_camera() {
        let camera = PerspectiveCamera::new();
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
        assert!((camera.fov_degrees - 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_origin_projects_to_center() {
        let camera = camera();
        let p = camera.world_to_screen(Vec3::ZERO).unwrap();
        assert!((p.x - 400.0).abs() < 1e-3);
        assert!((p.y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_point_behind_camera() {
        let camera = camera();
        assert!(camera.world_to_screen(Vec3::new(0.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn test_up_is_up_on_screen() {
        let camera = camera();
        let p = camera.world_to_screen(Vec3::new(0.0, 1.0, 0.0)).unwrap();
        assert!(p.y < 300.0);
    }

    #[test]
    fn test_ray_roundtrip() {
        let camera = camera();
        let world = Vec3::new(0.7, -0.4, -1.0);
        let screen = camera.world_to_screen(world).unwrap();
        let ray = camera.screen_ray(screen);
        let t = (world - ray.origin).length();
        assert!((ray.at(t) - world).length() < 1e-3);
    }

    #[test]
    fn test_pan_moves_content_with_pointer() {
        let mut camera = camera();
        let before = camera.world_to_screen(Vec3::ZERO).unwrap();
        camera.pan(Vec2::new(40.0, -20.0));
        let after = camera.world_to_screen(Vec3::ZERO).unwrap();
        assert!((after.x - before.x - 40.0).abs() < 1e-2);
        assert!((after.y - before.y + 20.0).abs() < 1e-2);

        camera.reset();
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_frustum_key() {
        let camera = camera();
        let key = camera.frustum_key(-5.0);
        assert!((key.frustum_height() - 2.0 * (30.0_f32).to_radians().tan() * 10.0).abs() < 1e-4);
        assert_eq!(key.viewport, Size::new(800.0, 600.0));
    }
}
