//! Manipulation gizmo: screen-space handles, hit testing and drag math.

use crate::camera::PerspectiveCamera;
use crate::selection::TransformMode;
use crate::transform::{component, with_component, Axis, Transform};
use glam::Vec3;
use kurbo::{Point, Vec2};
use peniko::Color;

/// Length of a gizmo axis in scene units.
pub const GIZMO_AXIS_LENGTH: f32 = 1.0;
/// Hit tolerance in screen pixels.
pub const GIZMO_HIT_TOLERANCE: f64 = 8.0;
/// Half-size of the scale handle squares, in pixels.
pub const SCALE_HANDLE_HALF_SIZE: f64 = 4.0;
/// Smallest scale the gizmo will produce on an axis.
pub const MIN_GIZMO_SCALE: f32 = 0.01;

const RING_SEGMENTS: usize = 48;

/// Axis colour: X red, Y green, Z blue.
pub fn axis_color(axis: Axis) -> Color {
    match axis {
        Axis::X => Color::from_rgba8(230, 60, 60, 255),
        Axis::Y => Color::from_rgba8(60, 200, 80, 255),
        Axis::Z => Color::from_rgba8(60, 110, 240, 255),
    }
}

/// A screen-space line segment of the gizmo overlay.
#[derive(Debug, Clone, Copy)]
pub struct GizmoLine {
    pub start: Point,
    pub end: Point,
    pub axis: Axis,
    pub color: Color,
}

/// Distance from `p` to the segment `a`-`b`.
fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq < 1e-9 {
        return (p - a).hypot();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).hypot()
}

/// Projected origin and axis tip of the gizmo.
fn project_axis(transform: &Transform, axis: Axis, camera: &PerspectiveCamera) -> Option<(Point, Point)> {
    let origin = transform.position;
    let tip = origin + transform.local_axis(axis) * GIZMO_AXIS_LENGTH;
    Some((camera.world_to_screen(origin)?, camera.world_to_screen(tip)?))
}

/// Ring around a local axis, as projected segments.
fn project_ring(transform: &Transform, axis: Axis, camera: &PerspectiveCamera) -> Vec<(Point, Point)> {
    let (u_axis, v_axis) = match axis {
        Axis::X => (Axis::Y, Axis::Z),
        Axis::Y => (Axis::Z, Axis::X),
        Axis::Z => (Axis::X, Axis::Y),
    };
    let u = transform.local_axis(u_axis) * GIZMO_AXIS_LENGTH;
    let v = transform.local_axis(v_axis) * GIZMO_AXIS_LENGTH;
    let point_at = |i: usize| {
        let angle = i as f32 / RING_SEGMENTS as f32 * std::f32::consts::TAU;
        camera.world_to_screen(transform.position + u * angle.cos() + v * angle.sin())
    };

    (0..RING_SEGMENTS)
        .filter_map(|i| Some((point_at(i)?, point_at(i + 1)?)))
        .collect()
}

/// Overlay lines for a gizmo in the given mode.
pub fn gizmo_lines(transform: &Transform, mode: TransformMode, camera: &PerspectiveCamera) -> Vec<GizmoLine> {
    let mut lines = Vec::new();
    for axis in Axis::ALL {
        let color = axis_color(axis);
        let mut push = |start: Point, end: Point| lines.push(GizmoLine { start, end, axis, color });

        match mode {
            TransformMode::Translate => {
                if let Some((origin, tip)) = project_axis(transform, axis, camera) {
                    push(origin, tip);
                }
            }
            TransformMode::Scale => {
                if let Some((origin, tip)) = project_axis(transform, axis, camera) {
                    push(origin, tip);
                    let h = SCALE_HANDLE_HALF_SIZE;
                    let corners = [
                        tip + Vec2::new(-h, -h),
                        tip + Vec2::new(h, -h),
                        tip + Vec2::new(h, h),
                        tip + Vec2::new(-h, h),
                    ];
                    for i in 0..4 {
                        push(corners[i], corners[(i + 1) % 4]);
                    }
                }
            }
            TransformMode::Rotate => {
                for (start, end) in project_ring(transform, axis, camera) {
                    push(start, end);
                }
            }
        }
    }
    lines
}

/// Find the gizmo axis under a screen point.
pub fn hit_test(
    transform: &Transform,
    mode: TransformMode,
    camera: &PerspectiveCamera,
    point: Point,
) -> Option<Axis> {
    let mut best: Option<(Axis, f64)> = None;
    for axis in Axis::ALL {
        let distance = match mode {
            TransformMode::Translate | TransformMode::Scale => project_axis(transform, axis, camera)
                .map(|(origin, tip)| distance_to_segment(point, origin, tip)),
            TransformMode::Rotate => project_ring(transform, axis, camera)
                .into_iter()
                .map(|(a, b)| distance_to_segment(point, a, b))
                .reduce(f64::min),
        };
        if let Some(d) = distance.filter(|d| *d <= GIZMO_HIT_TOLERANCE) {
            if best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((axis, d));
            }
        }
    }
    best.map(|(axis, _)| axis)
}

/// An in-progress gizmo drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoDrag {
    pub axis: Axis,
    pub mode: TransformMode,
    pub start_pointer: Point,
    /// Transform when the drag began; every update is relative to it.
    pub start: Transform,
}

impl GizmoDrag {
    pub fn new(axis: Axis, mode: TransformMode, start_pointer: Point, start: Transform) -> Self {
        Self {
            axis,
            mode,
            start_pointer,
            start,
        }
    }

    /// Pointer travel along the projected axis, in axis lengths.
    fn along_axis(&self, pointer: Point, camera: &PerspectiveCamera) -> Option<f32> {
        let (origin, tip) = project_axis(&self.start, self.axis, camera)?;
        let axis_screen = tip - origin;
        let len_sq = axis_screen.hypot2();
        if len_sq < 1.0 {
            return None;
        }
        Some(((pointer - self.start_pointer).dot(axis_screen) / len_sq) as f32)
    }

    /// Transform for the current pointer position.
    pub fn update(&self, pointer: Point, camera: &PerspectiveCamera) -> Transform {
        let mut next = self.start;
        match self.mode {
            TransformMode::Translate => {
                if let Some(t) = self.along_axis(pointer, camera) {
                    let direction = self.start.local_axis(self.axis);
                    next.position = self.start.position + direction * (t * GIZMO_AXIS_LENGTH);
                }
            }
            TransformMode::Scale => {
                if let Some(t) = self.along_axis(pointer, camera) {
                    let current = component(self.start.scale, self.axis);
                    let scaled = (current * (1.0 + t)).max(MIN_GIZMO_SCALE);
                    next.scale = with_component(self.start.scale, self.axis, scaled);
                }
            }
            TransformMode::Rotate => {
                if let Some(center) = camera.world_to_screen(self.start.position) {
                    let a1 = (self.start_pointer - center).atan2();
                    let a2 = (pointer - center).atan2();
                    let mut delta = a2 - a1;
                    while delta > std::f64::consts::PI {
                        delta -= std::f64::consts::TAU;
                    }
                    while delta < -std::f64::consts::PI {
                        delta += std::f64::consts::TAU;
                    }
                    // Screen Y points down, so a visually counter-clockwise drag
                    // has a negative screen angle. Flip again when the axis
                    // faces away from the camera.
                    let toward_camera = self.start.local_axis(self.axis).dot(camera.position - self.start.position);
                    let sign = if toward_camera >= 0.0 { -1.0 } else { 1.0 };
                    let current = component(self.start.rotation, self.axis);
                    next.rotation = with_component(self.start.rotation, self.axis, current + sign * delta as f32);
                }
            }
        }
        next
    }
}

/// World-space tip of an axis handle, used by tests and overlays.
pub fn axis_tip(transform: &Transform, axis: Axis) -> Vec3 {
    transform.position + transform.local_axis(axis) * GIZMO_AXIS_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new().with_viewport(800.0, 600.0)
    }

    #[test]
    fn test_translate_lines() {
        let lines = gizmo_lines(&Transform::IDENTITY, TransformMode::Translate, &camera());
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().any(|l| l.axis == Axis::X && l.end.x > l.start.x));
    }

    #[test]
    fn test_scale_and_rotate_lines() {
        let scale = gizmo_lines(&Transform::IDENTITY, TransformMode::Scale, &camera());
        assert_eq!(scale.len(), 3 * 5);
        let rotate = gizmo_lines(&Transform::IDENTITY, TransformMode::Rotate, &camera());
        assert_eq!(rotate.len(), 3 * RING_SEGMENTS);
    }

    #[test]
    fn test_hit_test_translate_axis() {
        let camera = camera();
        let tip = camera.world_to_screen(axis_tip(&Transform::IDENTITY, Axis::X)).unwrap();
        let origin = camera.world_to_screen(Vec3::ZERO).unwrap();
        let mid = origin.midpoint(tip);
        assert_eq!(hit_test(&Transform::IDENTITY, TransformMode::Translate, &camera, mid), Some(Axis::X));
        assert_eq!(
            hit_test(&Transform::IDENTITY, TransformMode::Translate, &camera, Point::new(5.0, 5.0)),
            None
        );
    }

    #[test]
    fn test_hit_test_rotate_ring() {
        let camera = camera();
        // The Z ring faces the camera; the X and Y rings are seen edge-on
        // as lines through the center, so a diagonal point is Z only.
        let s = std::f32::consts::FRAC_1_SQRT_2;
        let diagonal = camera.world_to_screen(Vec3::new(s, s, 0.0)).unwrap();
        assert_eq!(hit_test(&Transform::IDENTITY, TransformMode::Rotate, &camera, diagonal), Some(Axis::Z));
    }

    #[test]
    fn test_translate_drag_follows_axis() {
        let camera = camera();
        let origin = camera.world_to_screen(Vec3::ZERO).unwrap();
        let tip = camera.world_to_screen(axis_tip(&Transform::IDENTITY, Axis::X)).unwrap();
        let drag = GizmoDrag::new(Axis::X, TransformMode::Translate, origin, Transform::IDENTITY);

        let moved = drag.update(tip, &camera);
        assert!((moved.position - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-4);

        // Motion perpendicular to the axis does nothing.
        let moved = drag.update(origin + Vec2::new(0.0, 50.0), &camera);
        assert!(moved.position.length() < 1e-4);
    }

    #[test]
    fn test_scale_drag_is_single_axis() {
        let camera = camera();
        let origin = camera.world_to_screen(Vec3::ZERO).unwrap();
        let tip = camera.world_to_screen(axis_tip(&Transform::IDENTITY, Axis::Y)).unwrap();
        let drag = GizmoDrag::new(Axis::Y, TransformMode::Scale, origin, Transform::IDENTITY);

        let scaled = drag.update(tip, &camera);
        assert!((scaled.scale - Vec3::new(1.0, 2.0, 1.0)).length() < 1e-4);

        let far = origin + (origin - tip) * 5.0;
        assert!((drag.update(far, &camera).scale.y - MIN_GIZMO_SCALE).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_drag_counter_clockwise_is_positive_z() {
        let camera = camera();
        let center = camera.world_to_screen(Vec3::ZERO).unwrap();
        let right = center + Vec2::new(100.0, 0.0);
        let up = center + Vec2::new(0.0, -100.0);
        let drag = GizmoDrag::new(Axis::Z, TransformMode::Rotate, right, Transform::IDENTITY);

        let rotated = drag.update(up, &camera);
        assert!((rotated.rotation.z - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
        assert_eq!(rotated.position, Vec3::ZERO);
    }

    #[test]
    fn test_rotate_drag_accumulates_past_pi() {
        let camera = camera();
        let center = camera.world_to_screen(Vec3::ZERO).unwrap();
        let start = Transform::IDENTITY.with_rotation(Vec3::new(0.0, 0.0, 3.0));
        let drag = GizmoDrag::new(
            Axis::Z,
            TransformMode::Rotate,
            center + Vec2::new(100.0, 0.0),
            start,
        );
        let rotated = drag.update(center + Vec2::new(0.0, -100.0), &camera);
        assert!(rotated.rotation.z > std::f32::consts::PI);
    }

    #[test]
    fn test_distance_to_segment() {
        let d = distance_to_segment(Point::new(5.0, 3.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((d - 3.0).abs() < 1e-9);
        let d = distance_to_segment(Point::new(-4.0, 3.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-9);
    }
}
