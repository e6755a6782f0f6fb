//! Position / rotation / scale of a diagram plane.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Rotation slider bounds in radians. Stored rotations are not clamped.
pub const ROTATION_SLIDER_MIN: f32 = -PI;
pub const ROTATION_SLIDER_MAX: f32 = PI;
pub const ROTATION_SLIDER_STEP: f32 = 0.1;

/// Uniform scale slider bounds.
pub const SCALE_SLIDER_MIN: f32 = 0.1;
pub const SCALE_SLIDER_MAX: f32 = 5.0;
pub const SCALE_SLIDER_STEP: f32 = 0.1;

/// Step of the numeric position fields.
pub const POSITION_FIELD_STEP: f32 = 0.1;

/// One of the three scene axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Unit vector along this axis.
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        }
    }
}

/// Read one component of a vector.
pub fn component(v: Vec3, axis: Axis) -> f32 {
    match axis {
        Axis::X => v.x,
        Axis::Y => v.y,
        Axis::Z => v.z,
    }
}

/// Return `v` with one component replaced.
pub fn with_component(mut v: Vec3, axis: Axis, value: f32) -> Vec3 {
    match axis {
        Axis::X => v.x = value,
        Axis::Y => v.y = value,
        Axis::Z => v.z = value,
    }
    v
}

/// Placement of a plane in the scene.
///
/// Rotation is Euler angles in radians, applied in XYZ order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Origin, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Rotation matrix for the Euler angles (X, then Y, then Z).
    pub fn rotation_matrix(&self) -> Mat4 {
        Mat4::from_rotation_x(self.rotation.x)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_z(self.rotation.z)
    }

    /// Local-to-world matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * self.rotation_matrix() * Mat4::from_scale(self.scale)
    }

    /// Direction of a local axis in world space (unit length, unscaled).
    pub fn local_axis(&self, axis: Axis) -> Vec3 {
        self.rotation_matrix().transform_vector3(axis.unit()).normalize_or_zero()
    }

    /// True when every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }

    /// Rotation around `axis` in whole degrees, as shown next to the sliders.
    pub fn rotation_degrees(&self, axis: Axis) -> i32 {
        component(self.rotation, axis).to_degrees().round() as i32
    }

    /// Rotation around `axis` clamped to the slider range, for display.
    pub fn rotation_slider_value(&self, axis: Axis) -> f32 {
        component(self.rotation, axis).clamp(ROTATION_SLIDER_MIN, ROTATION_SLIDER_MAX)
    }

    /// Position component formatted as in the numeric fields.
    pub fn position_field(&self, axis: Axis) -> String {
        format!("{:.2}", component(self.position, axis))
    }
}

/// A single edit from the numeric fields or sliders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransformEdit {
    /// Set one position component.
    Position(Axis, f32),
    /// Set one rotation component, radians.
    Rotation(Axis, f32),
    /// Set all three scale components to the same value.
    UniformScale(f32),
}

impl TransformEdit {
    /// Build a position edit from the raw text of a numeric field.
    pub fn position_from_text(axis: Axis, text: &str) -> Self {
        Self::Position(axis, parse_numeric_field(text))
    }

    /// Produce a new transform with only the edited component(s) changed.
    ///
    /// A non-finite value leaves the transform untouched.
    pub fn apply(self, current: &Transform) -> Transform {
        let mut next = *current;
        match self {
            TransformEdit::Position(axis, value) if value.is_finite() => {
                next.position = with_component(current.position, axis, value);
            }
            TransformEdit::Rotation(axis, value) if value.is_finite() => {
                next.rotation = with_component(current.rotation, axis, value);
            }
            TransformEdit::UniformScale(value) if value.is_finite() => {
                next.scale = Vec3::splat(value);
            }
            _ => {
                log::warn!("Ignoring non-finite transform edit: {:?}", self);
            }
        }
        next
    }
}

/// Parse a numeric input field. Anything that is not a finite number reads as 0.
pub fn parse_numeric_field(text: &str) -> f32 {
    match text.trim().parse::<f32>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_matrix() {
        assert_eq!(Transform::IDENTITY.matrix(), Mat4::IDENTITY);
        assert_eq!(Transform::default(), Transform::IDENTITY);
    }

    #[test]
    fn test_matrix_applies_scale_then_rotation_then_translation() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0))
            .with_rotation(Vec3::new(0.0, 0.0, PI / 2.0))
            .with_scale(Vec3::splat(2.0));
        let p = t.matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 4.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_local_axis_follows_rotation() {
        let t = Transform::IDENTITY.with_rotation(Vec3::new(0.0, PI / 2.0, 0.0));
        let x = t.local_axis(Axis::X);
        assert!((x - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_position_edit_merges_single_axis() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let next = TransformEdit::Position(Axis::Y, 9.0).apply(&t);
        assert_eq!(next.position, Vec3::new(1.0, 9.0, 3.0));
        assert_eq!(next.rotation, t.rotation);
        assert_eq!(next.scale, t.scale);
    }

    #[test]
    fn test_rotation_edit_merges_single_axis() {
        let t = Transform::IDENTITY.with_rotation(Vec3::new(0.1, 0.2, 0.3));
        let next = TransformEdit::Rotation(Axis::Z, -1.0).apply(&t);
        assert_eq!(next.rotation, Vec3::new(0.1, 0.2, -1.0));
    }

    #[test]
    fn test_uniform_scale_sets_all_axes() {
        let t = Transform::IDENTITY.with_scale(Vec3::new(1.0, 2.0, 3.0));
        let next = TransformEdit::UniformScale(1.5).apply(&t);
        assert_eq!(next.scale, Vec3::splat(1.5));
    }

    #[test]
    fn test_non_finite_edit_keeps_prior_value() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let next = TransformEdit::Position(Axis::X, f32::NAN).apply(&t);
        assert_eq!(next, t);
        let next = TransformEdit::UniformScale(f32::INFINITY).apply(&t);
        assert_eq!(next, t);
        assert!(next.is_finite());
    }

    #[test]
    fn test_parse_numeric_field() {
        assert_eq!(parse_numeric_field("1.25"), 1.25);
        assert_eq!(parse_numeric_field("  -3 "), -3.0);
        assert_eq!(parse_numeric_field(""), 0.0);
        assert_eq!(parse_numeric_field("abc"), 0.0);
        assert_eq!(parse_numeric_field("NaN"), 0.0);
        assert_eq!(parse_numeric_field("inf"), 0.0);
    }

    #[test]
    fn test_position_from_text_never_nan() {
        let t = Transform::from_position(Vec3::new(5.0, 5.0, 5.0));
        let next = TransformEdit::position_from_text(Axis::Z, "oops").apply(&t);
        assert_eq!(next.position, Vec3::new(5.0, 5.0, 0.0));
    }

    #[test]
    fn test_rotation_storage_is_unbounded() {
        let t = TransformEdit::Rotation(Axis::X, 4.0 * PI).apply(&Transform::IDENTITY);
        assert!((t.rotation.x - 4.0 * PI).abs() < 1e-6);
        assert!((t.rotation_slider_value(Axis::X) - PI).abs() < 1e-6);
        assert_eq!(t.rotation_degrees(Axis::X), 720);
    }

    #[test]
    fn test_position_field_format() {
        let t = Transform::from_position(Vec3::new(1.0, -0.125, 3.456));
        assert_eq!(t.position_field(Axis::X), "1.00");
        assert_eq!(t.position_field(Axis::Z), "3.46");
    }

    #[test]
    fn test_serde_json() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let json = serde_json::to_string(&t).unwrap();
        let back: Transform = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
