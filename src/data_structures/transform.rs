//! Local transforms applied to engine entities.

use cgmath::{One, Rotation3};

/// Position, rotation (as quaternion) and scale of an entity relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Transform {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn uniform(scale: f32) -> Self {
        Self {
            scale: cgmath::Vector3::new(scale, scale, scale),
            ..Self::new()
        }
    }

    pub fn at(mut self, position: cgmath::Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn rotated_x(mut self, angle: impl Into<cgmath::Rad<f32>>) -> Self {
        self.rotation = cgmath::Quaternion::from_angle_x(angle.into()) * self.rotation;
        self
    }

    /// `Some(s)` if all three axes share the scale `s`.
    pub fn uniform_scale(&self) -> Option<f32> {
        let s = self.scale;
        (s.x == s.y && s.y == s.z).then_some(s.x)
    }
}

impl From<cgmath::Vector3<f32>> for Transform {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Self::new().at(position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
