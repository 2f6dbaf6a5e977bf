//! Local node transforms
//!
//! Every scene node carries a translation/rotation/scale triple relative to
//! its parent. Both shader paths consume the inverse of the composed matrix,
//! and the neutrality checks here are exact comparisons: lowering only elides
//! work when a component is bit-for-bit neutral.

use glam::{Mat4, Quat, Vec3};

/// Translation, rotation and scale of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl LocalTransform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Pure translation.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// True when every component is exactly neutral.
    pub fn is_identity(&self) -> bool {
        self.position == Vec3::ZERO && self.rotation == Quat::IDENTITY && self.scale == Vec3::ONE
    }

    pub fn has_translation(&self) -> bool {
        self.position != Vec3::ZERO
    }

    pub fn has_rotation(&self) -> bool {
        self.rotation != Quat::IDENTITY
    }

    pub fn has_scale(&self) -> bool {
        self.scale != Vec3::ONE
    }

    /// Composed local matrix, translation * rotation * scale.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Inverse of [`matrix`](Self::matrix), the form the shader paths upload.
    pub fn inverse_matrix(&self) -> Mat4 {
        self.matrix().inverse()
    }

    /// Same transform with scale dropped back to one.
    ///
    /// Cube and cylinder shapes absorb scale into their parameter vectors, so
    /// their local-space rewrite uses this reduced transform.
    pub fn without_scale(&self) -> Self {
        Self {
            scale: Vec3::ONE,
            ..*self
        }
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
