//! 2D rigid transform (rotation + translation)

use crate::rot::Rot2;
use crate::vector::Vec2;

/// Rigid transform mapping local coordinates to world coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Transform2 {
    /// Translation
    pub p: Vec2,
    /// Rotation
    pub q: Rot2,
}

impl Transform2 {
    pub const IDENTITY: Self = Self { p: Vec2::ZERO, q: Rot2::IDENTITY };

    #[inline]
    pub const fn new(p: Vec2, q: Rot2) -> Self {
        Self { p, q }
    }

    #[inline]
    pub fn from_position_angle(p: Vec2, angle: f32) -> Self {
        Self { p, q: Rot2::from_angle(angle) }
    }

    /// Map a local point to world space
    #[inline]
    pub fn transform_point(self, point: Vec2) -> Vec2 {
        self.p + self.q.rotate(point)
    }

    /// Map a world point to local space
    #[inline]
    pub fn inverse_transform_point(self, point: Vec2) -> Vec2 {
        self.q.inverse_rotate(point - self.p)
    }

    /// Map a local direction to world space (rotation only)
    #[inline]
    pub fn transform_vector(self, v: Vec2) -> Vec2 {
        self.q.rotate(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts;

    #[test]
    fn test_transform_point_roundtrip() {
        let xf = Transform2::from_position_angle(Vec2::new(2.0, -1.0), 0.4);
        let p = Vec2::new(0.5, 0.25);
        let back = xf.inverse_transform_point(xf.transform_point(p));
        assert!((back - p).length() < 1e-6);
    }

    #[test]
    fn test_transform_translation_only() {
        let xf = Transform2::from_position_angle(Vec2::new(1.0, 2.0), 0.0);
        assert_eq!(xf.transform_point(Vec2::ZERO), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_transform_rotation() {
        let xf = Transform2::from_position_angle(Vec2::ZERO, consts::FRAC_PI_2);
        let p = xf.transform_point(Vec2::X);
        assert!((p - Vec2::Y).length() < 1e-6);
    }
}
