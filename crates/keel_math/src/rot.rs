//! 2D rotation stored as a sine/cosine pair

use crate::vector::Vec2;
use core::ops::Mul;

/// 2D rotation. Keeping sine and cosine avoids re-evaluating
/// trigonometry for every transformed point.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Rot2 {
    /// Sine of the angle
    pub s: f32,
    /// Cosine of the angle
    pub c: f32,
}

impl Rot2 {
    pub const IDENTITY: Self = Self { s: 0.0, c: 1.0 };

    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self { s, c }
    }

    #[inline]
    pub fn angle(self) -> f32 {
        self.s.atan2(self.c)
    }

    #[inline]
    pub fn inverse(self) -> Self {
        Self { s: -self.s, c: self.c }
    }

    /// Rotate a vector
    #[inline]
    pub fn rotate(self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Rotate a vector by the inverse rotation
    #[inline]
    pub fn inverse_rotate(self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }
}

impl Default for Rot2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// Composition: (a * b) rotates by b then a
impl Mul for Rot2 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self {
            s: self.s * rhs.c + self.c * rhs.s,
            c: self.c * rhs.c - self.s * rhs.s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts;

    #[test]
    fn test_rot2_identity() {
        let v = Vec2::new(3.0, -2.0);
        assert_eq!(Rot2::IDENTITY.rotate(v), v);
    }

    #[test]
    fn test_rot2_quarter_turn() {
        let q = Rot2::from_angle(consts::FRAC_PI_2);
        let v = q.rotate(Vec2::X);
        assert!((v - Vec2::Y).length() < 1e-6);
    }

    #[test]
    fn test_rot2_inverse_roundtrip() {
        let q = Rot2::from_angle(0.73);
        let v = Vec2::new(1.5, -4.0);
        let back = q.inverse_rotate(q.rotate(v));
        assert!((back - v).length() < 1e-6);
    }

    #[test]
    fn test_rot2_angle_roundtrip() {
        let a = 1.1;
        assert!((Rot2::from_angle(a).angle() - a).abs() < 1e-6);
    }
}
