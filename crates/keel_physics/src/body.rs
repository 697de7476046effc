//! Rigid body types and state

use crate::error::{PhysicsError, Result};
use crate::shape::ShapeHandle;
use keel_math::{Transform2, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a body in the physics world
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
    pub(crate) world: u16,
}

impl fmt::Debug for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BodyHandle({}v{})", self.index, self.generation)
    }
}

/// Type of body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyType {
    /// Never moves, infinite mass
    Static,
    /// Moved by user-set velocity, infinite mass toward contacts
    Kinematic,
    /// Fully simulated
    #[default]
    Dynamic,
}

/// Description for creating a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyDesc {
    /// Type of body
    pub body_type: BodyType,
    /// Initial position of the body origin
    pub position: Vec2,
    /// Initial angle (radians)
    pub angle: f32,
    /// Initial linear velocity
    pub linear_velocity: Vec2,
    /// Initial angular velocity (radians per second)
    pub angular_velocity: f32,
    /// Linear damping (velocity decay per second)
    pub linear_damping: f32,
    /// Angular damping (spin decay per second)
    pub angular_damping: f32,
}

impl Default for BodyDesc {
    fn default() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }
}

impl BodyDesc {
    /// Create a static body description
    pub fn fixed() -> Self {
        Self {
            body_type: BodyType::Static,
            ..Default::default()
        }
    }

    /// Create a dynamic body description
    pub fn dynamic() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            ..Default::default()
        }
    }

    /// Create a kinematic body description
    pub fn kinematic() -> Self {
        Self {
            body_type: BodyType::Kinematic,
            ..Default::default()
        }
    }

    /// Set position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Vec2::new(x, y);
        self
    }

    /// Set angle (radians)
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    /// Set linear velocity
    pub fn with_linear_velocity(mut self, x: f32, y: f32) -> Self {
        self.linear_velocity = Vec2::new(x, y);
        self
    }

    /// Set angular velocity
    pub fn with_angular_velocity(mut self, omega: f32) -> Self {
        self.angular_velocity = omega;
        self
    }

    /// Set linear and angular damping
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.position.is_finite()
            || !self.angle.is_finite()
            || !self.linear_velocity.is_finite()
            || !self.angular_velocity.is_finite()
        {
            return Err(PhysicsError::InvalidGeometry(
                "non-finite body description".to_string(),
            ));
        }
        if !self.linear_damping.is_finite()
            || self.linear_damping < 0.0
            || !self.angular_damping.is_finite()
            || self.angular_damping < 0.0
        {
            return Err(PhysicsError::InvalidParameter(format!(
                "damping must be finite and non-negative, got {}/{}",
                self.linear_damping, self.angular_damping
            )));
        }
        Ok(())
    }
}

/// Body state owned by the world
#[derive(Debug, Clone)]
pub(crate) struct Body {
    pub body_type: BodyType,
    /// Body-local origin in world space
    pub position: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    /// Force accumulator, cleared at end of step
    pub force: Vec2,
    /// Torque accumulator, cleared at end of step
    pub torque: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub mass: f32,
    pub inv_mass: f32,
    /// Rotational inertia about the center of mass
    pub inertia: f32,
    pub inv_inertia: f32,
    /// Center of mass in body-local coordinates
    pub local_center: Vec2,
    /// Owned shapes in creation order
    pub shapes: Vec<ShapeHandle>,
}

impl Body {
    pub fn new(desc: &BodyDesc) -> Self {
        // Dynamic bodies start at nominal unit mass so a shapeless body
        // still integrates; attaching shapes recomputes the real values.
        let (mass, inv_mass) = match desc.body_type {
            BodyType::Dynamic => (1.0, 1.0),
            _ => (0.0, 0.0),
        };

        // Static bodies never move; any velocity in the desc would still
        // leak into contact relative-velocity terms, so drop it here.
        let (linear_velocity, angular_velocity) = match desc.body_type {
            BodyType::Static => (Vec2::ZERO, 0.0),
            _ => (desc.linear_velocity, desc.angular_velocity),
        };

        Self {
            body_type: desc.body_type,
            position: desc.position,
            angle: desc.angle,
            linear_velocity,
            angular_velocity,
            force: Vec2::ZERO,
            torque: 0.0,
            linear_damping: desc.linear_damping,
            angular_damping: desc.angular_damping,
            mass,
            inv_mass,
            inertia: 0.0,
            inv_inertia: 0.0,
            local_center: Vec2::ZERO,
            shapes: Vec::new(),
        }
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    #[inline]
    pub fn transform(&self) -> Transform2 {
        Transform2::from_position_angle(self.position, self.angle)
    }

    /// Center of mass in world space.
    #[inline]
    pub fn world_center(&self) -> Vec2 {
        self.transform().transform_point(self.local_center)
    }

    /// Install recomputed mass properties. `inertia` is about the center
    /// of mass; zero inertia (degenerate distribution) disables rotation
    /// instead of dividing by zero.
    pub fn set_mass_properties(&mut self, mass: f32, local_center: Vec2, inertia: f32) {
        self.mass = mass;
        self.inv_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        self.local_center = local_center;
        self.inertia = inertia;
        self.inv_inertia = if inertia > 0.0 { 1.0 / inertia } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desc_defaults() {
        let desc = BodyDesc::default();
        assert_eq!(desc.body_type, BodyType::Dynamic);
        assert_eq!(desc.position, Vec2::ZERO);
        assert_eq!(desc.angle, 0.0);
    }

    #[test]
    fn test_desc_builders() {
        let desc = BodyDesc::fixed().with_position(1.0, 2.0).with_angle(0.5);
        assert_eq!(desc.body_type, BodyType::Static);
        assert_eq!(desc.position, Vec2::new(1.0, 2.0));
        assert_eq!(desc.angle, 0.5);

        let desc = BodyDesc::dynamic()
            .with_linear_velocity(3.0, -1.0)
            .with_angular_velocity(2.0);
        assert_eq!(desc.linear_velocity, Vec2::new(3.0, -1.0));
        assert_eq!(desc.angular_velocity, 2.0);
    }

    #[test]
    fn test_desc_validation() {
        assert!(BodyDesc::default().validate().is_ok());
        assert!(matches!(
            BodyDesc::dynamic().with_position(f32::NAN, 0.0).validate(),
            Err(PhysicsError::InvalidGeometry(_))
        ));
        assert!(matches!(
            BodyDesc::dynamic().with_damping(-1.0, 0.0).validate(),
            Err(PhysicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_new_body_nominal_mass() {
        let dynamic = Body::new(&BodyDesc::dynamic());
        assert_eq!(dynamic.mass, 1.0);
        assert_eq!(dynamic.inv_mass, 1.0);

        let fixed = Body::new(&BodyDesc::fixed());
        assert_eq!(fixed.mass, 0.0);
        assert_eq!(fixed.inv_mass, 0.0);

        let kinematic = Body::new(&BodyDesc::kinematic());
        assert_eq!(kinematic.inv_mass, 0.0);
    }

    #[test]
    fn test_static_body_drops_desc_velocity() {
        let body = Body::new(&BodyDesc::fixed().with_linear_velocity(3.0, 1.0));
        assert_eq!(body.linear_velocity, Vec2::ZERO);
        assert_eq!(body.angular_velocity, 0.0);

        let kinematic = Body::new(&BodyDesc::kinematic().with_linear_velocity(3.0, 1.0));
        assert_eq!(kinematic.linear_velocity, Vec2::new(3.0, 1.0));
    }

    #[test]
    fn test_desc_serde_roundtrip() {
        let desc = BodyDesc::kinematic()
            .with_position(4.0, 5.0)
            .with_linear_velocity(1.0, 0.0);
        let json = serde_json::to_string(&desc).unwrap();
        let back: BodyDesc = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }
}
