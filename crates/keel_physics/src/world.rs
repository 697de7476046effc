//! World container and public simulation API
//!
//! A [`World`] owns its bodies and shapes in generational pools and is
//! stepped explicitly with [`World::step`]. Every handle is stamped with
//! the id of the world that issued it, so a stale or foreign handle
//! resolves to an error instead of aliasing another world's data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};

use serde::{Deserialize, Serialize};

use crate::arena::{Arena, ArenaKey};
use crate::body::{Body, BodyDesc, BodyHandle, BodyType};
use crate::config::{SolverKind, StepConfig};
use crate::error::{PhysicsError, Result};
use crate::hull::WELD_TOLERANCE;
use crate::shape::{Polygon, Segment, Shape, ShapeDesc, ShapeGeometry, ShapeHandle};
use crate::solver::{self, CachedManifold, ContactKey, StepStats};
use keel_math::{Transform2, Vec2};

/// World creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldDesc {
    /// Acceleration applied to every dynamic body (m/s^2)
    pub gravity: Vec2,
    /// Solver variant used by [`World::step`]
    pub solver: SolverKind,
}

impl Default for WorldDesc {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -10.0),
            solver: SolverKind::TgsSoft,
        }
    }
}

impl WorldDesc {
    /// Set gravity
    pub fn with_gravity(mut self, x: f32, y: f32) -> Self {
        self.gravity = Vec2::new(x, y);
        self
    }

    /// Set the solver variant
    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }
}

/// Source of world id stamps. Starts at 1 so a zeroed handle never
/// matches a live world.
static NEXT_WORLD_ID: AtomicU16 = AtomicU16::new(1);

fn stale<H: std::fmt::Debug>(handle: H) -> PhysicsError {
    PhysicsError::StaleHandle(format!("{:?}", handle))
}

/// A 2D rigid-body physics world
///
/// Owns the bodies and shapes created through it. Dropping the world
/// releases everything it owns; handles into a dropped world are simply
/// dead values.
pub struct World {
    /// Identity stamp carried by every handle this world issues
    id: u16,
    /// Acceleration applied to dynamic bodies each step
    gravity: Vec2,
    /// Solver variant selected at creation
    solver: SolverKind,
    /// Body pool
    bodies: Arena<Body>,
    /// Shape pool
    shapes: Arena<Shape>,
    /// Contact impulses carried across steps for warm starting
    contact_cache: HashMap<ContactKey, CachedManifold>,
    /// Set when a step produced non-finite state; every later step refuses
    diverged: bool,
    /// Diagnostics from the most recent completed step
    stats: StepStats,
}

impl World {
    /// Create a new physics world
    pub fn new(desc: WorldDesc) -> Self {
        let id = NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed);
        log::info!("Created physics world {} (gravity {:?})", id, desc.gravity);
        Self {
            id,
            gravity: desc.gravity,
            solver: desc.solver,
            bodies: Arena::new(),
            shapes: Arena::new(),
            contact_cache: HashMap::new(),
            diverged: false,
            stats: StepStats::default(),
        }
    }

    // ==================== Bodies ====================

    /// Create a rigid body
    pub fn create_body(&mut self, desc: BodyDesc) -> Result<BodyHandle> {
        desc.validate()?;
        let key = self.bodies.insert(Body::new(&desc));
        let handle = BodyHandle {
            index: key.0,
            generation: key.1,
            world: self.id,
        };
        log::debug!("Created {:?} ({:?})", handle, desc.body_type);
        Ok(handle)
    }

    /// Destroy a body and every shape attached to it. Cached contact
    /// impulses involving those shapes are dropped with them.
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<()> {
        let key = self.resolve_body(handle)?;
        let body = self.bodies.remove(key).ok_or_else(|| stale(handle))?;
        for shape_handle in &body.shapes {
            self.shapes
                .remove((shape_handle.index, shape_handle.generation));
        }
        self.contact_cache
            .retain(|contact, _| !body.shapes.iter().any(|&s| contact.involves(s)));
        log::debug!("Destroyed {:?} ({} shapes)", handle, body.shapes.len());
        Ok(())
    }

    // ==================== Shapes ====================

    /// Attach a segment shape to a body. Segments carry no mass, so a
    /// dynamic body needs at least one polygon shape as well.
    pub fn create_segment_shape(
        &mut self,
        body: BodyHandle,
        desc: ShapeDesc,
        segment: Segment,
    ) -> Result<ShapeHandle> {
        desc.validate()?;
        if !segment.is_finite() {
            return Err(PhysicsError::InvalidGeometry(
                "segment endpoint is not finite".into(),
            ));
        }
        if segment.p1.distance_squared(segment.p2) <= WELD_TOLERANCE * WELD_TOLERANCE {
            return Err(PhysicsError::DegenerateGeometry(
                "segment endpoints coincide".into(),
            ));
        }
        self.attach_shape(body, desc, ShapeGeometry::Segment(segment))
    }

    /// Attach a convex polygon shape to a body
    pub fn create_polygon_shape(
        &mut self,
        body: BodyHandle,
        desc: ShapeDesc,
        polygon: Polygon,
    ) -> Result<ShapeHandle> {
        desc.validate()?;
        if !polygon.is_finite() {
            return Err(PhysicsError::InvalidGeometry(
                "polygon vertex is not finite".into(),
            ));
        }
        self.attach_shape(body, desc, ShapeGeometry::Polygon(polygon))
    }

    /// Insert the shape, link it to its body, and recompute the body's
    /// mass properties. A failed recompute rolls the attach back so the
    /// world is unchanged.
    fn attach_shape(
        &mut self,
        body: BodyHandle,
        desc: ShapeDesc,
        geometry: ShapeGeometry,
    ) -> Result<ShapeHandle> {
        let key = self.resolve_body(body)?;

        let shape_key = self.shapes.insert(Shape {
            body,
            geometry,
            friction: desc.friction,
            density: desc.density,
        });
        let handle = ShapeHandle {
            index: shape_key.0,
            generation: shape_key.1,
            world: self.id,
        };

        let body_state = self.bodies.get_mut(key).ok_or_else(|| stale(body))?;
        body_state.shapes.push(handle);

        if let Err(err) = self.recompute_mass(key, body) {
            self.shapes.remove(shape_key);
            if let Some(body_state) = self.bodies.get_mut(key) {
                body_state.shapes.pop();
            }
            return Err(err);
        }

        log::debug!("Attached {:?} to {:?}", handle, body);
        Ok(handle)
    }

    /// Rebuild mass, center of mass, and inertia from the body's shapes.
    /// Non-dynamic bodies keep zero inverses and are left alone.
    fn recompute_mass(&mut self, key: ArenaKey, handle: BodyHandle) -> Result<()> {
        let body = self.bodies.get_mut(key).ok_or_else(|| stale(handle))?;
        if !body.is_dynamic() {
            return Ok(());
        }

        let mut mass = 0.0;
        let mut weighted_center = Vec2::ZERO;
        let mut inertia = 0.0;
        for shape_handle in &body.shapes {
            let Some(shape) = self
                .shapes
                .get((shape_handle.index, shape_handle.generation))
            else {
                continue;
            };
            let data = shape.mass_data();
            mass += data.mass;
            weighted_center += data.center * data.mass;
            inertia += data.inertia;
        }

        if mass <= 0.0 {
            return Err(PhysicsError::ZeroMass(handle));
        }

        let center = weighted_center / mass;
        // Shapes report inertia about the body origin; shift it to the
        // combined center of mass.
        let inertia = (inertia - mass * center.length_squared()).max(0.0);
        body.set_mass_properties(mass, center, inertia);
        Ok(())
    }

    // ==================== Body State ====================

    /// Get body origin position in world space
    pub fn get_body_position(&self, handle: BodyHandle) -> Result<Vec2> {
        self.body_ref(handle).map(|body| body.position)
    }

    /// Get body rotation angle in radians
    pub fn get_body_angle(&self, handle: BodyHandle) -> Result<f32> {
        self.body_ref(handle).map(|body| body.angle)
    }

    /// Get body world transform
    pub fn get_body_transform(&self, handle: BodyHandle) -> Result<Transform2> {
        self.body_ref(handle).map(|body| body.transform())
    }

    /// Get linear velocity of the body origin
    pub fn get_body_linear_velocity(&self, handle: BodyHandle) -> Result<Vec2> {
        self.body_ref(handle).map(|body| body.linear_velocity)
    }

    /// Get angular velocity in radians per second
    pub fn get_body_angular_velocity(&self, handle: BodyHandle) -> Result<f32> {
        self.body_ref(handle).map(|body| body.angular_velocity)
    }

    /// Get body mass in kilograms; zero for static and kinematic bodies
    pub fn get_body_mass(&self, handle: BodyHandle) -> Result<f32> {
        self.body_ref(handle).map(|body| body.mass)
    }

    /// Get the body's motion type
    pub fn get_body_type(&self, handle: BodyHandle) -> Result<BodyType> {
        self.body_ref(handle).map(|body| body.body_type)
    }

    /// Teleport the body origin. Velocity is untouched.
    pub fn set_body_position(&mut self, handle: BodyHandle, x: f32, y: f32) -> Result<()> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "position must be finite, got ({}, {})",
                x, y
            )));
        }
        self.body_mut(handle).map(|body| {
            body.position = Vec2::new(x, y);
        })
    }

    /// Set body rotation angle in radians
    pub fn set_body_angle(&mut self, handle: BodyHandle, angle: f32) -> Result<()> {
        if !angle.is_finite() {
            return Err(PhysicsError::InvalidParameter(format!(
                "angle must be finite, got {}",
                angle
            )));
        }
        self.body_mut(handle).map(|body| {
            body.angle = angle;
        })
    }

    /// Set linear velocity. Ignored on static bodies, which never move.
    pub fn set_body_linear_velocity(&mut self, handle: BodyHandle, x: f32, y: f32) -> Result<()> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(PhysicsError::InvalidParameter(format!(
                "velocity must be finite, got ({}, {})",
                x, y
            )));
        }
        self.body_mut(handle).map(|body| {
            if body.body_type != BodyType::Static {
                body.linear_velocity = Vec2::new(x, y);
            }
        })
    }

    /// Set angular velocity. Ignored on static bodies.
    pub fn set_body_angular_velocity(&mut self, handle: BodyHandle, omega: f32) -> Result<()> {
        if !omega.is_finite() {
            return Err(PhysicsError::InvalidParameter(format!(
                "angular velocity must be finite, got {}",
                omega
            )));
        }
        self.body_mut(handle).map(|body| {
            if body.body_type != BodyType::Static {
                body.angular_velocity = omega;
            }
        })
    }

    // ==================== Forces and Impulses ====================

    /// Accumulate a force at the center of mass, consumed by the next
    /// step. No effect on non-dynamic bodies.
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec2) -> Result<()> {
        if !force.is_finite() {
            return Err(PhysicsError::InvalidParameter(format!(
                "force must be finite, got {:?}",
                force
            )));
        }
        self.body_mut(handle).map(|body| {
            if body.is_dynamic() {
                body.force += force;
            }
        })
    }

    /// Accumulate a torque, consumed by the next step. No effect on
    /// non-dynamic bodies.
    pub fn apply_torque(&mut self, handle: BodyHandle, torque: f32) -> Result<()> {
        if !torque.is_finite() {
            return Err(PhysicsError::InvalidParameter(format!(
                "torque must be finite, got {}",
                torque
            )));
        }
        self.body_mut(handle).map(|body| {
            if body.is_dynamic() {
                body.torque += torque;
            }
        })
    }

    /// Change velocity immediately by an impulse at the center of mass.
    /// No effect on non-dynamic bodies.
    pub fn apply_linear_impulse(&mut self, handle: BodyHandle, impulse: Vec2) -> Result<()> {
        if !impulse.is_finite() {
            return Err(PhysicsError::InvalidParameter(format!(
                "impulse must be finite, got {:?}",
                impulse
            )));
        }
        self.body_mut(handle).map(|body| {
            if body.is_dynamic() {
                body.linear_velocity += impulse * body.inv_mass;
            }
        })
    }

    // ==================== Simulation ====================

    /// Advance the simulation by `dt` seconds.
    ///
    /// `dt` must be finite and non-negative; a zero `dt` is a no-op.
    /// If integration produces non-finite state the step fails with
    /// [`PhysicsError::NumericDivergence`], no body is modified, and the
    /// world refuses every further step.
    pub fn step(&mut self, dt: f32, config: StepConfig) -> Result<()> {
        if self.diverged {
            return Err(PhysicsError::NumericDivergence(
                "world is poisoned by an earlier divergence".into(),
            ));
        }
        if !dt.is_finite() || dt < 0.0 {
            return Err(PhysicsError::InvalidParameter(format!(
                "dt must be finite and non-negative, got {}",
                dt
            )));
        }
        if dt == 0.0 {
            return Ok(());
        }

        match solver::step(
            &mut self.bodies,
            &self.shapes,
            &mut self.contact_cache,
            self.gravity,
            dt,
            &config,
        ) {
            Ok(stats) => {
                log::trace!(
                    "Stepped world {}: {} contacts, {} points",
                    self.id,
                    stats.contacts,
                    stats.points
                );
                self.stats = stats;
                Ok(())
            }
            Err(err) => {
                self.diverged = true;
                log::warn!("World {} diverged: {}", self.id, err);
                Err(err)
            }
        }
    }

    /// Diagnostics recorded by the most recent completed step
    pub fn last_step_stats(&self) -> StepStats {
        self.stats
    }

    // ==================== Queries ====================

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of live shapes
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Whether the handle refers to a live body in this world
    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.body_ref(handle).is_ok()
    }

    /// Whether the handle refers to a live shape in this world
    pub fn contains_shape(&self, handle: ShapeHandle) -> bool {
        self.shape_ref(handle).is_ok()
    }

    /// Shapes attached to a body, in creation order
    pub fn get_body_shapes(&self, handle: BodyHandle) -> Result<&[ShapeHandle]> {
        self.body_ref(handle).map(|body| body.shapes.as_slice())
    }

    /// Body a shape is attached to
    pub fn get_shape_body(&self, handle: ShapeHandle) -> Result<BodyHandle> {
        self.shape_ref(handle).map(|shape| shape.body)
    }

    /// Friction coefficient of a shape
    pub fn get_shape_friction(&self, handle: ShapeHandle) -> Result<f32> {
        self.shape_ref(handle).map(|shape| shape.friction)
    }

    /// Density of a shape
    pub fn get_shape_density(&self, handle: ShapeHandle) -> Result<f32> {
        self.shape_ref(handle).map(|shape| shape.density)
    }

    /// Current gravity
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Change gravity for subsequent steps
    pub fn set_gravity(&mut self, x: f32, y: f32) {
        self.gravity = Vec2::new(x, y);
    }

    /// Current world configuration
    pub fn desc(&self) -> WorldDesc {
        WorldDesc {
            gravity: self.gravity,
            solver: self.solver,
        }
    }

    // ==================== Handle Resolution ====================

    fn resolve_body(&self, handle: BodyHandle) -> Result<ArenaKey> {
        let key = (handle.index, handle.generation);
        if handle.world == self.id && self.bodies.contains(key) {
            Ok(key)
        } else {
            Err(stale(handle))
        }
    }

    fn body_ref(&self, handle: BodyHandle) -> Result<&Body> {
        if handle.world == self.id {
            if let Some(body) = self.bodies.get((handle.index, handle.generation)) {
                return Ok(body);
            }
        }
        Err(stale(handle))
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        if handle.world == self.id {
            if let Some(body) = self.bodies.get_mut((handle.index, handle.generation)) {
                return Ok(body);
            }
        }
        Err(stale(handle))
    }

    fn shape_ref(&self, handle: ShapeHandle) -> Result<&Shape> {
        if handle.world == self.id {
            if let Some(shape) = self.shapes.get((handle.index, handle.generation)) {
                return Ok(shape);
            }
        }
        Err(stale(handle))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldDesc::default())
    }
}
