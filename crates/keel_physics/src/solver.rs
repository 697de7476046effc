//! TGS-Soft contact solver
//!
//! Sequential impulses over velocities with accumulated clamping and warm
//! starting, followed by a soft positional pass that bleeds out a fraction
//! of the remaining penetration per iteration. Contact response is
//! restitution-free: it kills approach velocity, it never injects bounce.
//!
//! The solver gathers bodies into a dense working set, runs every phase on
//! centers of mass, and scatters results back to the arena at the end of
//! the step. Static bodies are gathered (contacts reference them) but
//! never written back.

use std::collections::HashMap;

use keel_math::{Rot2, Transform2, Vec2};

use crate::arena::{Arena, ArenaKey};
use crate::body::{Body, BodyType};
use crate::config::{
    StepConfig, LINEAR_SLOP, MAX_POSITION_CORRECTION, POSITION_CORRECTION_FACTOR,
};
use crate::contact::collide_polygons;
use crate::error::{PhysicsError, Result};
use crate::shape::{Shape, ShapeHandle};

/// Squared distance under which a fresh contact point inherits the
/// accumulated impulses of a cached one.
const MATCH_DISTANCE_SQUARED: f32 = 1e-4;

/// Counters from the most recent step, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStats {
    /// Contact constraints generated
    pub contacts: usize,
    /// Total contact points across all constraints
    pub points: usize,
    /// Deepest penetration seen at contact generation, non-negative
    pub max_penetration: f32,
    /// Largest approach speed left unsolved at any contact after the
    /// velocity pass; a convergence residual, zero when fully solved
    pub max_normal_speed: f32,
}

// ==================== Warm-start cache ====================

/// Canonical shape-pair key: the lower handle first, so lookups are
/// independent of pair traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ContactKey {
    a: ShapeHandle,
    b: ShapeHandle,
}

impl ContactKey {
    pub fn new(a: ShapeHandle, b: ShapeHandle) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }

    pub fn involves(&self, shape: ShapeHandle) -> bool {
        self.a == shape || self.b == shape
    }
}

/// One cached contact point carried between steps.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CachedContact {
    /// Anchor on body A in A's frame; body-fixed, so it identifies the
    /// point across steps while the pair stays in contact
    pub local_anchor_a: Vec2,
    pub normal_impulse: f32,
    pub tangent_impulse: f32,
}

/// Cached impulses for one shape pair, rebuilt every step.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CachedManifold {
    pub points: [CachedContact; 2],
    pub count: usize,
}

impl CachedManifold {
    /// Cached point nearest to the anchor, within the match threshold.
    fn find(&self, local_anchor_a: Vec2) -> Option<&CachedContact> {
        let mut best = None;
        let mut best_distance = MATCH_DISTANCE_SQUARED;
        for point in &self.points[..self.count] {
            let distance = point.local_anchor_a.distance_squared(local_anchor_a);
            if distance < best_distance {
                best_distance = distance;
                best = Some(point);
            }
        }
        best
    }
}

// ==================== Working set ====================

/// Per-body state for one step, positioned at the center of mass.
struct SolverBody {
    key: ArenaKey,
    body_type: BodyType,
    center: Vec2,
    angle: f32,
    linear_velocity: Vec2,
    angular_velocity: f32,
    inv_mass: f32,
    inv_inertia: f32,
    local_center: Vec2,
    linear_damping: f32,
    angular_damping: f32,
    force: Vec2,
    torque: f32,
}

impl SolverBody {
    fn gather(key: ArenaKey, body: &Body) -> Self {
        Self {
            key,
            body_type: body.body_type,
            center: body.world_center(),
            angle: body.angle,
            linear_velocity: body.linear_velocity,
            angular_velocity: body.angular_velocity,
            inv_mass: body.inv_mass,
            inv_inertia: body.inv_inertia,
            local_center: body.local_center,
            linear_damping: body.linear_damping,
            angular_damping: body.angular_damping,
            force: body.force,
            torque: body.torque,
        }
    }

    #[inline]
    fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    /// Body-origin transform for collision, reconstructed from the
    /// center of mass.
    fn transform(&self) -> Transform2 {
        let q = Rot2::from_angle(self.angle);
        Transform2::new(self.center - q.rotate(self.local_center), q)
    }

    /// World velocity of the point at `anchor` from the center of mass.
    #[inline]
    fn velocity_at(&self, anchor: Vec2) -> Vec2 {
        self.linear_velocity + cross_scalar(self.angular_velocity, anchor)
    }

    /// Impulse at a world anchor; no-op for infinite-mass bodies.
    #[inline]
    fn apply_impulse(&mut self, impulse: Vec2, anchor: Vec2) {
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia * anchor.cross(impulse);
    }
}

/// One contact point being solved this step.
#[derive(Debug, Clone, Copy, Default)]
struct ConstraintPoint {
    /// Anchors relative to each center of mass, world frame, frozen at
    /// generation time for the velocity pass
    anchor_a: Vec2,
    anchor_b: Vec2,
    /// The same anchors in body frame; re-rotated during the position
    /// pass and matched against the cache across steps
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    /// Separation at generation time; negative is penetration
    separation: f32,
    normal_mass: f32,
    tangent_mass: f32,
    normal_impulse: f32,
    tangent_impulse: f32,
}

/// Velocity and position constraint for one touching shape pair.
struct ContactConstraint {
    body_a: usize,
    body_b: usize,
    key: ContactKey,
    /// World normal from shape A toward shape B
    normal: Vec2,
    friction: f32,
    points: [ConstraintPoint; 2],
    count: usize,
}

#[inline]
fn cross_scalar(s: f32, v: Vec2) -> Vec2 {
    Vec2::new(-s * v.y, s * v.x)
}

/// Mutable references to two distinct working-set bodies, in the order
/// they were requested.
fn pair_mut(bodies: &mut [SolverBody], a: usize, b: usize) -> (&mut SolverBody, &mut SolverBody) {
    debug_assert_ne!(a, b);
    if a < b {
        let (head, tail) = bodies.split_at_mut(b);
        (&mut head[a], &mut tail[0])
    } else {
        let (head, tail) = bodies.split_at_mut(a);
        (&mut tail[0], &mut head[b])
    }
}

// ==================== Step phases ====================

/// Advance the simulation by `dt`. The caller guarantees `dt > 0`.
pub(crate) fn step(
    bodies: &mut Arena<Body>,
    shapes: &Arena<Shape>,
    cache: &mut HashMap<ContactKey, CachedManifold>,
    gravity: Vec2,
    dt: f32,
    config: &StepConfig,
) -> Result<StepStats> {
    debug_assert!(dt > 0.0);
    let inv_dt = 1.0 / dt;

    let mut solver_bodies = Vec::with_capacity(bodies.len());
    let mut body_slots = HashMap::with_capacity(bodies.len());
    for (key, body) in bodies.iter() {
        body_slots.insert(key, solver_bodies.len());
        solver_bodies.push(SolverBody::gather(key, body));
    }

    let mut constraints =
        build_constraints(&solver_bodies, &body_slots, shapes, cache, config.warm_start);

    if config.warm_start {
        apply_warm_start(&mut solver_bodies, &constraints);
    }

    integrate_velocities(&mut solver_bodies, gravity, dt);

    for _ in 0..config.velocity_iterations {
        solve_velocities(&mut solver_bodies, &mut constraints, inv_dt);
    }

    integrate_positions(&mut solver_bodies, dt);

    for _ in 0..config.position_iterations {
        solve_positions(&mut solver_bodies, &constraints);
    }

    store_cache(cache, &constraints);

    scatter(bodies, &solver_bodies)?;

    let mut stats = StepStats {
        contacts: constraints.len(),
        ..StepStats::default()
    };
    for constraint in &constraints {
        let a = &solver_bodies[constraint.body_a];
        let b = &solver_bodies[constraint.body_b];
        for point in &constraint.points[..constraint.count] {
            stats.points += 1;
            stats.max_penetration = stats.max_penetration.max(-point.separation);

            let dv = b.velocity_at(point.anchor_b) - a.velocity_at(point.anchor_a);
            let bias = if point.separation > 0.0 {
                point.separation * inv_dt
            } else {
                0.0
            };
            let residual = (-dv.dot(constraint.normal) - bias).max(0.0);
            stats.max_normal_speed = stats.max_normal_speed.max(residual);
        }
    }
    Ok(stats)
}

/// Narrow-phase over every shape pair with at least one dynamic body, in
/// arena order so constraint order is stable across steps.
fn build_constraints(
    solver_bodies: &[SolverBody],
    body_slots: &HashMap<ArenaKey, usize>,
    shapes: &Arena<Shape>,
    cache: &HashMap<ContactKey, CachedManifold>,
    warm_start: bool,
) -> Vec<ContactConstraint> {
    let entries: Vec<(ShapeHandle, &Shape)> = shapes
        .iter()
        .map(|(key, shape)| {
            let handle = ShapeHandle {
                index: key.0,
                generation: key.1,
                world: shape.body.world,
            };
            (handle, shape)
        })
        .collect();

    let mut constraints = Vec::new();
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            let (handle_a, shape_a) = entries[i];
            let (handle_b, shape_b) = entries[j];
            if shape_a.body == shape_b.body {
                continue;
            }
            let Some(&ia) = body_slots.get(&(shape_a.body.index, shape_a.body.generation))
            else {
                continue;
            };
            let Some(&ib) = body_slots.get(&(shape_b.body.index, shape_b.body.generation))
            else {
                continue;
            };
            let (a, b) = (&solver_bodies[ia], &solver_bodies[ib]);
            if !a.is_dynamic() && !b.is_dynamic() {
                continue;
            }

            let manifold = collide_polygons(
                &shape_a.as_polygon(),
                a.transform(),
                &shape_b.as_polygon(),
                b.transform(),
            );
            if manifold.count == 0 {
                continue;
            }

            let key = ContactKey::new(handle_a, handle_b);
            let cached = if warm_start { cache.get(&key) } else { None };

            let rot_a = Rot2::from_angle(a.angle);
            let rot_b = Rot2::from_angle(b.angle);
            let normal = manifold.normal;
            let tangent = normal.perpendicular();

            let mut constraint = ContactConstraint {
                body_a: ia,
                body_b: ib,
                key,
                normal,
                friction: (shape_a.friction * shape_b.friction).sqrt(),
                points: [ConstraintPoint::default(); 2],
                count: manifold.count,
            };

            for (point, manifold_point) in constraint.points[..manifold.count]
                .iter_mut()
                .zip(&manifold.points[..manifold.count])
            {
                let anchor_a = manifold_point.point - a.center;
                let anchor_b = manifold_point.point - b.center;
                point.anchor_a = anchor_a;
                point.anchor_b = anchor_b;
                point.local_anchor_a = rot_a.inverse_rotate(anchor_a);
                point.local_anchor_b = rot_b.inverse_rotate(anchor_b);
                point.separation = manifold_point.separation;

                let rn_a = anchor_a.cross(normal);
                let rn_b = anchor_b.cross(normal);
                let k_normal = a.inv_mass
                    + b.inv_mass
                    + a.inv_inertia * rn_a * rn_a
                    + b.inv_inertia * rn_b * rn_b;
                point.normal_mass = if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 };

                let rt_a = anchor_a.cross(tangent);
                let rt_b = anchor_b.cross(tangent);
                let k_tangent = a.inv_mass
                    + b.inv_mass
                    + a.inv_inertia * rt_a * rt_a
                    + b.inv_inertia * rt_b * rt_b;
                point.tangent_mass = if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 };

                if let Some(cached) = cached {
                    if let Some(old) = cached.find(point.local_anchor_a) {
                        point.normal_impulse = old.normal_impulse;
                        point.tangent_impulse = old.tangent_impulse;
                    }
                }
            }

            constraints.push(constraint);
        }
    }

    constraints
}

/// Re-apply the impulses carried over from the previous step so the
/// velocity pass starts near its converged solution.
fn apply_warm_start(solver_bodies: &mut [SolverBody], constraints: &[ContactConstraint]) {
    for constraint in constraints {
        let normal = constraint.normal;
        let tangent = normal.perpendicular();
        let (a, b) = pair_mut(solver_bodies, constraint.body_a, constraint.body_b);
        for point in &constraint.points[..constraint.count] {
            let impulse = normal * point.normal_impulse + tangent * point.tangent_impulse;
            a.apply_impulse(-impulse, point.anchor_a);
            b.apply_impulse(impulse, point.anchor_b);
        }
    }
}

/// Gravity, accumulated forces, and damping. Only dynamic bodies are
/// touched; kinematic bodies keep their user-set velocity.
fn integrate_velocities(solver_bodies: &mut [SolverBody], gravity: Vec2, dt: f32) {
    for body in solver_bodies.iter_mut() {
        if !body.is_dynamic() {
            continue;
        }
        let mut v = body.linear_velocity + (gravity + body.force * body.inv_mass) * dt;
        let mut w = body.angular_velocity + body.torque * body.inv_inertia * dt;

        // v' = v / (1 + c * dt), the implicit solution of dv/dt = -c v.
        v = v * (1.0 / (1.0 + body.linear_damping * dt));
        w *= 1.0 / (1.0 + body.angular_damping * dt);

        body.linear_velocity = v;
        body.angular_velocity = w;
    }
}

/// One Gauss-Seidel pass: normal impulse then friction impulse per
/// point, each update immediately visible to the next constraint.
fn solve_velocities(
    solver_bodies: &mut [SolverBody],
    constraints: &mut [ContactConstraint],
    inv_dt: f32,
) {
    for constraint in constraints.iter_mut() {
        let normal = constraint.normal;
        let tangent = normal.perpendicular();
        let (a, b) = pair_mut(solver_bodies, constraint.body_a, constraint.body_b);

        for point in &mut constraint.points[..constraint.count] {
            // Separated points get a speculative target: approach speed
            // may consume the remaining gap this step, no more. Touching
            // points drive approach speed to zero, with no restitution.
            let dv = b.velocity_at(point.anchor_b) - a.velocity_at(point.anchor_a);
            let vn = dv.dot(normal);
            let bias = if point.separation > 0.0 {
                point.separation * inv_dt
            } else {
                0.0
            };
            let new_impulse = (point.normal_impulse - point.normal_mass * (vn + bias)).max(0.0);
            let delta = new_impulse - point.normal_impulse;
            point.normal_impulse = new_impulse;

            let impulse = normal * delta;
            a.apply_impulse(-impulse, point.anchor_a);
            b.apply_impulse(impulse, point.anchor_b);

            // Friction, clamped to the cone set by the normal impulse.
            let dv = b.velocity_at(point.anchor_b) - a.velocity_at(point.anchor_a);
            let vt = dv.dot(tangent);
            let max_friction = constraint.friction * point.normal_impulse;
            let new_impulse = (point.tangent_impulse - point.tangent_mass * vt)
                .clamp(-max_friction, max_friction);
            let delta = new_impulse - point.tangent_impulse;
            point.tangent_impulse = new_impulse;

            let impulse = tangent * delta;
            a.apply_impulse(-impulse, point.anchor_a);
            b.apply_impulse(impulse, point.anchor_b);
        }
    }
}

/// Semi-implicit Euler: positions advance with post-solve velocities.
/// Kinematic bodies ride their velocity; static bodies hold still.
fn integrate_positions(solver_bodies: &mut [SolverBody], dt: f32) {
    for body in solver_bodies.iter_mut() {
        if body.body_type == BodyType::Static {
            continue;
        }
        body.center += body.linear_velocity * dt;
        body.angle += body.angular_velocity * dt;
    }
}

/// One soft position pass. Corrections move poses directly and leave
/// velocities alone, so resolving overlap injects no kinetic energy.
fn solve_positions(solver_bodies: &mut [SolverBody], constraints: &[ContactConstraint]) {
    for constraint in constraints {
        let normal = constraint.normal;
        let (a, b) = pair_mut(solver_bodies, constraint.body_a, constraint.body_b);

        for point in &constraint.points[..constraint.count] {
            let anchor_a = Rot2::from_angle(a.angle).rotate(point.local_anchor_a);
            let anchor_b = Rot2::from_angle(b.angle).rotate(point.local_anchor_b);

            // Current separation: the generated value plus how far the
            // two anchor points drifted apart along the normal since.
            let drift = (b.center + anchor_b) - (a.center + anchor_a);
            let separation = point.separation + drift.dot(normal);

            // Soft correction: a fraction of the overlap beyond the
            // slop, capped so a deep overlap cannot teleport a body.
            let c = (POSITION_CORRECTION_FACTOR * (separation + LINEAR_SLOP))
                .clamp(-MAX_POSITION_CORRECTION, 0.0);

            let rn_a = anchor_a.cross(normal);
            let rn_b = anchor_b.cross(normal);
            let k = a.inv_mass
                + b.inv_mass
                + a.inv_inertia * rn_a * rn_a
                + b.inv_inertia * rn_b * rn_b;
            let impulse = if k > 0.0 { -c / k } else { 0.0 };
            let p = normal * impulse;

            a.center -= p * a.inv_mass;
            a.angle -= a.inv_inertia * anchor_a.cross(p);
            b.center += p * b.inv_mass;
            b.angle += b.inv_inertia * anchor_b.cross(p);
        }
    }
}

/// Rebuild the warm-start cache from this step's constraints. Pairs that
/// separated drop out here.
fn store_cache(cache: &mut HashMap<ContactKey, CachedManifold>, constraints: &[ContactConstraint]) {
    cache.clear();
    for constraint in constraints {
        let mut cached = CachedManifold::default();
        for point in &constraint.points[..constraint.count] {
            cached.points[cached.count] = CachedContact {
                local_anchor_a: point.local_anchor_a,
                normal_impulse: point.normal_impulse,
                tangent_impulse: point.tangent_impulse,
            };
            cached.count += 1;
        }
        cache.insert(constraint.key, cached);
    }
}

/// Validate and write back the working set. Nothing is committed if any
/// body diverged, so the arena keeps its pre-step state.
fn scatter(bodies: &mut Arena<Body>, solver_bodies: &[SolverBody]) -> Result<()> {
    for solver_body in solver_bodies {
        if solver_body.body_type == BodyType::Static {
            continue;
        }
        let finite = solver_body.center.is_finite()
            && solver_body.angle.is_finite()
            && solver_body.linear_velocity.is_finite()
            && solver_body.angular_velocity.is_finite();
        if !finite {
            return Err(PhysicsError::NumericDivergence(format!(
                "body {}v{} has non-finite state after integration",
                solver_body.key.0, solver_body.key.1
            )));
        }
    }

    for solver_body in solver_bodies {
        if solver_body.body_type == BodyType::Static {
            continue;
        }
        let Some(body) = bodies.get_mut(solver_body.key) else {
            continue;
        };
        let rotation = Rot2::from_angle(solver_body.angle);
        body.position = solver_body.center - rotation.rotate(solver_body.local_center);
        body.angle = solver_body.angle;
        body.linear_velocity = solver_body.linear_velocity;
        body.angular_velocity = solver_body.angular_velocity;
        body.force = Vec2::ZERO;
        body.torque = 0.0;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyDesc, BodyHandle};
    use crate::config::DEFAULT_TIMESTEP;
    use crate::shape::{Polygon, Segment, ShapeDesc, ShapeGeometry};
    use approx::assert_relative_eq;

    const GRAVITY: Vec2 = Vec2::new(0.0, -10.0);

    fn handle_for(key: ArenaKey) -> BodyHandle {
        BodyHandle {
            index: key.0,
            generation: key.1,
            world: 0,
        }
    }

    fn insert_shape(shapes: &mut Arena<Shape>, body: BodyHandle, geometry: ShapeGeometry) {
        let desc = ShapeDesc::default();
        shapes.insert(Shape {
            body,
            geometry,
            friction: desc.friction,
            density: desc.density,
        });
    }

    /// Ground segment plus a unit box whose mass properties are
    /// installed the way the world would after attaching the shape.
    fn resting_scene(box_y: f32) -> (Arena<Body>, Arena<Shape>) {
        let mut bodies = Arena::new();
        let mut shapes = Arena::new();

        let ground_key = bodies.insert(Body::new(&BodyDesc::fixed()));
        insert_shape(
            &mut shapes,
            handle_for(ground_key),
            ShapeGeometry::Segment(Segment::new(Vec2::new(-66.0, 0.0), Vec2::new(66.0, 0.0))),
        );

        let box_key = bodies.insert(Body::new(&BodyDesc::dynamic().with_position(0.0, box_y)));
        insert_shape(
            &mut shapes,
            handle_for(box_key),
            ShapeGeometry::Polygon(Polygon::new_box(0.5, 0.5)),
        );
        bodies
            .get_mut(box_key)
            .unwrap()
            .set_mass_properties(1.0, Vec2::ZERO, 1.0 / 6.0);

        (bodies, shapes)
    }

    #[test]
    fn test_contact_key_is_canonical() {
        let a = ShapeHandle {
            index: 3,
            generation: 1,
            world: 0,
        };
        let b = ShapeHandle {
            index: 7,
            generation: 2,
            world: 0,
        };
        assert_eq!(ContactKey::new(a, b), ContactKey::new(b, a));
        assert!(ContactKey::new(b, a).involves(a));
        assert!(!ContactKey::new(a, b).involves(ShapeHandle {
            index: 9,
            generation: 1,
            world: 0,
        }));
    }

    #[test]
    fn test_cached_manifold_matching() {
        let mut cached = CachedManifold::default();
        cached.points[0] = CachedContact {
            local_anchor_a: Vec2::new(0.5, -0.5),
            normal_impulse: 2.0,
            tangent_impulse: 0.1,
        };
        cached.count = 1;

        let hit = cached.find(Vec2::new(0.5005, -0.5)).unwrap();
        assert_eq!(hit.normal_impulse, 2.0);
        assert!(cached.find(Vec2::new(0.7, -0.5)).is_none());
    }

    #[test]
    fn test_pair_mut_preserves_order() {
        let mut bodies = vec![
            SolverBody::gather((0, 0), &Body::new(&BodyDesc::dynamic())),
            SolverBody::gather((1, 0), &Body::new(&BodyDesc::fixed())),
        ];
        let (a, b) = pair_mut(&mut bodies, 1, 0);
        assert_eq!(a.key, (1, 0));
        assert_eq!(b.key, (0, 0));
    }

    #[test]
    fn test_cross_scalar_spins_counter_clockwise() {
        let v = cross_scalar(1.0, Vec2::X);
        assert_eq!(v, Vec2::Y);
    }

    #[test]
    fn test_free_fall_without_contacts() {
        let mut bodies = Arena::new();
        let shapes = Arena::new();
        let key = bodies.insert(Body::new(&BodyDesc::dynamic().with_position(0.0, 5.0)));

        let mut cache = HashMap::new();
        let stats = step(
            &mut bodies,
            &shapes,
            &mut cache,
            GRAVITY,
            DEFAULT_TIMESTEP,
            &StepConfig::default(),
        )
        .unwrap();

        assert_eq!(stats.contacts, 0);
        let body = bodies.get(key).unwrap();
        assert_relative_eq!(body.linear_velocity.y, -10.0 * DEFAULT_TIMESTEP, epsilon = 1e-6);
        assert_relative_eq!(
            body.position.y,
            5.0 - 10.0 * DEFAULT_TIMESTEP * DEFAULT_TIMESTEP,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_resting_box_stays_put() {
        // Start at the settled depth: penetration equal to the slop, so
        // neither pass has anything left to correct.
        let (mut bodies, shapes) = resting_scene(0.5 - LINEAR_SLOP);
        let box_key = bodies.keys().nth(1).unwrap();

        let mut cache = HashMap::new();
        let stats = step(
            &mut bodies,
            &shapes,
            &mut cache,
            GRAVITY,
            DEFAULT_TIMESTEP,
            &StepConfig::default(),
        )
        .unwrap();

        assert_eq!(stats.contacts, 1);
        assert_eq!(stats.points, 2);
        let body = bodies.get(box_key).unwrap();
        assert!(body.linear_velocity.length() < 1e-4);
        assert!(body.position.y > 0.49 && body.position.y < 0.5);
    }

    #[test]
    fn test_step_stores_impulses_for_next_step() {
        let (mut bodies, shapes) = resting_scene(0.5 - LINEAR_SLOP);
        let mut cache = HashMap::new();

        step(
            &mut bodies,
            &shapes,
            &mut cache,
            GRAVITY,
            DEFAULT_TIMESTEP,
            &StepConfig::default(),
        )
        .unwrap();

        assert_eq!(cache.len(), 1);
        let cached = cache.values().next().unwrap();
        assert_eq!(cached.count, 2);
        for point in &cached.points[..cached.count] {
            assert!(point.normal_impulse > 0.0);
        }
    }

    #[test]
    fn test_kinematic_body_rides_its_velocity() {
        let mut bodies = Arena::new();
        let shapes = Arena::new();
        let key = bodies.insert(Body::new(
            &BodyDesc::kinematic().with_linear_velocity(2.0, 0.0),
        ));

        let mut cache = HashMap::new();
        step(
            &mut bodies,
            &shapes,
            &mut cache,
            GRAVITY,
            DEFAULT_TIMESTEP,
            &StepConfig::default(),
        )
        .unwrap();

        let body = bodies.get(key).unwrap();
        // Moves by its velocity but picks up no gravity.
        assert_relative_eq!(body.position.x, 2.0 * DEFAULT_TIMESTEP, epsilon = 1e-6);
        assert_eq!(body.linear_velocity, Vec2::new(2.0, 0.0));
        assert_eq!(body.position.y, 0.0);
    }

    #[test]
    fn test_step_detects_non_finite_state() {
        let mut bodies = Arena::new();
        let shapes = Arena::new();
        bodies.insert(Body::new(
            &BodyDesc::dynamic().with_position(f32::NAN, 0.0),
        ));

        let mut cache = HashMap::new();
        let result = step(
            &mut bodies,
            &shapes,
            &mut cache,
            GRAVITY,
            DEFAULT_TIMESTEP,
            &StepConfig::default(),
        );
        assert!(matches!(result, Err(PhysicsError::NumericDivergence(_))));
    }

    #[test]
    fn test_speculative_contact_brakes_approach() {
        // Box one millimeter above the ground, falling fast enough to
        // tunnel in a single step if unconstrained.
        let (mut bodies, shapes) = resting_scene(0.501);
        let box_key = bodies.keys().nth(1).unwrap();
        bodies.get_mut(box_key).unwrap().linear_velocity = Vec2::new(0.0, -5.0);

        let mut cache = HashMap::new();
        step(
            &mut bodies,
            &shapes,
            &mut cache,
            GRAVITY,
            DEFAULT_TIMESTEP,
            &StepConfig::default(),
        )
        .unwrap();

        // The speculative bias lets the box move down exactly the gap,
        // landing on the surface instead of inside it.
        let body = bodies.get(box_key).unwrap();
        assert!(body.position.y > 0.5 - 1e-3);
        assert!(body.position.y <= 0.501);
    }
}
