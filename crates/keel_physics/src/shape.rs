//! Collision shapes: segments and convex polygons

use crate::body::BodyHandle;
use crate::config::MAX_POLYGON_VERTICES;
use crate::error::{PhysicsError, Result};
use crate::hull::Hull;
use keel_math::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a shape in the physics world
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
    pub(crate) world: u16,
}

impl fmt::Debug for ShapeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeHandle({}v{})", self.index, self.generation)
    }
}

/// Material parameters for creating a shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeDesc {
    /// Friction coefficient (non-negative)
    pub friction: f32,
    /// Density in mass per unit area (positive; ignored on non-dynamic bodies)
    pub density: f32,
}

impl Default for ShapeDesc {
    fn default() -> Self {
        Self {
            friction: 0.5,
            density: 1.0,
        }
    }
}

impl ShapeDesc {
    /// Set friction
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Set density
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.friction.is_finite() || self.friction < 0.0 {
            return Err(PhysicsError::InvalidParameter(format!(
                "friction must be finite and non-negative, got {}",
                self.friction
            )));
        }
        if !self.density.is_finite() || self.density <= 0.0 {
            return Err(PhysicsError::InvalidParameter(format!(
                "density must be finite and positive, got {}",
                self.density
            )));
        }
        Ok(())
    }
}

/// Mass properties contributed by one shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassData {
    /// Total mass
    pub mass: f32,
    /// Center of mass in body-local coordinates
    pub center: Vec2,
    /// Rotational inertia about the body-local origin
    pub inertia: f32,
}

/// Line segment shape, used for static boundaries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub p1: Vec2,
    pub p2: Vec2,
}

impl Segment {
    #[inline]
    pub const fn new(p1: Vec2, p2: Vec2) -> Self {
        Self { p1, p2 }
    }

    /// Segments are thin: nominal zero mass and inertia.
    pub fn mass_data(&self) -> MassData {
        MassData {
            mass: 0.0,
            center: (self.p1 + self.p2) * 0.5,
            inertia: 0.0,
        }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.p1.is_finite() && self.p2.is_finite()
    }

    /// Two-vertex polygon view so segments ride the polygon contact path.
    pub(crate) fn as_polygon(&self) -> Polygon {
        let edge = self.p2 - self.p1;
        let normal = Vec2::new(edge.y, -edge.x).normalize();

        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        vertices[0] = self.p1;
        vertices[1] = self.p2;
        normals[0] = normal;
        normals[1] = -normal;

        Polygon {
            vertices,
            normals,
            centroid: (self.p1 + self.p2) * 0.5,
            count: 2,
        }
    }
}

/// Convex polygon shape: counter-clockwise vertices with precomputed
/// outward edge normals. Convexity and winding hold by construction, so
/// instances come only from [`Polygon::new_box`], [`Polygon::from_hull`],
/// or [`Polygon::from_points`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    vertices: [Vec2; MAX_POLYGON_VERTICES],
    normals: [Vec2; MAX_POLYGON_VERTICES],
    centroid: Vec2,
    count: usize,
}

impl Polygon {
    /// Axis-aligned box centered at the local origin.
    ///
    /// Equivalent to hulling the four corners, in closed form.
    pub fn new_box(half_width: f32, half_height: f32) -> Polygon {
        debug_assert!(half_width > 0.0 && half_height > 0.0);

        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        vertices[0] = Vec2::new(-half_width, -half_height);
        vertices[1] = Vec2::new(half_width, -half_height);
        vertices[2] = Vec2::new(half_width, half_height);
        vertices[3] = Vec2::new(-half_width, half_height);
        normals[0] = Vec2::new(0.0, -1.0);
        normals[1] = Vec2::new(1.0, 0.0);
        normals[2] = Vec2::new(0.0, 1.0);
        normals[3] = Vec2::new(-1.0, 0.0);

        Polygon {
            vertices,
            normals,
            centroid: Vec2::ZERO,
            count: 4,
        }
    }

    /// Build a polygon from a computed hull.
    ///
    /// Fails with [`PhysicsError::TooManyVertices`] if the hull exceeds
    /// [`MAX_POLYGON_VERTICES`].
    pub fn from_hull(hull: &Hull) -> Result<Polygon> {
        let points = hull.points();
        if points.len() > MAX_POLYGON_VERTICES {
            return Err(PhysicsError::TooManyVertices(
                points.len(),
                MAX_POLYGON_VERTICES,
            ));
        }

        let count = points.len();
        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        vertices[..count].copy_from_slice(points);

        // Outward normal of a CCW edge is the edge rotated clockwise.
        for i in 0..count {
            let edge = vertices[(i + 1) % count] - vertices[i];
            normals[i] = Vec2::new(edge.y, -edge.x).normalize();
        }

        let mut area_sum = 0.0;
        let mut centroid = Vec2::ZERO;
        for i in 0..count {
            let a = vertices[i];
            let b = vertices[(i + 1) % count];
            let cross = a.cross(b);
            area_sum += cross;
            centroid += (a + b) * cross;
        }
        let centroid = centroid / (3.0 * area_sum);

        Ok(Polygon {
            vertices,
            normals,
            centroid,
            count,
        })
    }

    /// Hull arbitrary points and build the polygon in one call.
    pub fn from_points(points: &[Vec2]) -> Result<Polygon> {
        let hull = Hull::compute(points)?;
        Self::from_hull(&hull)
    }

    /// Number of vertices.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Vertices, counter-clockwise.
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices[..self.count]
    }

    /// Outward edge normals; normal `i` belongs to edge `i -> i+1`.
    pub fn normals(&self) -> &[Vec2] {
        &self.normals[..self.count]
    }

    /// Area centroid in local coordinates.
    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.vertices().iter().all(|v| v.is_finite())
    }

    /// Density-weighted mass, center, and inertia (about the local origin).
    pub fn mass_data(&self, density: f32) -> MassData {
        let mut area_sum = 0.0;
        let mut inertia_sum = 0.0;
        for i in 0..self.count {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % self.count];
            let cross = a.cross(b);
            area_sum += cross;
            inertia_sum += cross * (a.dot(a) + a.dot(b) + b.dot(b));
        }

        let area = 0.5 * area_sum;
        MassData {
            mass: density * area,
            center: self.centroid,
            inertia: density * inertia_sum / 12.0,
        }
    }
}

/// Shape record owned by a body
#[derive(Debug, Clone, Copy)]
pub(crate) struct Shape {
    pub body: BodyHandle,
    pub geometry: ShapeGeometry,
    pub friction: f32,
    pub density: f32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ShapeGeometry {
    Segment(Segment),
    Polygon(Polygon),
}

impl Shape {
    pub fn mass_data(&self) -> MassData {
        match &self.geometry {
            ShapeGeometry::Segment(segment) => segment.mass_data(),
            ShapeGeometry::Polygon(polygon) => polygon.mass_data(self.density),
        }
    }

    /// Uniform polygon view for the contact pipeline.
    pub fn as_polygon(&self) -> Polygon {
        match &self.geometry {
            ShapeGeometry::Segment(segment) => segment.as_polygon(),
            ShapeGeometry::Polygon(polygon) => *polygon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_box_corners() {
        let polygon = Polygon::new_box(0.5, 0.25);
        assert_eq!(polygon.count(), 4);
        assert_eq!(
            polygon.vertices(),
            &[
                Vec2::new(-0.5, -0.25),
                Vec2::new(0.5, -0.25),
                Vec2::new(0.5, 0.25),
                Vec2::new(-0.5, 0.25),
            ]
        );
        assert_eq!(polygon.centroid(), Vec2::ZERO);
    }

    #[test]
    fn test_new_box_matches_hull_of_corners() {
        let polygon = Polygon::new_box(0.5, 0.5);
        let hulled = Polygon::from_points(&[
            Vec2::new(0.5, 0.5),
            Vec2::new(-0.5, 0.5),
            Vec2::new(0.5, -0.5),
            Vec2::new(-0.5, -0.5),
        ])
        .unwrap();
        assert_eq!(polygon.vertices(), hulled.vertices());
        assert_eq!(polygon.normals(), hulled.normals());
    }

    #[test]
    fn test_normals_point_outward() {
        let polygon = Polygon::from_points(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 2.0),
        ])
        .unwrap();
        let centroid = polygon.centroid();
        for (i, normal) in polygon.normals().iter().enumerate() {
            let mid =
                (polygon.vertices()[i] + polygon.vertices()[(i + 1) % polygon.count()]) * 0.5;
            assert!(
                normal.dot(mid - centroid) > 0.0,
                "normal {} points inward",
                i
            );
            assert_relative_eq!(normal.length(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_from_hull_too_many_vertices() {
        let mut points = Vec::new();
        for i in 0..10 {
            let a = (i as f32) * std::f32::consts::TAU / 10.0;
            points.push(Vec2::new(a.cos(), a.sin()));
        }
        let hull = Hull::compute(&points).unwrap();
        assert_eq!(hull.count(), 10);
        assert!(matches!(
            Polygon::from_hull(&hull),
            Err(PhysicsError::TooManyVertices(10, MAX_POLYGON_VERTICES))
        ));
    }

    #[test]
    fn test_box_mass_data() {
        let polygon = Polygon::new_box(0.5, 0.5);
        let data = polygon.mass_data(1.0);
        assert_relative_eq!(data.mass, 1.0, epsilon = 1e-6);
        assert_relative_eq!(data.inertia, 1.0 / 6.0, epsilon = 1e-6);
        assert_eq!(data.center, Vec2::ZERO);
    }

    #[test]
    fn test_offset_polygon_mass_data() {
        // Unit box shifted to be centered at (2, 0): same mass, inertia
        // about the origin grows by the parallel-axis term m*d^2.
        let polygon = Polygon::from_points(&[
            Vec2::new(1.5, -0.5),
            Vec2::new(2.5, -0.5),
            Vec2::new(2.5, 0.5),
            Vec2::new(1.5, 0.5),
        ])
        .unwrap();
        let data = polygon.mass_data(1.0);
        assert_relative_eq!(data.mass, 1.0, epsilon = 1e-5);
        assert_relative_eq!(data.center.x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(data.center.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(data.inertia, 1.0 / 6.0 + 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_segment_has_no_mass() {
        let segment = Segment::new(Vec2::new(-66.0, 0.0), Vec2::new(66.0, 0.0));
        let data = segment.mass_data();
        assert_eq!(data.mass, 0.0);
        assert_eq!(data.inertia, 0.0);
        assert_eq!(data.center, Vec2::ZERO);
    }

    #[test]
    fn test_segment_polygon_view() {
        let segment = Segment::new(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0));
        let polygon = segment.as_polygon();
        assert_eq!(polygon.count(), 2);
        assert_eq!(polygon.normals()[0], Vec2::new(0.0, -1.0));
        assert_eq!(polygon.normals()[1], Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_desc_validation() {
        assert!(ShapeDesc::default().validate().is_ok());
        assert!(matches!(
            ShapeDesc::default().with_friction(-0.1).validate(),
            Err(PhysicsError::InvalidParameter(_))
        ));
        assert!(matches!(
            ShapeDesc::default().with_density(0.0).validate(),
            Err(PhysicsError::InvalidParameter(_))
        ));
        assert!(matches!(
            ShapeDesc::default().with_density(f32::NAN).validate(),
            Err(PhysicsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_from_points_degenerate() {
        assert!(matches!(
            Polygon::from_points(&[Vec2::ZERO, Vec2::X]),
            Err(PhysicsError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_desc_serde_roundtrip() {
        let desc = ShapeDesc::default().with_friction(0.8).with_density(2.5);
        let json = serde_json::to_string(&desc).unwrap();
        let back: ShapeDesc = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }
}
