//! Narrow-phase contact generation
//!
//! Convex-convex manifolds from a separating-axis test over face normals,
//! then clipping the incident edge against the reference face. Segments
//! enter this path through their two-vertex polygon view.

use keel_math::{Transform2, Vec2};

use crate::config::{LINEAR_SLOP, SPECULATIVE_DISTANCE};
use crate::shape::Polygon;

/// One contact point in a manifold.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ManifoldPoint {
    /// Contact position in world space
    pub point: Vec2,
    /// Signed distance along the normal; negative means penetration
    pub separation: f32,
}

/// Contact manifold between two shapes.
///
/// The normal points from the first shape toward the second, in world
/// space. Up to two points describe face-face overlap.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Manifold {
    pub points: [ManifoldPoint; 2],
    pub count: usize,
    pub normal: Vec2,
}

/// Greatest separation of `b` from the face planes of `a`, and the face
/// index that produced it. Negative means the shapes overlap along every
/// tested axis of `a`.
fn find_max_separation(
    a: &Polygon,
    xf_a: Transform2,
    b: &Polygon,
    xf_b: Transform2,
) -> (f32, usize) {
    let mut best_separation = f32::NEG_INFINITY;
    let mut best_face = 0;

    for (i, &local_normal) in a.normals().iter().enumerate() {
        let normal = xf_a.transform_vector(local_normal);
        let face_point = xf_a.transform_point(a.vertices()[i]);

        // Deepest vertex of B along -normal, found in B's local frame.
        let direction = xf_b.q.inverse_rotate(normal);
        let mut support = b.vertices()[0];
        let mut min_projection = support.dot(direction);
        for &v in &b.vertices()[1..] {
            let projection = v.dot(direction);
            if projection < min_projection {
                min_projection = projection;
                support = v;
            }
        }

        let separation = normal.dot(xf_b.transform_point(support) - face_point);
        if separation > best_separation {
            best_separation = separation;
            best_face = i;
        }
    }

    (best_separation, best_face)
}

/// World-space endpoints of the incident edge: the face of `inc` most
/// anti-parallel to the reference face normal.
fn find_incident_edge(reference_normal: Vec2, inc: &Polygon, xf_inc: Transform2) -> [Vec2; 2] {
    let local_normal = xf_inc.q.inverse_rotate(reference_normal);

    let mut incident_face = 0;
    let mut min_dot = f32::MAX;
    for (i, &normal) in inc.normals().iter().enumerate() {
        let dot = local_normal.dot(normal);
        if dot < min_dot {
            min_dot = dot;
            incident_face = i;
        }
    }

    let i1 = incident_face;
    let i2 = (incident_face + 1) % inc.count();
    [
        xf_inc.transform_point(inc.vertices()[i1]),
        xf_inc.transform_point(inc.vertices()[i2]),
    ]
}

/// Clip an edge against the half-plane `normal . p <= offset`, keeping
/// the crossing point when the endpoints straddle the plane.
///
/// Returns the number of points kept; fewer than two means the edge lies
/// outside the plane.
fn clip_edge(points: &mut [Vec2; 2], normal: Vec2, offset: f32) -> usize {
    let distance0 = normal.dot(points[0]) - offset;
    let distance1 = normal.dot(points[1]) - offset;

    let mut out = *points;
    let mut count = 0;

    if distance0 <= 0.0 {
        out[count] = points[0];
        count += 1;
    }
    if distance1 <= 0.0 {
        out[count] = points[1];
        count += 1;
    }

    if distance0 * distance1 < 0.0 {
        let t = distance0 / (distance0 - distance1);
        out[count] = points[0] + (points[1] - points[0]) * t;
        count += 1;
    }

    *points = out;
    count
}

/// Collide two convex polygons, producing up to two contact points.
///
/// Shapes separated by more than [`SPECULATIVE_DISTANCE`] produce an
/// empty manifold. Points inside the margin but not yet touching carry a
/// positive separation so the solver can brake approach velocity before
/// impact instead of discovering the hit a step late.
pub(crate) fn collide_polygons(
    a: &Polygon,
    xf_a: Transform2,
    b: &Polygon,
    xf_b: Transform2,
) -> Manifold {
    let mut manifold = Manifold::default();

    let (separation_a, face_a) = find_max_separation(a, xf_a, b, xf_b);
    if separation_a > SPECULATIVE_DISTANCE {
        return manifold;
    }
    let (separation_b, face_b) = find_max_separation(b, xf_b, a, xf_a);
    if separation_b > SPECULATIVE_DISTANCE {
        return manifold;
    }

    // Tolerance keeps the reference face stable when the two candidate
    // axes are nearly tied, so the manifold does not flicker between
    // frames.
    let (reference, xf_ref, incident, xf_inc, reference_face, flip) =
        if separation_b > separation_a + 0.1 * LINEAR_SLOP {
            (b, xf_b, a, xf_a, face_b, true)
        } else {
            (a, xf_a, b, xf_b, face_a, false)
        };

    let i1 = reference_face;
    let i2 = (reference_face + 1) % reference.count();
    let v1 = xf_ref.transform_point(reference.vertices()[i1]);
    let v2 = xf_ref.transform_point(reference.vertices()[i2]);

    let tangent = (v2 - v1).normalize();
    let face_normal = Vec2::new(tangent.y, -tangent.x);
    let face_offset = face_normal.dot(v1);
    let neg_side = -tangent.dot(v1);
    let pos_side = tangent.dot(v2);

    let mut incident_edge = find_incident_edge(face_normal, incident, xf_inc);

    // Losing a point against either side plane is a degenerate float
    // case; report no contact rather than a one-sided manifold.
    if clip_edge(&mut incident_edge, -tangent, neg_side) < 2 {
        return manifold;
    }
    if clip_edge(&mut incident_edge, tangent, pos_side) < 2 {
        return manifold;
    }

    manifold.normal = if flip { -face_normal } else { face_normal };

    for point in incident_edge {
        let separation = face_normal.dot(point) - face_offset;
        if separation <= SPECULATIVE_DISTANCE {
            manifold.points[manifold.count] = ManifoldPoint { point, separation };
            manifold.count += 1;
        }
    }

    manifold
}
