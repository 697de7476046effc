//! Convex hull construction from arbitrary point sets
//!
//! The hull is the validation gate for polygon shapes: every polygon that
//! is not a box shortcut passes through here, so contact generation can
//! assume strictly convex, counter-clockwise vertices.

use crate::error::{PhysicsError, Result};
use keel_math::Vec2;

/// Input points closer than this are collapsed to one point before hulling.
pub(crate) const WELD_TOLERANCE: f32 = 0.0025;

/// Convex hull of a point set: strictly convex, counter-clockwise, first
/// vertex at the lexicographic minimum. Consumed by `Polygon::from_hull`.
#[derive(Debug, Clone)]
pub struct Hull {
    points: Vec<Vec2>,
}

impl Hull {
    /// Compute the convex hull of `points`.
    ///
    /// Near-duplicates are welded within a fixed tolerance. Fails with
    /// [`PhysicsError::DegenerateGeometry`] when fewer than 3 distinct,
    /// non-collinear points remain, and [`PhysicsError::InvalidGeometry`]
    /// on non-finite input.
    pub fn compute(points: &[Vec2]) -> Result<Hull> {
        if points.len() < 3 {
            return Err(PhysicsError::DegenerateGeometry(format!(
                "hull needs at least 3 points, got {}",
                points.len()
            )));
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(PhysicsError::InvalidGeometry(
                "non-finite hull input point".to_string(),
            ));
        }

        let mut welded: Vec<Vec2> = Vec::with_capacity(points.len());
        for &p in points {
            let duplicate = welded
                .iter()
                .any(|&q| p.distance_squared(q) <= WELD_TOLERANCE * WELD_TOLERANCE);
            if !duplicate {
                welded.push(p);
            }
        }
        if welded.len() < 3 {
            log::debug!(
                "Hull rejected: {} distinct points after welding {}",
                welded.len(),
                points.len()
            );
            return Err(PhysicsError::DegenerateGeometry(format!(
                "only {} distinct points after welding",
                welded.len()
            )));
        }

        // Triangles thinner than the weld tolerance across the input span
        // count as collinear.
        let mut lo = welded[0];
        let mut hi = welded[0];
        for &p in &welded[1..] {
            lo = lo.min(p);
            hi = hi.max(p);
        }
        let span = (hi.x - lo.x).max(hi.y - lo.y);
        let area_tolerance = WELD_TOLERANCE * span;

        welded.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));

        // Monotone chain. The lower chain runs left to right, the upper
        // chain right to left; popping on cross <= tolerance keeps the
        // result strictly convex.
        let mut lower: Vec<Vec2> = Vec::with_capacity(welded.len());
        for &p in &welded {
            while lower.len() >= 2 {
                let a = lower[lower.len() - 2];
                let b = lower[lower.len() - 1];
                if (b - a).cross(p - a) <= area_tolerance {
                    lower.pop();
                } else {
                    break;
                }
            }
            lower.push(p);
        }

        let mut upper: Vec<Vec2> = Vec::with_capacity(welded.len());
        for &p in welded.iter().rev() {
            while upper.len() >= 2 {
                let a = upper[upper.len() - 2];
                let b = upper[upper.len() - 1];
                if (b - a).cross(p - a) <= area_tolerance {
                    upper.pop();
                } else {
                    break;
                }
            }
            upper.push(p);
        }

        // Chain endpoints overlap; drop them before joining.
        lower.pop();
        upper.pop();
        lower.extend(upper);

        if lower.len() < 3 {
            log::debug!("Hull rejected: input is collinear");
            return Err(PhysicsError::DegenerateGeometry(
                "points are collinear".to_string(),
            ));
        }

        Ok(Hull { points: lower })
    }

    /// Hull vertices, counter-clockwise.
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Number of hull vertices.
    pub fn count(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ccw_convex(points: &[Vec2]) {
        let n = points.len();
        for i in 0..n {
            let a = points[i];
            let b = points[(i + 1) % n];
            let c = points[(i + 2) % n];
            assert!(
                (b - a).cross(c - b) > 0.0,
                "vertices not strictly convex CCW at {}: {:?}",
                i,
                points
            );
        }
    }

    #[test]
    fn test_hull_of_square() {
        let points = [
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
        ];
        let hull = Hull::compute(&points).unwrap();
        assert_eq!(hull.count(), 4);
        assert_ccw_convex(hull.points());
    }

    #[test]
    fn test_hull_drops_interior_points() {
        let points = [
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(0.25, -0.5),
        ];
        let hull = Hull::compute(&points).unwrap();
        assert_eq!(hull.count(), 4);
        assert_ccw_convex(hull.points());
    }

    #[test]
    fn test_hull_idempotent() {
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.5),
            Vec2::new(3.0, 2.0),
            Vec2::new(1.5, 3.5),
            Vec2::new(-0.5, 2.0),
            Vec2::new(1.0, 1.0),
        ];
        let hull = Hull::compute(&points).unwrap();
        let rehull = Hull::compute(hull.points()).unwrap();
        assert_eq!(rehull.points(), hull.points());
    }

    #[test]
    fn test_hull_too_few_points() {
        let points = [Vec2::ZERO, Vec2::X];
        assert!(matches!(
            Hull::compute(&points),
            Err(PhysicsError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_hull_collinear_points() {
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(3.0, 3.0),
        ];
        assert!(matches!(
            Hull::compute(&points),
            Err(PhysicsError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_hull_welds_duplicates() {
        // Three distinct locations, one duplicated within tolerance.
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0005, 0.0005),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
        ];
        let hull = Hull::compute(&points).unwrap();
        assert_eq!(hull.count(), 3);
    }

    #[test]
    fn test_hull_all_duplicates() {
        let points = [Vec2::ZERO, Vec2::new(0.0001, 0.0), Vec2::new(0.0, 0.0001)];
        assert!(matches!(
            Hull::compute(&points),
            Err(PhysicsError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_hull_rejects_nan() {
        let points = [Vec2::new(f32::NAN, 0.0), Vec2::X, Vec2::Y];
        assert!(matches!(
            Hull::compute(&points),
            Err(PhysicsError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_hull_octagon_keeps_all_vertices() {
        let mut points = Vec::new();
        for i in 0..8 {
            let a = (i as f32) * std::f32::consts::PI / 4.0;
            points.push(Vec2::new(a.cos(), a.sin()));
        }
        let hull = Hull::compute(&points).unwrap();
        assert_eq!(hull.count(), 8);
        assert_ccw_convex(hull.points());
    }
}
