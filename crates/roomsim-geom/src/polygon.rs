//! Planar polygon queries.

use roomsim_math::{Point2, Tolerance};

use crate::error::{GeometryError, Result};
use crate::orientation::cross3;

/// Where a point lies relative to a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonLocation {
    /// Strictly inside.
    Inside,
    /// Strictly outside.
    Outside,
    /// Within `eps` of an edge or a vertex.
    OnBoundary,
}

/// Point-in-polygon test using the winding number algorithm.
///
/// Works for both convex and concave polygons, in either orientation. The
/// boundary is checked first: a point closer than `eps` to any edge reports
/// [`PolygonLocation::OnBoundary`].
pub fn point_in_polygon(p: &Point2, polygon: &[Point2], tol: &Tolerance) -> Result<PolygonLocation> {
    let n = polygon.len();
    if n < 3 {
        return Err(GeometryError::DegeneratePolygon(format!(
            "{n} vertices, need at least 3"
        )));
    }

    for i in 0..n {
        if distance_to_edge(p, &polygon[i], &polygon[(i + 1) % n]) <= tol.eps {
            return Ok(PolygonLocation::OnBoundary);
        }
    }

    let mut winding = 0i32;
    for i in 0..n {
        let p1 = polygon[i];
        let p2 = polygon[(i + 1) % n];

        if p1.y <= p.y {
            if p2.y > p.y && cross3(&p1, &p2, p) > 0.0 {
                // upward crossing
                winding += 1;
            }
        } else if p2.y <= p.y && cross3(&p1, &p2, p) < 0.0 {
            // downward crossing
            winding -= 1;
        }
    }

    Ok(if winding != 0 {
        PolygonLocation::Inside
    } else {
        PolygonLocation::Outside
    })
}

/// Signed area of a simple polygon (shoelace formula).
///
/// Positive for counter-clockwise vertex order. Fewer than 3 vertices give 0.
pub fn polygon_area(polygon: &[Point2]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let a = polygon[i];
            let b = polygon[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    0.5 * twice
}

/// Distance from a point to the closed segment `[a, b]`.
fn distance_to_edge(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_point_in_polygon_square() {
        let tol = Tolerance::DEFAULT;
        let sq = square();
        assert_eq!(
            point_in_polygon(&Point2::new(0.5, 0.5), &sq, &tol).unwrap(),
            PolygonLocation::Inside
        );
        assert_eq!(
            point_in_polygon(&Point2::new(1.5, 0.5), &sq, &tol).unwrap(),
            PolygonLocation::Outside
        );
        assert_eq!(
            point_in_polygon(&Point2::new(1.0, 0.3), &sq, &tol).unwrap(),
            PolygonLocation::OnBoundary
        );
        assert_eq!(
            point_in_polygon(&Point2::new(0.0, 0.0), &sq, &tol).unwrap(),
            PolygonLocation::OnBoundary
        );
    }

    #[test]
    fn test_point_in_polygon_clockwise() {
        let tol = Tolerance::DEFAULT;
        let mut sq = square();
        sq.reverse();
        assert_eq!(
            point_in_polygon(&Point2::new(0.25, 0.75), &sq, &tol).unwrap(),
            PolygonLocation::Inside
        );
    }

    #[test]
    fn test_point_in_polygon_concave() {
        let tol = Tolerance::DEFAULT;
        // L-shaped polygon
        let l_shape = vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ];
        assert_eq!(
            point_in_polygon(&Point2::new(0.5, 1.5), &l_shape, &tol).unwrap(),
            PolygonLocation::Inside
        );
        // In the concave notch
        assert_eq!(
            point_in_polygon(&Point2::new(1.5, 1.5), &l_shape, &tol).unwrap(),
            PolygonLocation::Outside
        );
    }

    #[test]
    fn test_point_in_polygon_too_few_vertices() {
        let tol = Tolerance::DEFAULT;
        let seg = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert!(matches!(
            point_in_polygon(&Point2::new(0.5, 0.0), &seg, &tol),
            Err(GeometryError::DegeneratePolygon(_))
        ));
    }

    #[test]
    fn test_polygon_area_sign() {
        let mut sq = square();
        assert!((polygon_area(&sq) - 1.0).abs() < 1e-12);
        sq.reverse();
        assert!((polygon_area(&sq) + 1.0).abs() < 1e-12);
        assert_eq!(polygon_area(&sq[..2]), 0.0);
    }
}
