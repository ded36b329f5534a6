//! Planes and segment-plane intersection.

use roomsim_math::{Dir3, Point2, Point3, Tolerance, Vec3};

use crate::error::{GeometryError, Result};
use crate::intersection::Intersection;

/// An infinite plane defined by an origin point and a coordinate frame.
///
/// Parameterization: `P(u, v) = origin + u * x_dir + v * y_dir`, with
/// `normal_dir = x_dir × y_dir`.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    /// Origin point on the plane.
    pub origin: Point3,
    /// Unit vector along the u direction.
    pub x_dir: Dir3,
    /// Unit vector along the v direction.
    pub y_dir: Dir3,
    /// Unit normal (x_dir × y_dir).
    pub normal_dir: Dir3,
}

impl Plane {
    /// Create a plane from an origin, a normal, and a hint for the u axis.
    ///
    /// The hint is projected into the plane; it must not be parallel to the normal.
    pub fn from_normal_and_x(origin: Point3, normal: Vec3, x_hint: Vec3) -> Result<Self> {
        let n = Dir3::try_new(normal, f64::EPSILON).ok_or(GeometryError::ZeroLengthVector)?;
        let in_plane = x_hint - x_hint.dot(n.as_ref()) * n.as_ref();
        let x = Dir3::try_new(in_plane, f64::EPSILON).ok_or(GeometryError::ZeroLengthVector)?;
        let y = Dir3::new_normalize(n.as_ref().cross(x.as_ref()));
        Ok(Self {
            origin,
            x_dir: x,
            y_dir: y,
            normal_dir: n,
        })
    }

    /// Create a plane from origin and normal. X/Y directions are chosen arbitrarily.
    pub fn from_normal(origin: Point3, normal: Vec3) -> Result<Self> {
        let arbitrary = if normal.x.abs() < 0.9 * normal.norm() {
            Vec3::x()
        } else {
            Vec3::y()
        };
        Self::from_normal_and_x(origin, normal, arbitrary)
    }

    /// XY plane at the origin.
    pub fn xy() -> Self {
        Self {
            origin: Point3::origin(),
            x_dir: Vec3::x_axis(),
            y_dir: Vec3::y_axis(),
            normal_dir: Vec3::z_axis(),
        }
    }

    /// Project a 3D point onto this plane's (u, v) parameter space.
    pub fn project(&self, p: &Point3) -> Point2 {
        let d = p - self.origin;
        Point2::new(d.dot(self.x_dir.as_ref()), d.dot(self.y_dir.as_ref()))
    }

    /// Map (u, v) coordinates back to 3D.
    pub fn lift(&self, uv: &Point2) -> Point3 {
        self.origin + uv.x * self.x_dir.as_ref() + uv.y * self.y_dir.as_ref()
    }

    /// Signed distance from a point to this plane.
    pub fn signed_distance(&self, p: &Point3) -> f64 {
        (p - self.origin).dot(self.normal_dir.as_ref())
    }

    /// Mirror image of a point across this plane.
    pub fn reflect(&self, p: &Point3) -> Point3 {
        p - 2.0 * self.signed_distance(p) * self.normal_dir.as_ref()
    }

    /// Intersect a segment with this plane.
    pub fn intersect_segment(
        &self,
        a1: &Point3,
        a2: &Point3,
        tol: &Tolerance,
    ) -> Result<Intersection<Point3>> {
        segment_plane_intersection(a1, a2, &self.origin, self.normal_dir.as_ref(), tol)
    }
}

/// Intersect the segment `[a1, a2]` with the plane through `origin` with
/// normal `normal` (need not be unit length).
///
/// - Both endpoints within `eps` of the plane (the segment lies in it) or on
///   the same side: [`Intersection::None`]. This covers parallel segments.
/// - One endpoint within `eps` of the plane: [`Intersection::Endpoint`] at
///   that endpoint.
/// - Otherwise: [`Intersection::Proper`].
pub fn segment_plane_intersection(
    a1: &Point3,
    a2: &Point3,
    origin: &Point3,
    normal: &Vec3,
    tol: &Tolerance,
) -> Result<Intersection<Point3>> {
    let n = Dir3::try_new(*normal, f64::EPSILON).ok_or(GeometryError::ZeroLengthVector)?;
    if (a2 - a1).norm() < tol.eps {
        return Err(GeometryError::DegenerateSegment { eps: tol.eps });
    }

    let d1 = (a1 - origin).dot(n.as_ref());
    let d2 = (a2 - origin).dot(n.as_ref());
    let on1 = d1.abs() <= tol.eps;
    let on2 = d2.abs() <= tol.eps;

    if on1 && on2 {
        return Ok(Intersection::None);
    }
    if on1 {
        return Ok(Intersection::Endpoint(*a1));
    }
    if on2 {
        return Ok(Intersection::Endpoint(*a2));
    }
    if (d1 > 0.0) == (d2 > 0.0) {
        return Ok(Intersection::None);
    }

    let s = d1 / (d1 - d2);
    Ok(Intersection::Proper(a1 + (a2 - a1) * s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_and_lift() {
        let plane = Plane::from_normal_and_x(
            Point3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(1.0, 0.0, 0.5),
        )
        .unwrap();
        let p = Point3::new(4.0, 6.0, 3.0);
        let uv = plane.project(&p);
        assert!((uv.x - 3.0).abs() < 1e-12);
        assert!((uv.y - 4.0).abs() < 1e-12);
        assert!((plane.lift(&uv) - p).norm() < 1e-12);
    }

    #[test]
    fn test_reflect_is_involution() {
        let plane = Plane::from_normal(Point3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 1.0, 1.0)).unwrap();
        let p = Point3::new(0.3, -2.0, 5.0);
        let q = plane.reflect(&p);
        assert!((plane.signed_distance(&q) + plane.signed_distance(&p)).abs() < 1e-12);
        assert!((plane.reflect(&q) - p).norm() < 1e-12);
    }

    #[test]
    fn test_degenerate_normal() {
        assert_eq!(
            Plane::from_normal(Point3::origin(), Vec3::zeros()),
            Err(GeometryError::ZeroLengthVector)
        );
    }

    #[test]
    fn test_segment_crosses_plane() {
        let tol = Tolerance::DEFAULT;
        let hit = segment_plane_intersection(
            &Point3::new(0.0, 0.0, 5.0),
            &Point3::new(2.0, 0.0, -5.0),
            &Point3::origin(),
            &Vec3::z(),
            &tol,
        )
        .unwrap();
        match hit {
            Intersection::Proper(p) => {
                assert!((p.x - 1.0).abs() < 1e-12);
                assert!(p.z.abs() < 1e-12);
            }
            other => panic!("expected proper crossing, got {other:?}"),
        }
    }

    #[test]
    fn test_segment_plane_no_crossing() {
        let tol = Tolerance::DEFAULT;
        let plane = Plane::xy();
        let same_side = plane
            .intersect_segment(&Point3::new(0.0, 0.0, 1.0), &Point3::new(1.0, 1.0, 2.0), &tol)
            .unwrap();
        assert_eq!(same_side, Intersection::None);

        let parallel = plane
            .intersect_segment(&Point3::new(0.0, 0.0, 1.0), &Point3::new(5.0, 0.0, 1.0), &tol)
            .unwrap();
        assert_eq!(parallel, Intersection::None);

        // Lying in the plane is a degenerate no-crossing
        let inside = plane
            .intersect_segment(&Point3::new(0.0, 0.0, 1e-7), &Point3::new(5.0, 0.0, -1e-7), &tol)
            .unwrap();
        assert_eq!(inside, Intersection::None);
    }

    #[test]
    fn test_segment_plane_endpoint() {
        let tol = Tolerance::DEFAULT;
        let plane = Plane::xy();
        let hit = plane
            .intersect_segment(&Point3::new(1.0, 1.0, 3.0), &Point3::new(2.0, 2.0, 0.0), &tol)
            .unwrap();
        assert_eq!(hit, Intersection::Endpoint(Point3::new(2.0, 2.0, 0.0)));
    }
}
