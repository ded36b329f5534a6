//! Ray representation and segment construction helpers.

use nalgebra::{Point, SVector};
use roomsim_math::{Aabb3, Dir3, Point2, Point3, Vec2, Vec3};

use crate::error::{GeometryError, Result};

/// A ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Dir3,
    /// Precomputed reciprocal of direction components for fast AABB tests.
    inv_direction: Vec3,
    /// Sign of direction components (0 if positive, 1 if negative).
    sign: [usize; 3],
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction is normalized; a zero-length direction is an error.
    pub fn new(origin: Point3, direction: Vec3) -> Result<Self> {
        let dir = Dir3::try_new(direction, f64::MIN_POSITIVE).ok_or(GeometryError::ZeroLengthVector)?;
        let inv = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        let sign = [
            usize::from(inv.x < 0.0),
            usize::from(inv.y < 0.0),
            usize::from(inv.z < 0.0),
        ];
        Ok(Self {
            origin,
            direction: dir,
            inv_direction: inv,
            sign,
        })
    }

    /// Ray from `start` toward `end`.
    pub fn through(start: &Point3, end: &Point3) -> Result<Self> {
        Self::new(*start, end - start)
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction.as_ref()
    }

    /// Slab test against an axis-aligned box.
    ///
    /// Returns the entry and exit parameters `(t_min, t_max)`, or `None` when
    /// the box is behind the ray or missed. The entry is clamped to 0 when the
    /// origin is inside the box: a ray leaving a wall starts inside that
    /// wall's padded box, and callers comparing the entry with a segment
    /// length must still see it as a candidate.
    ///
    /// Axis-parallel rays produce infinite reciprocals; a `0 * inf` slab is
    /// NaN and ignored by `max`/`min`, so flat boxes (2D walls) work.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f64, f64)> {
        let bounds = [aabb.min, aabb.max];
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;
        for axis in 0..3 {
            let near = bounds[self.sign[axis]][axis];
            let far = bounds[1 - self.sign[axis]][axis];
            t_min = t_min.max((near - self.origin[axis]) * self.inv_direction[axis]);
            t_max = t_max.min((far - self.origin[axis]) * self.inv_direction[axis]);
        }
        (t_max >= t_min && t_max >= 0.0).then(|| (t_min.max(0.0), t_max))
    }
}

/// Specular continuation of a segment after a wall hit.
///
/// The incoming direction `hit - start` is mirrored about `normal` and the
/// returned point lies `length` away from `hit` along the reflected direction.
pub fn reflected_end<const D: usize>(
    start: &Point<f64, D>,
    hit: &Point<f64, D>,
    normal: &SVector<f64, D>,
    length: f64,
) -> Result<Point<f64, D>> {
    let incoming = hit - start;
    let d_norm = incoming.norm();
    let n_norm = normal.norm();
    if d_norm == 0.0 || n_norm == 0.0 {
        return Err(GeometryError::ZeroLengthVector);
    }
    let d = incoming / d_norm;
    let n = normal / n_norm;
    let r = d - n * (2.0 * d.dot(&n));
    Ok(hit + r * length)
}

/// End of a segment of `length` leaving `start` in the spherical direction
/// (`phi` azimuth from +x, `theta` colatitude from +z).
pub fn segment_end(start: &Point3, length: f64, phi: f64, theta: f64) -> Point3 {
    let dir = Vec3::new(phi.cos() * theta.sin(), phi.sin() * theta.sin(), theta.cos());
    start + dir * length
}

/// End of a planar segment of `length` leaving `start` at angle `phi` from +x.
pub fn segment_end_2d(start: &Point2, length: f64, phi: f64) -> Point2 {
    start + Vec2::new(phi.cos(), phi.sin()) * length
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn unit_box() -> Aabb3 {
        Aabb3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)).unwrap();
        let p = ray.at(5.0);
        assert!((p.x - 5.0).abs() < 1e-12);
        assert!(p.y.abs() < 1e-12);
    }

    #[test]
    fn test_ray_zero_direction() {
        assert!(matches!(
            Ray::through(&Point3::new(1.0, 1.0, 1.0), &Point3::new(1.0, 1.0, 1.0)),
            Err(GeometryError::ZeroLengthVector)
        ));
    }

    #[test]
    fn test_ray_aabb_hit() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let (t_min, t_max) = ray.intersect_aabb(&unit_box()).unwrap();
        assert!((t_min - 5.0).abs() < 1e-10);
        assert!((t_max - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_ray_aabb_miss_and_behind() {
        let ray = Ray::new(Point3::new(-5.0, 5.0, 5.0), Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(ray.intersect_aabb(&unit_box()).is_none());

        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0)).unwrap();
        assert!(ray.intersect_aabb(&unit_box()).is_none());
    }

    #[test]
    fn test_ray_inside_aabb() {
        let ray = Ray::new(Point3::new(0.5, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0)).unwrap();
        let (t_min, t_max) = ray.intersect_aabb(&unit_box()).unwrap();
        assert_eq!(t_min, 0.0);
        assert!((t_max - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_ray_flat_box() {
        // A 2D wall: zero extent in z, ray in the z = 0 plane
        let wall_box = Aabb3::new(Point3::new(2.0, -1.0, 0.0), Point3::new(2.0, 1.0, 0.0));
        let ray = Ray::new(Point3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.2, 0.0)).unwrap();
        let (t_min, _) = ray.intersect_aabb(&wall_box).unwrap();
        assert!(t_min > 1.9);
    }

    #[test]
    fn test_reflected_end() {
        // Coming down at 45°, bouncing off the floor
        let end = reflected_end(
            &Point2::new(0.0, 1.0),
            &Point2::new(1.0, 0.0),
            &Vec2::new(0.0, -1.0),
            2.0_f64.sqrt(),
        )
        .unwrap();
        assert!((end.x - 2.0).abs() < 1e-12);
        assert!((end.y - 1.0).abs() < 1e-12);

        assert!(reflected_end(
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(1.0, 0.0, 0.0),
            &Vec3::z(),
            1.0
        )
        .is_err());
    }

    #[test]
    fn test_segment_end() {
        let p = segment_end(&Point3::origin(), 2.0, FRAC_PI_2, FRAC_PI_2);
        assert!(p.x.abs() < 1e-12);
        assert!((p.y - 2.0).abs() < 1e-12);
        assert!(p.z.abs() < 1e-12);

        let q = segment_end_2d(&Point2::new(1.0, 1.0), 2.0_f64.sqrt(), FRAC_PI_4);
        assert!((q.x - 2.0).abs() < 1e-12);
        assert!((q.y - 2.0).abs() < 1e-12);
    }
}
