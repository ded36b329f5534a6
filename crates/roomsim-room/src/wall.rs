//! Planar reflecting surfaces.

use nalgebra::DMatrix;
use roomsim_geom::{
    point_in_polygon, polygon_area, segment_intersection_2d, segment_plane_intersection,
    Intersection, Plane, PolygonLocation,
};
use roomsim_math::{Aabb3, Dim, Dir3, Point2, Point3, Tolerance, Vec3};

use crate::error::{Result, RoomError};

/// Position of a point relative to a wall's plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// On the side the normal points to (outside the room).
    Front,
    /// Opposite the normal (inside the room).
    Back,
    /// Within `eps` of the plane.
    On,
}

/// A wall of a room.
///
/// In 2D a wall is a segment, in 3D a planar polygon. The normal is derived
/// from the corner order and points out of the room when walls are listed
/// counter-clockwise (2D) or with the right-hand rule pointing outward (3D).
///
/// Geometry is fixed at construction; only the absorption and scattering
/// coefficients and the name can change afterwards.
#[derive(Debug, Clone)]
pub struct Wall {
    dim: Dim,
    corners: Vec<Point3>,
    absorption: f64,
    scattering: f64,
    name: Option<String>,
    /// Frame with origin at the first corner and `x_dir` along the first edge.
    plane: Plane,
    flat_corners: Vec<Point2>,
    aabb: Aabb3,
    tol: Tolerance,
}

fn check_coefficient(name: &'static str, value: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&value) {
        return Err(RoomError::InvalidCoefficient { name, value });
    }
    Ok(value)
}

/// Newell normal of a closed polygon. Its length is twice the polygon area.
fn newell_normal(corners: &[Point3]) -> Vec3 {
    let c0 = corners[0];
    let mut n = Vec3::zeros();
    for i in 1..corners.len() - 1 {
        n += (corners[i] - c0).cross(&(corners[i + 1] - c0));
    }
    n
}

impl Wall {
    /// Segment wall from `start` to `end`.
    pub fn new_2d(start: Point2, end: Point2, absorption: f64) -> Result<Self> {
        Self::new_2d_with_tolerance(start, end, absorption, Tolerance::default())
    }

    /// Segment wall with an explicit tolerance.
    pub fn new_2d_with_tolerance(
        start: Point2,
        end: Point2,
        absorption: f64,
        tol: Tolerance,
    ) -> Result<Self> {
        let absorption = check_coefficient("absorption", absorption)?;
        let c0 = Point3::new(start.x, start.y, 0.0);
        let c1 = Point3::new(end.x, end.y, 0.0);
        let edge = c1 - c0;
        if edge.norm() < tol.eps {
            return Err(RoomError::DegenerateWall(format!(
                "coincident endpoints at ({}, {})",
                start.x, start.y
            )));
        }

        let normal = Vec3::new(edge.y, -edge.x, 0.0);
        let plane = Plane::from_normal_and_x(c0, normal, edge)?;
        let corners = vec![c0, c1];
        let flat_corners = corners.iter().map(|c| plane.project(c)).collect();
        let mut aabb = Aabb3::from_points(corners.iter());
        aabb.expand(tol.eps);

        Ok(Self {
            dim: Dim::Two,
            corners,
            absorption,
            scattering: 0.0,
            name: None,
            plane,
            flat_corners,
            aabb,
            tol,
        })
    }

    /// Planar polygon wall.
    pub fn new_3d(corners: Vec<Point3>, absorption: f64) -> Result<Self> {
        Self::new_3d_with_tolerance(corners, absorption, Tolerance::default())
    }

    /// Planar polygon wall with an explicit tolerance.
    pub fn new_3d_with_tolerance(
        corners: Vec<Point3>,
        absorption: f64,
        tol: Tolerance,
    ) -> Result<Self> {
        let absorption = check_coefficient("absorption", absorption)?;
        if corners.len() < 3 {
            return Err(RoomError::DegenerateWall(format!(
                "{} corners, need at least 3",
                corners.len()
            )));
        }

        let normal = newell_normal(&corners);
        if 0.5 * normal.norm() < tol.eps * tol.eps {
            return Err(RoomError::DegenerateWall("zero area".into()));
        }
        let first_edge = corners[1] - corners[0];
        if first_edge.norm() < tol.eps {
            return Err(RoomError::DegenerateWall("repeated first corner".into()));
        }
        let plane = Plane::from_normal_and_x(corners[0], normal, first_edge)?;

        for (i, c) in corners.iter().enumerate() {
            let d = plane.signed_distance(c);
            if d.abs() > tol.eps {
                return Err(RoomError::DegenerateWall(format!(
                    "corner {i} is {d} off the wall plane"
                )));
            }
        }

        let flat_corners = corners.iter().map(|c| plane.project(c)).collect();
        let mut aabb = Aabb3::from_points(corners.iter());
        aabb.expand(tol.eps);

        Ok(Self {
            dim: Dim::Three,
            corners,
            absorption,
            scattering: 0.0,
            name: None,
            plane,
            flat_corners,
            aabb,
            tol,
        })
    }

    /// Wall from a corner matrix (rows = coordinates, columns = corners).
    ///
    /// Two rows give a segment (exactly two columns), three rows a polygon.
    pub fn from_matrix(corners: &DMatrix<f64>, absorption: f64, name: Option<&str>) -> Result<Self> {
        Self::from_matrix_with_tolerance(corners, absorption, name, Tolerance::default())
    }

    /// [`Wall::from_matrix`] with an explicit tolerance.
    pub fn from_matrix_with_tolerance(
        corners: &DMatrix<f64>,
        absorption: f64,
        name: Option<&str>,
        tol: Tolerance,
    ) -> Result<Self> {
        let wall = match corners.nrows() {
            2 => {
                if corners.ncols() != 2 {
                    return Err(RoomError::DegenerateWall(format!(
                        "2D wall needs 2 endpoints, got {}",
                        corners.ncols()
                    )));
                }
                let start = Point2::new(corners[(0, 0)], corners[(1, 0)]);
                let end = Point2::new(corners[(0, 1)], corners[(1, 1)]);
                Self::new_2d_with_tolerance(start, end, absorption, tol)?
            }
            3 => {
                let pts = corners
                    .column_iter()
                    .map(|c| Point3::new(c[0], c[1], c[2]))
                    .collect();
                Self::new_3d_with_tolerance(pts, absorption, tol)?
            }
            n => {
                return Err(RoomError::DegenerateWall(format!(
                    "unsupported dimension {n}"
                )))
            }
        };
        Ok(match name {
            Some(name) => wall.with_name(name),
            None => wall,
        })
    }

    /// Set the name tag.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the scattering coefficient.
    pub fn with_scattering(mut self, scattering: f64) -> Result<Self> {
        self.set_scattering(scattering)?;
        Ok(self)
    }

    /// Dimension of the wall.
    pub fn dim(&self) -> Dim {
        self.dim
    }

    /// Corners in room coordinates (`z = 0` in 2D).
    pub fn corners(&self) -> &[Point3] {
        &self.corners
    }

    /// Corners in the wall's local frame.
    pub fn flat_corners(&self) -> &[Point2] {
        &self.flat_corners
    }

    /// First corner.
    pub fn origin(&self) -> &Point3 {
        &self.plane.origin
    }

    /// Unit normal, pointing out of the room.
    pub fn normal(&self) -> &Dir3 {
        &self.plane.normal_dir
    }

    /// Orthonormal in-plane basis. The first vector follows the first edge.
    pub fn basis(&self) -> (&Dir3, &Dir3) {
        (&self.plane.x_dir, &self.plane.y_dir)
    }

    /// Supporting plane with the wall's local frame.
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Bounding box, padded by the tolerance.
    pub fn aabb(&self) -> &Aabb3 {
        &self.aabb
    }

    /// Tolerance captured at construction.
    pub fn tolerance(&self) -> Tolerance {
        self.tol
    }

    /// Energy absorption coefficient.
    pub fn absorption(&self) -> f64 {
        self.absorption
    }

    /// Fraction of reflected energy that is scattered diffusely.
    pub fn scattering(&self) -> f64 {
        self.scattering
    }

    /// Optional name tag.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Change the absorption coefficient.
    pub fn set_absorption(&mut self, absorption: f64) -> Result<()> {
        self.absorption = check_coefficient("absorption", absorption)?;
        Ok(())
    }

    /// Change the scattering coefficient.
    pub fn set_scattering(&mut self, scattering: f64) -> Result<()> {
        self.scattering = check_coefficient("scattering", scattering)?;
        Ok(())
    }

    /// Change or clear the name tag.
    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    /// Length (2D) or area (3D).
    pub fn area(&self) -> f64 {
        match self.dim {
            Dim::Two => (self.corners[1] - self.corners[0]).norm(),
            Dim::Three => polygon_area(&self.flat_corners).abs(),
        }
    }

    /// Intersect the segment `[a, b]` with the wall.
    ///
    /// [`Intersection::Endpoint`] means the wall is touched at `a` or `b`;
    /// it takes precedence over [`Intersection::Boundary`], which means the
    /// segment crosses the wall's edge (or, in 2D, runs along the wall).
    pub fn intersection(&self, a: &Point3, b: &Point3) -> Result<Intersection<Point3>> {
        match self.dim {
            Dim::Two => {
                let hit = segment_intersection_2d(
                    &Point2::new(a.x, a.y),
                    &Point2::new(b.x, b.y),
                    &self.flat_xy(0),
                    &self.flat_xy(1),
                    &self.tol,
                )?;
                Ok(hit.map(|p| Point3::new(p.x, p.y, 0.0)))
            }
            Dim::Three => {
                let hit = segment_plane_intersection(
                    a,
                    b,
                    &self.plane.origin,
                    self.plane.normal_dir.as_ref(),
                    &self.tol,
                )?;
                let Some(p) = hit.point() else {
                    return Ok(Intersection::None);
                };
                let at_end = matches!(hit, Intersection::Endpoint(_));
                let location = point_in_polygon(&self.plane.project(&p), &self.flat_corners, &self.tol)?;
                Ok(match location {
                    PolygonLocation::Outside => Intersection::None,
                    _ if at_end => Intersection::Endpoint(p),
                    PolygonLocation::OnBoundary => Intersection::Boundary(p),
                    PolygonLocation::Inside => Intersection::Proper(p),
                })
            }
        }
    }

    /// Whether the segment `[a, b]` meets the wall at all.
    pub fn intersects(&self, a: &Point3, b: &Point3) -> Result<bool> {
        Ok(self.intersection(a, b)?.is_hit())
    }

    /// Classify a point against the wall's plane.
    pub fn side(&self, p: &Point3) -> Side {
        let d = self.plane.signed_distance(p);
        if d > self.tol.eps {
            Side::Front
        } else if d < -self.tol.eps {
            Side::Back
        } else {
            Side::On
        }
    }

    /// Mirror a point across the wall's plane.
    pub fn reflect(&self, p: &Point3) -> Point3 {
        self.plane.reflect(p)
    }

    /// Structural equality: same dimension, same corners up to a cyclic
    /// shift or reversal, and same absorption (all within `eps`).
    pub fn same_as(&self, other: &Wall) -> bool {
        if self.dim != other.dim || self.corners.len() != other.corners.len() {
            return false;
        }
        if (self.absorption - other.absorption).abs() > self.tol.eps {
            return false;
        }

        let n = self.corners.len();
        let eq = |i: usize, j: usize| self.tol.points_equal(&self.corners[i], &other.corners[j]);
        (0..n).any(|shift| {
            let forward = (0..n).all(|i| eq(i, (i + shift) % n));
            let backward = (0..n).all(|i| eq(i, (shift + n - i) % n));
            forward || backward
        })
    }

    /// Whether `p` lies on the wall (within `eps`).
    pub fn touches(&self, p: &Point3) -> bool {
        match self.dim {
            Dim::Two => self.distance_to_edges(p) <= self.tol.eps,
            Dim::Three => {
                self.side(p) == Side::On
                    && point_in_polygon(&self.plane.project(p), &self.flat_corners, &self.tol)
                        .map(|loc| loc != PolygonLocation::Outside)
                        .unwrap_or(false)
            }
        }
    }

    /// Polygon edges as corner pairs. A 2D wall is its own single edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point3, Point3)> + '_ {
        let n = self.corners.len();
        let count = match self.dim {
            Dim::Two => 1,
            Dim::Three => n,
        };
        (0..count).map(move |i| (self.corners[i], self.corners[(i + 1) % n]))
    }

    /// Distance from `p` to the nearest edge of the wall.
    pub fn distance_to_edges(&self, p: &Point3) -> f64 {
        self.edges()
            .map(|(a, b)| {
                let ab = b - a;
                let t = ((p - a).dot(&ab) / ab.norm_squared()).clamp(0.0, 1.0);
                (p - (a + ab * t)).norm()
            })
            .fold(f64::INFINITY, f64::min)
    }

    fn flat_xy(&self, i: usize) -> Point2 {
        Point2::new(self.corners[i].x, self.corners[i].y)
    }
}
