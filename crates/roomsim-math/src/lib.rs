#![warn(missing_docs)]

//! Math types for the roomsim acoustics engine.
//!
//! Thin wrappers around nalgebra providing the point and vector types shared
//! by the geometry kernel and the room simulation, the room dimensionality
//! tag, axis-aligned bounding boxes, and the geometric tolerance.

use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::{Unit, Vector2, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in a 2D plane (room floor plan or a wall's local frame).
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// Dimensionality of a room and of everything placed in it.
///
/// Points are always stored as [`Point3`]; a 2D room lives in the `z = 0` plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Planar room: walls are segments, microphones are circles.
    Two,
    /// Polyhedral room: walls are planar polygons, microphones are spheres.
    Three,
}

impl Dim {
    /// Dimension from a coordinate count, if supported.
    pub fn from_usize(n: usize) -> Option<Self> {
        match n {
            2 => Some(Dim::Two),
            3 => Some(Dim::Three),
            _ => None,
        }
    }

    /// Number of coordinates.
    pub fn as_usize(self) -> usize {
        match self {
            Dim::Two => 2,
            Dim::Three => 3,
        }
    }

    /// Drop the `z` coordinate of a point for 2D rooms.
    #[inline]
    pub fn flatten(self, p: &Point3) -> Point3 {
        match self {
            Dim::Two => Point3::new(p.x, p.y, 0.0),
            Dim::Three => *p,
        }
    }

    /// Drop the `z` component of a vector for 2D rooms.
    #[inline]
    pub fn flatten_vec(self, v: &Vec3) -> Vec3 {
        match self {
            Dim::Two => Vec3::new(v.x, v.y, 0.0),
            Dim::Three => *v,
        }
    }
}

impl std::fmt::Display for Dim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}D", self.as_usize())
    }
}

/// Bit pattern of `1e-5_f64`, the initial process-wide epsilon (10 µm).
const INITIAL_EPS_BITS: u64 = 0x3ee4_f8b5_88e3_68f1;

static DEFAULT_EPS: AtomicU64 = AtomicU64::new(INITIAL_EPS_BITS);

/// Current process-wide default epsilon used by [`Tolerance::default`].
pub fn default_eps() -> f64 {
    f64::from_bits(DEFAULT_EPS.load(Ordering::Relaxed))
}

/// Set the process-wide default epsilon.
///
/// Only affects tolerances created afterwards. Walls and rooms capture their
/// tolerance at construction, so a simulation in flight keeps the value it
/// started with.
///
/// Non-finite or negative values are ignored.
pub fn set_default_eps(eps: f64) {
    if eps.is_finite() && eps >= 0.0 {
        DEFAULT_EPS.store(eps.to_bits(), Ordering::Relaxed);
    }
}

/// Geometric tolerance threaded through every robustness decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Linear distance tolerance (same unit as the coordinates).
    pub eps: f64,
}

impl Tolerance {
    /// Initial default: 1e-5, i.e. 10 µm for coordinates in meters.
    pub const DEFAULT: Self = Self { eps: 1e-5 };

    /// Tolerance with an explicit epsilon.
    pub const fn new(eps: f64) -> Self {
        Self { eps }
    }

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.eps
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.eps
    }
}

impl Default for Tolerance {
    /// Snapshot of the process-wide default epsilon.
    fn default() -> Self {
        Self { eps: default_eps() }
    }
}

/// Axis-aligned bounding box in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Aabb3 {
    /// Create an AABB from min and max corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) AABB suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Smallest box containing all the points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.include_point(p);
        }
        aabb
    }

    /// Whether no point has been included yet.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Expand this AABB to include another box.
    pub fn include_aabb(&mut self, other: &Aabb3) {
        self.include_point(&other.min);
        self.include_point(&other.max);
    }

    /// Test if a point lies inside the box (boundary included).
    pub fn contains_point(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Expand the AABB by a tolerance in all directions.
    pub fn expand(&mut self, tol: f64) {
        self.min.x -= tol;
        self.min.y -= tol;
        self.min.z -= tol;
        self.max.x += tol;
        self.max.y += tol;
        self.max.z += tol;
    }

    /// Length of the main diagonal (0 for an empty box).
    pub fn diagonal(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        (self.max - self.min).norm()
    }
}
