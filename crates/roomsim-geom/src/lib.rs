#![warn(missing_docs)]

//! Geometry kernel for the roomsim acoustics engine.
//!
//! Stateless, tolerance-aware predicates on points, segments, planes,
//! polygons and spheres. Every robustness decision goes through an explicit
//! [`Tolerance`]; malformed inputs are reported as [`GeometryError`] instead
//! of producing NaN.
//!
//! # Architecture
//!
//! - [`orientation`] - Orientation of three points in the plane
//! - [`segment_intersection_2d`] - Four-way classified segment/segment test
//! - [`Plane`], [`segment_plane_intersection`] - Planes and segment crossings
//! - [`point_in_polygon`], [`polygon_area`] - Planar polygon queries
//! - [`angle_between`], [`distance_to_line`], [`line_equation`] - Measurements
//! - [`Ray`], [`reflected_end`], [`segment_end`] - Ray construction
//! - [`solve_quadratic`] - Real roots with a discriminant tolerance
//! - [`sphere_intersection`], [`intersects_sphere`] - Ray vs. microphone
//!
//! # Example
//!
//! ```
//! use roomsim_geom::{segment_intersection_2d, Intersection};
//! use roomsim_math::{Point2, Tolerance};
//!
//! let tol = Tolerance::DEFAULT;
//! let hit = segment_intersection_2d(
//!     &Point2::new(0.0, 0.0),
//!     &Point2::new(2.0, 2.0),
//!     &Point2::new(0.0, 2.0),
//!     &Point2::new(2.0, 0.0),
//!     &tol,
//! )
//! .unwrap();
//! assert_eq!(hit, Intersection::Proper(Point2::new(1.0, 1.0)));
//! ```

pub mod error;
mod intersection;
mod measure;
mod orientation;
mod plane;
mod polygon;
mod quadratic;
mod ray;
mod segment;
mod sphere;

pub use error::{GeometryError, Result};
pub use intersection::Intersection;
pub use measure::{angle_between, cos_angle_between, distance_to_line, line_equation};
pub use orientation::{orientation, Orientation};
pub use plane::{segment_plane_intersection, Plane};
pub use polygon::{point_in_polygon, polygon_area, PolygonLocation};
pub use quadratic::{solve_quadratic, QuadraticRoots};
pub use ray::{reflected_end, segment_end, segment_end_2d, Ray};
pub use segment::segment_intersection_2d;
pub use sphere::{intersects_sphere, sphere_intersection};

pub use roomsim_math::Tolerance;
