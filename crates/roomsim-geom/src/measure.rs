//! Angles, distances and line equations.

use nalgebra::{Point, SVector};
use roomsim_math::{Point2, Tolerance};

use crate::error::{GeometryError, Result};

/// Cosine of the angle between two vectors, clamped to `[-1, 1]`.
pub fn cos_angle_between<const D: usize>(a: &SVector<f64, D>, b: &SVector<f64, D>) -> Result<f64> {
    let na = a.norm();
    let nb = b.norm();
    if na == 0.0 || nb == 0.0 {
        return Err(GeometryError::ZeroLengthVector);
    }
    Ok((a.dot(b) / (na * nb)).clamp(-1.0, 1.0))
}

/// Angle between two vectors in radians, in `[0, π]`.
pub fn angle_between<const D: usize>(a: &SVector<f64, D>, b: &SVector<f64, D>) -> Result<f64> {
    cos_angle_between(a, b).map(f64::acos)
}

/// Distance from `point` to the infinite line through `start` and `end`.
pub fn distance_to_line<const D: usize>(
    start: &Point<f64, D>,
    end: &Point<f64, D>,
    point: &Point<f64, D>,
    tol: &Tolerance,
) -> Result<f64> {
    let dir = end - start;
    let len = dir.norm();
    if len < tol.eps {
        return Err(GeometryError::DegenerateSegment { eps: tol.eps });
    }
    let u = dir / len;
    let w = point - start;
    let along = w.dot(&u);
    Ok((w - u * along).norm())
}

/// Slope and intercept `(a, b)` of the line `y = a x + b` through two points.
pub fn line_equation(p1: &Point2, p2: &Point2, tol: &Tolerance) -> Result<(f64, f64)> {
    let dx = p2.x - p1.x;
    if dx.abs() < tol.eps {
        return Err(GeometryError::NumericalDegeneracy(format!(
            "vertical line through x = {}",
            p1.x
        )));
    }
    let a = (p2.y - p1.y) / dx;
    Ok((a, p1.y - a * p1.x))
}
