//! Segment-sphere tests for microphone capture volumes.
//!
//! Both functions are generic over the dimension: in 2D the "sphere" is the
//! capture circle of a microphone.

use nalgebra::Point;
use roomsim_math::Tolerance;

use crate::error::{GeometryError, Result};
use crate::quadratic::solve_quadratic;

fn check_inputs<const D: usize>(
    start: &Point<f64, D>,
    end: &Point<f64, D>,
    radius: f64,
    tol: &Tolerance,
) -> Result<f64> {
    let len = (end - start).norm();
    if len < tol.eps {
        return Err(GeometryError::DegenerateSegment { eps: tol.eps });
    }
    if radius.is_nan() || radius <= 0.0 {
        return Err(GeometryError::NumericalDegeneracy(format!(
            "non-positive sphere radius {radius}"
        )));
    }
    Ok(len)
}

/// Whether the segment `[start, end]` comes within `radius + eps` of `center`.
///
/// Tangent segments count as intersecting, as do segments lying entirely
/// inside the sphere.
pub fn intersects_sphere<const D: usize>(
    start: &Point<f64, D>,
    end: &Point<f64, D>,
    center: &Point<f64, D>,
    radius: f64,
    tol: &Tolerance,
) -> Result<bool> {
    let len = check_inputs(start, end, radius, tol)?;
    let u = (end - start) / len;
    let t = (center - start).dot(&u).clamp(0.0, len);
    let closest = start + u * t;
    Ok((closest - center).norm() <= radius + tol.eps)
}

/// First point where the segment `[start, end]` enters the sphere.
///
/// Returns `start` itself when it already lies within `radius + eps` of the
/// center, and the point of closest approach for a tangent segment. `None`
/// when the segment misses the sphere or stops short of it.
pub fn sphere_intersection<const D: usize>(
    start: &Point<f64, D>,
    end: &Point<f64, D>,
    center: &Point<f64, D>,
    radius: f64,
    tol: &Tolerance,
) -> Result<Option<Point<f64, D>>> {
    let len = check_inputs(start, end, radius, tol)?;
    let oc = start - center;
    if oc.norm() <= radius + tol.eps {
        return Ok(Some(*start));
    }

    let u = (end - start) / len;
    let b = oc.dot(&u);
    let c = oc.norm_squared() - radius * radius;

    // |oc + t u|² = r² with |u| = 1
    let t = match solve_quadratic(1.0, 2.0 * b, c, tol)?.smallest() {
        Some(t) => t,
        None => {
            // Grazing within tolerance still counts
            let t = -b;
            let miss = (oc + u * t).norm();
            if miss > radius + tol.eps {
                return Ok(None);
            }
            t
        }
    };

    if t < -tol.eps || t > len + tol.eps {
        return Ok(None);
    }
    Ok(Some(start + u * t.clamp(0.0, len)))
}
