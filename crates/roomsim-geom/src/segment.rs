//! Segment-segment intersection in the plane.

use roomsim_math::{Point2, Tolerance};

use crate::error::{GeometryError, Result};
use crate::intersection::Intersection;
use crate::orientation::{orientation, Orientation};

/// Reject segments whose endpoints coincide within tolerance.
pub(crate) fn check_segment_2d(a: &Point2, b: &Point2, tol: &Tolerance) -> Result<()> {
    if (b - a).norm() < tol.eps {
        return Err(GeometryError::DegenerateSegment { eps: tol.eps });
    }
    Ok(())
}

/// Intersect the query segment `[a1, a2]` with the segment `[b1, b2]`.
///
/// Classification:
/// - [`Intersection::Endpoint`] when the hit is at `a1` or `a2`;
/// - [`Intersection::Boundary`] when the hit is at `b1` or `b2` only, or when
///   the segments are collinear and overlap (the point is the start of the
///   overlap closest to `a1`);
/// - [`Intersection::Proper`] for a clean crossing.
pub fn segment_intersection_2d(
    a1: &Point2,
    a2: &Point2,
    b1: &Point2,
    b2: &Point2,
    tol: &Tolerance,
) -> Result<Intersection<Point2>> {
    check_segment_2d(a1, a2, tol)?;
    check_segment_2d(b1, b2, tol)?;

    let o1 = orientation(a1, a2, b1, tol);
    let o2 = orientation(a1, a2, b2, tol);

    if o1 == Orientation::Collinear && o2 == Orientation::Collinear {
        return Ok(collinear_overlap(a1, a2, b1, b2, tol));
    }
    // b lies strictly on one side of a's line
    if o1 == o2 {
        return Ok(Intersection::None);
    }

    let o3 = orientation(b1, b2, a1, tol);
    let o4 = orientation(b1, b2, a2, tol);
    if o3 == o4 {
        return Ok(Intersection::None);
    }

    let on_a_end = o3 == Orientation::Collinear || o4 == Orientation::Collinear;
    let on_b_end = o1 == Orientation::Collinear || o2 == Orientation::Collinear;

    // Snap to the endpoint when one is involved so that callers can compare
    // hit points exactly.
    let point = if o3 == Orientation::Collinear {
        *a1
    } else if o4 == Orientation::Collinear {
        *a2
    } else if o1 == Orientation::Collinear {
        *b1
    } else if o2 == Orientation::Collinear {
        *b2
    } else {
        line_line(a1, a2, b1, b2)
    };

    Ok(if on_a_end {
        Intersection::Endpoint(point)
    } else if on_b_end {
        Intersection::Boundary(point)
    } else {
        Intersection::Proper(point)
    })
}

/// Intersection of the supporting lines of two non-parallel segments.
fn line_line(a1: &Point2, a2: &Point2, b1: &Point2, b2: &Point2) -> Point2 {
    let r = a2 - a1;
    let s = b2 - b1;
    let denom = r.x * s.y - r.y * s.x;
    let w = b1 - a1;
    let t = (w.x * s.y - w.y * s.x) / denom;
    a1 + r * t
}

/// Overlap of two collinear segments, measured along `a`.
fn collinear_overlap(
    a1: &Point2,
    a2: &Point2,
    b1: &Point2,
    b2: &Point2,
    tol: &Tolerance,
) -> Intersection<Point2> {
    let axis = a2 - a1;
    let len = axis.norm();
    let u = axis / len;

    let tb1 = (b1 - a1).dot(&u);
    let tb2 = (b2 - a1).dot(&u);
    let lo = tb1.min(tb2).max(0.0);
    let hi = tb1.max(tb2).min(len);

    if lo > hi + tol.eps {
        return Intersection::None;
    }

    let point = a1 + u * lo;
    if hi - lo < tol.eps && (lo < tol.eps || (len - lo).abs() < tol.eps) {
        // end-to-end touch
        Intersection::Endpoint(point)
    } else {
        Intersection::Boundary(point)
    }
}
