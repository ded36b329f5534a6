//! Orientation of three points in the plane.

use roomsim_math::{Point2, Tolerance};

/// Turning direction of the path `p1 -> p2 -> p3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Right turn.
    Clockwise,
    /// Left turn.
    CounterClockwise,
    /// The three points lie on a line (within tolerance).
    Collinear,
}

/// 2D cross product `(p2 - p1) x (p3 - p1)`.
///
/// Positive if p3 is to the left of the line p1->p2.
#[inline]
pub(crate) fn cross3(p1: &Point2, p2: &Point2, p3: &Point2) -> f64 {
    (p2.x - p1.x) * (p3.y - p1.y) - (p3.x - p1.x) * (p2.y - p1.y)
}

/// Orientation test.
///
/// The sign of the cross product decides; `p3` closer than `eps` to the line
/// through `p1` and `p2` reports [`Orientation::Collinear`]. Coincident `p1`
/// and `p2` are always collinear with anything.
pub fn orientation(p1: &Point2, p2: &Point2, p3: &Point2, tol: &Tolerance) -> Orientation {
    let cross = cross3(p1, p2, p3);
    let base = (p2 - p1).norm();
    if cross.abs() <= tol.eps * base || base < tol.eps {
        Orientation::Collinear
    } else if cross > 0.0 {
        Orientation::CounterClockwise
    } else {
        Orientation::Clockwise
    }
}
