//! Real roots of quadratic equations.

use roomsim_math::Tolerance;

use crate::error::{GeometryError, Result};

/// Real roots of `a x² + b x + c = 0`, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuadraticRoots {
    /// No real root.
    None,
    /// A single (double, or linear) root.
    One(f64),
    /// Two distinct roots, `x1 < x2`.
    Two(f64, f64),
}

impl QuadraticRoots {
    /// Smallest root, if any.
    pub fn smallest(&self) -> Option<f64> {
        match *self {
            QuadraticRoots::None => None,
            QuadraticRoots::One(x) | QuadraticRoots::Two(x, _) => Some(x),
        }
    }
}

/// Solve `a x² + b x + c = 0`.
///
/// A discriminant within `eps` of zero yields a single root. When `a` is
/// effectively zero the linear equation is solved instead; if `b` vanishes
/// too the equation has no well-defined root.
pub fn solve_quadratic(a: f64, b: f64, c: f64, tol: &Tolerance) -> Result<QuadraticRoots> {
    if a.abs() <= tol.eps {
        if b.abs() <= tol.eps {
            return Err(GeometryError::NumericalDegeneracy(format!(
                "quadratic with a = {a}, b = {b}"
            )));
        }
        return Ok(QuadraticRoots::One(-c / b));
    }

    let disc = b * b - 4.0 * a * c;
    if disc.abs() <= tol.eps {
        return Ok(QuadraticRoots::One(-b / (2.0 * a)));
    }
    if disc < 0.0 {
        return Ok(QuadraticRoots::None);
    }

    // Avoid cancellation between -b and sqrt(disc); q != 0 since disc > 0
    let q = -0.5 * (b + b.signum() * disc.sqrt());
    let (x1, x2) = (q / a, c / q);
    Ok(if x1 <= x2 {
        QuadraticRoots::Two(x1, x2)
    } else {
        QuadraticRoots::Two(x2, x1)
    })
}
