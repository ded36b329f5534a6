//! Error types for the geometry kernel.

use thiserror::Error;

/// Malformed input detected by a kernel predicate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Segment endpoints coincide within tolerance.
    #[error("degenerate segment: endpoints closer than {eps}")]
    DegenerateSegment {
        /// Tolerance the length was compared against.
        eps: f64,
    },

    /// A direction or normal vector has zero length.
    #[error("zero-length vector")]
    ZeroLengthVector,

    /// Polygon has too few vertices or no area.
    #[error("degenerate polygon: {0}")]
    DegeneratePolygon(String),

    /// The computation has no well-defined answer at this precision.
    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),
}

/// Result type for geometry kernel operations.
pub type Result<T> = std::result::Result<T, GeometryError>;
