//! Error types for walls, rooms and simulations.

use roomsim_geom::GeometryError;
use roomsim_math::Point3;
use thiserror::Error;

/// Errors that can occur while building a room or running a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoomError {
    /// A kernel predicate rejected its input.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Wall corners do not describe a usable segment or polygon.
    #[error("degenerate wall: {0}")]
    DegenerateWall(String),

    /// Room has no walls.
    #[error("room has no walls")]
    EmptyRoom,

    /// Walls, microphones or a source disagree on the dimension.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Dimension of the room.
        expected: usize,
        /// Dimension of the offending input.
        found: usize,
    },

    /// Obstructing wall index does not refer to a wall.
    #[error("obstructing wall index {0} out of range")]
    InvalidObstructingWall(usize),

    /// Absorption or scattering coefficient outside `[0, 1]`.
    #[error("{name} coefficient {value} outside [0, 1]")]
    InvalidCoefficient {
        /// Which coefficient.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// A source or microphone lies outside a closed room.
    #[error("{what} at ({}, {}, {}) is outside the room", point.x, point.y, point.z)]
    OutOfBounds {
        /// Description of the misplaced object.
        what: String,
        /// Its position.
        point: Point3,
    },

    /// The shoebox fast path needs axis-aligned walls at `0` and `L` on every axis.
    #[error("room is not a shoebox: {0}")]
    NotShoebox(String),

    /// Invalid simulation settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for room operations.
pub type Result<T> = std::result::Result<T, RoomError>;
