#![warn(missing_docs)]

//! Walls, rooms and acoustic simulations for the roomsim engine.
//!
//! A [`Room`] owns its [`Wall`]s, the set of walls that can block a line of
//! sight, and the microphones. It runs two complementary simulations:
//!
//! - the image-source model ([`Room::image_source_model`], with a closed-form
//!   fast path for shoebox rooms in [`Room::image_source_shoebox`]), which
//!   finds every specular path up to a reflection order;
//! - a ray tracer ([`Room::ray_tracing`]) with diffuse scattering, for the
//!   late, non-specular part of the response.
//!
//! Both feed [`Room::get_rir_entries`].
//!
//! # Example
//!
//! ```
//! use nalgebra::DMatrix;
//! use roomsim_math::{Point2, Point3};
//! use roomsim_room::{Room, Wall};
//!
//! let corners = [(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)];
//! let walls = (0..4)
//!     .map(|i| {
//!         let (x0, y0) = corners[i];
//!         let (x1, y1) = corners[(i + 1) % 4];
//!         Wall::new_2d(Point2::new(x0, y0), Point2::new(x1, y1), 0.2)
//!     })
//!     .collect::<Result<Vec<_>, _>>()?;
//! let mics = DMatrix::from_column_slice(2, 1, &[2.0, 2.0]);
//!
//! let mut room = Room::new(walls, vec![], &mics)?;
//! room.image_source_model(&Point3::new(1.0, 1.0, 0.0), 1)?;
//! assert_eq!(room.get_rir_entries().len(), 5);
//! # Ok::<(), roomsim_room::RoomError>(())
//! ```

pub mod error;
pub mod image_source;
pub mod raytrace;
pub mod rir;
pub mod room;
pub mod settings;
pub mod wall;

pub use error::{Result, RoomError};
pub use image_source::{ImageSource, ImageSourceSet};
pub use raytrace::{Bounce, RayOutcome, RayTermination, RayTracingResult, RayTracingSummary, ScatterSplit, WallHit};
pub use rir::{ContributionKind, EnergyHistogram, RirEntry};
pub use room::Room;
pub use settings::{RayTracingSettings, ScatteringLaw};
pub use wall::{Side, Wall};
