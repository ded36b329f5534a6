//! Room construction, geometric queries and result storage.

use log::debug;
use nalgebra::DMatrix;
use roomsim_geom::Intersection;
use roomsim_math::{Aabb3, Dim, Point3, Tolerance, Vec3};

use crate::error::{Result, RoomError};
use crate::image_source::ImageSourceSet;
use crate::raytrace::RayTracingResult;
use crate::rir::{sort_entries, ContributionKind, EnergyHistogram, RirEntry};
use crate::wall::Wall;

/// Reference directions for the containment test, tried in order until a
/// cast segment crosses no wall edge.
const CAST_DIRECTIONS: [[f64; 3]; 8] = [
    [0.8191, 0.5018, 0.2781],
    [-0.3412, 0.8677, -0.3613],
    [-0.7149, -0.4287, 0.5524],
    [0.2267, -0.7418, -0.6311],
    [0.9413, -0.1985, 0.2731],
    [-0.5693, 0.2174, -0.7929],
    [0.1129, 0.9361, 0.3330],
    [-0.8836, -0.3057, -0.3547],
];

/// A room: walls, obstructing walls and microphones, plus the results of the
/// last simulation runs.
///
/// The geometry is read-only once built. Simulations that store their
/// results take `&mut self`; the `compute_*` / `trace_rays` variants only
/// read the room and can run concurrently.
#[derive(Debug, Clone)]
pub struct Room {
    pub(crate) dim: Dim,
    pub(crate) walls: Vec<Wall>,
    pub(crate) obstructing: Vec<usize>,
    pub(crate) mics: Vec<Point3>,
    pub(crate) max_dist: f64,
    pub(crate) tol: Tolerance,
    pub(crate) closed: bool,
    pub(crate) bbox: Aabb3,
    pub(crate) image_sources: ImageSourceSet,
    pub(crate) ray_result: Option<RayTracingResult>,
    pub(crate) histogram: Option<EnergyHistogram>,
}

impl Room {
    /// Build a room.
    ///
    /// The dimension is taken from the first wall, the tolerance too.
    /// `microphones` has one column per microphone and one row per coordinate.
    /// `obstructing_walls` lists the walls that are not part of the enclosing
    /// boundary, such as free-standing panels. They still reflect and block
    /// sound but are left out of closedness and containment.
    pub fn new(walls: Vec<Wall>, obstructing_walls: Vec<usize>, microphones: &DMatrix<f64>) -> Result<Self> {
        let first = walls.first().ok_or(RoomError::EmptyRoom)?;
        let dim = first.dim();
        let tol = first.tolerance();

        if let Some(w) = walls.iter().find(|w| w.dim() != dim) {
            return Err(RoomError::DimensionMismatch {
                expected: dim.as_usize(),
                found: w.dim().as_usize(),
            });
        }
        if microphones.nrows() != dim.as_usize() {
            return Err(RoomError::DimensionMismatch {
                expected: dim.as_usize(),
                found: microphones.nrows(),
            });
        }

        let mut obstructing = obstructing_walls;
        obstructing.sort_unstable();
        obstructing.dedup();
        if let Some(&bad) = obstructing.iter().find(|&&i| i >= walls.len()) {
            return Err(RoomError::InvalidObstructingWall(bad));
        }

        let mics: Vec<Point3> = microphones
            .column_iter()
            .map(|c| match dim {
                Dim::Two => Point3::new(c[0], c[1], 0.0),
                Dim::Three => Point3::new(c[0], c[1], c[2]),
            })
            .collect();

        let bbox = Aabb3::from_points(walls.iter().flat_map(|w| w.corners()));
        let mut extent = bbox;
        for m in &mics {
            extent.include_point(m);
        }
        let max_dist = extent.diagonal() + 1.0;
        let closed = is_closed(&walls, &obstructing, &tol);

        debug!(
            "room: {} walls ({dim}), {} obstructing, {} microphones, closed={closed}",
            walls.len(),
            obstructing.len(),
            mics.len()
        );

        Ok(Self {
            dim,
            walls,
            obstructing,
            mics,
            max_dist,
            tol,
            closed,
            bbox,
            image_sources: ImageSourceSet::default(),
            ray_result: None,
            histogram: None,
        })
    }

    /// Dimension of the room.
    pub fn dim(&self) -> Dim {
        self.dim
    }

    /// All walls, indexed by wall id.
    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    /// Wall by id.
    pub fn get_wall(&self, i: usize) -> Option<&Wall> {
        self.walls.get(i)
    }

    /// Ids of the obstructing (non-boundary) walls, sorted.
    pub fn obstructing_walls(&self) -> &[usize] {
        &self.obstructing
    }

    /// Microphone positions.
    pub fn microphones(&self) -> &[Point3] {
        &self.mics
    }

    /// Reference microphone (the first one).
    pub fn mic_pos(&self) -> Option<&Point3> {
        self.mics.first()
    }

    /// Tolerance captured at construction.
    pub fn tolerance(&self) -> Tolerance {
        self.tol
    }

    /// Upper bound on any straight path inside the room.
    pub fn get_max_distance(&self) -> f64 {
        self.max_dist
    }

    /// Whether every edge of a boundary wall is shared with another
    /// boundary wall. Obstructing walls are not part of the boundary.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether wall `i` encloses the room, i.e. is not an obstructing wall.
    pub fn is_boundary_wall(&self, i: usize) -> bool {
        self.obstructing.binary_search(&i).is_err()
    }

    fn boundary_walls(&self) -> impl Iterator<Item = &Wall> + '_ {
        self.walls
            .iter()
            .enumerate()
            .filter(|(i, _)| self.is_boundary_wall(*i))
            .map(|(_, w)| w)
    }

    /// Point-in-room test.
    ///
    /// Counts the boundary walls crossed by a segment from `p` to a point
    /// outside the bounding box; obstructing walls are ignored. A crossing
    /// through a wall edge is ambiguous and another reference point is tried.
    /// Points lying on a boundary wall are contained.
    pub fn contains(&self, p: &Point3) -> bool {
        let p = self.dim.flatten(p);
        let mut bounds = self.bbox;
        bounds.expand(self.tol.eps);
        if !bounds.contains_point(&p) {
            return false;
        }
        if self.boundary_walls().any(|w| w.touches(&p)) {
            return true;
        }

        let reach = self.bbox.diagonal() + 1.0;
        let mut parity = false;
        for dir in CAST_DIRECTIONS {
            let dir = self.dim.flatten_vec(&Vec3::new(dir[0], dir[1], dir[2])).normalize();
            let outside = p + dir * reach;
            match self.crossing_parity(&p, &outside) {
                Some(odd) => return odd,
                None => parity = self.count_crossings(&p, &outside) % 2 == 1,
            }
        }
        debug!("containment of {p:?} ambiguous for every cast direction");
        parity
    }

    /// Parity of the wall crossings along `[p, outside]`, or `None` when the
    /// segment grazes a wall edge.
    fn crossing_parity(&self, p: &Point3, outside: &Point3) -> Option<bool> {
        let mut count = 0usize;
        for wall in self.boundary_walls() {
            match wall.intersection(p, outside) {
                Ok(Intersection::None) => {}
                Ok(Intersection::Proper(_)) => count += 1,
                Ok(Intersection::Endpoint(_)) | Ok(Intersection::Boundary(_)) | Err(_) => {
                    return None
                }
            }
        }
        Some(count % 2 == 1)
    }

    fn count_crossings(&self, p: &Point3, outside: &Point3) -> usize {
        self.boundary_walls()
            .filter(|w| matches!(w.intersection(p, outside), Ok(hit) if hit.is_hit()))
            .count()
    }

    /// Refuse to simulate with a source or microphone outside a closed room.
    pub(crate) fn validate_positions(&self, source: &Point3) -> Result<()> {
        if !self.closed {
            debug!("room is open, skipping containment check");
            return Ok(());
        }
        if !self.contains(source) {
            return Err(RoomError::OutOfBounds {
                what: "source".into(),
                point: *source,
            });
        }
        if let Some((i, m)) = self.mics.iter().enumerate().find(|(_, m)| !self.contains(m)) {
            return Err(RoomError::OutOfBounds {
                what: format!("microphone {i}"),
                point: *m,
            });
        }
        Ok(())
    }

    /// Flatten a source position and check its coordinates are usable.
    pub(crate) fn prepare_source(&self, source: &Point3) -> Result<Point3> {
        let source = self.dim.flatten(source);
        self.validate_positions(&source)?;
        Ok(source)
    }

    /// Image sources stored by the last image-source run.
    pub fn image_sources(&self) -> &ImageSourceSet {
        &self.image_sources
    }

    /// Entries stored by the last ray-tracing run.
    pub fn ray_entries(&self) -> &[RirEntry] {
        self.ray_result.as_ref().map(|r| r.entries.as_slice()).unwrap_or(&[])
    }

    /// Histogram of the last ray-tracing run.
    pub fn histogram(&self) -> Option<&EnergyHistogram> {
        self.histogram.as_ref()
    }

    /// All stored contributions, sorted by microphone then distance.
    ///
    /// One entry per (image source, visible microphone) pair, followed by the
    /// stored ray-tracing entries.
    pub fn get_rir_entries(&self) -> Vec<RirEntry> {
        let mut entries: Vec<RirEntry> = self
            .image_sources
            .iter()
            .flat_map(|src| {
                self.mics
                    .iter()
                    .enumerate()
                    .filter(|(m, _)| src.is_visible(*m))
                    .map(|(m, mic)| RirEntry {
                        mic: m,
                        distance: (src.position - mic).norm(),
                        energy: src.attenuation,
                        kind: ContributionKind::ImageSource { order: src.order },
                    })
            })
            .collect();
        entries.extend_from_slice(self.ray_entries());
        sort_entries(&mut entries);
        entries
    }
}

/// Every edge of a boundary wall lies on the edge of another boundary wall.
///
/// `obstructing` must be sorted. A room without boundary walls is open.
fn is_closed(walls: &[Wall], obstructing: &[usize], tol: &Tolerance) -> bool {
    let boundary: Vec<(usize, &Wall)> = walls
        .iter()
        .enumerate()
        .filter(|(i, _)| obstructing.binary_search(i).is_err())
        .collect();
    if boundary.is_empty() {
        return false;
    }
    let on_other_edge = |i: usize, p: &Point3| {
        boundary
            .iter()
            .any(|&(j, other)| j != i && other.distance_to_edges(p) <= tol.eps)
    };
    boundary.iter().all(|&(i, wall)| match wall.dim() {
        Dim::Two => wall.corners().iter().all(|c| on_other_edge(i, c)),
        Dim::Three => wall.edges().all(|(a, b)| {
            let mid = nalgebra::center(&a, &b);
            // the whole edge must lie on a single neighbour
            boundary.iter().any(|&(j, other)| {
                j != i
                    && [a, b, mid]
                        .iter()
                        .all(|p| other.distance_to_edges(p) <= tol.eps)
            })
        }),
    })
}
