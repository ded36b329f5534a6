//! Image-source model: general depth-first search and the shoebox lattice.

use log::{debug, trace};
use rayon::prelude::*;
use roomsim_math::{Dim, Point3};

use crate::error::{Result, RoomError};
use crate::room::Room;
use crate::wall::Side;

/// A virtual source obtained by mirroring the real source across walls.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    /// Position in room coordinates.
    pub position: Point3,
    /// Number of reflections (0 for the real source).
    pub order: usize,
    /// Product of `(1 - absorption)` over the reflecting walls.
    pub attenuation: f64,
    /// Wall of the last reflection. `None` for the real source and for
    /// shoebox images.
    pub wall: Option<usize>,
    /// Visibility from each microphone.
    pub visible: Vec<bool>,
}

impl ImageSource {
    /// Whether microphone `mic` sees this source.
    pub fn is_visible(&self, mic: usize) -> bool {
        self.visible.get(mic).copied().unwrap_or(false)
    }

    /// Whether any microphone sees this source.
    pub fn is_visible_any(&self) -> bool {
        self.visible.iter().any(|&v| v)
    }
}

/// Flat, append-only collection of image sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageSourceSet {
    sources: Vec<ImageSource>,
}

impl ImageSourceSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, source: ImageSource) {
        self.sources.push(source);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Record by index.
    pub fn get(&self, i: usize) -> Option<&ImageSource> {
        self.sources.get(i)
    }

    /// Iterate over the records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ImageSource> {
        self.sources.iter()
    }

    /// Records as a slice.
    pub fn as_slice(&self) -> &[ImageSource] {
        &self.sources
    }

    /// Highest stored order.
    pub fn max_order(&self) -> Option<usize> {
        self.sources.iter().map(|s| s.order).max()
    }

    /// Take the records out.
    pub fn into_vec(self) -> Vec<ImageSource> {
        self.sources
    }
}

impl From<Vec<ImageSource>> for ImageSourceSet {
    fn from(sources: Vec<ImageSource>) -> Self {
        Self { sources }
    }
}

impl<'a> IntoIterator for &'a ImageSourceSet {
    type Item = &'a ImageSource;
    type IntoIter = std::slice::Iter<'a, ImageSource>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.iter()
    }
}

/// A node of the reflection chain explored by the search.
#[derive(Debug, Clone, Copy)]
struct Node {
    position: Point3,
    order: usize,
    attenuation: f64,
    wall: Option<usize>,
}

impl Room {
    /// Run the general image-source search and store the result.
    ///
    /// Returns the number of stored image sources.
    pub fn image_source_model(&mut self, source: &Point3, max_order: usize) -> Result<usize> {
        self.image_sources = self.compute_image_sources(source, max_order)?;
        Ok(self.image_sources.len())
    }

    /// General image-source search without touching the stored results.
    ///
    /// Only sources visible from at least one microphone are returned, in
    /// depth-first order with first-level subtrees in wall order.
    pub fn compute_image_sources(&self, source: &Point3, max_order: usize) -> Result<ImageSourceSet> {
        let source = self.prepare_source(source)?;
        let root = Node {
            position: source,
            order: 0,
            attenuation: 1.0,
            wall: None,
        };

        let mut found = Vec::new();
        self.visit(&[root], &mut found);

        if max_order > 0 {
            let subtrees: Vec<Vec<ImageSource>> = (0..self.walls.len())
                .into_par_iter()
                .map(|w| {
                    let mut out = Vec::new();
                    if let Some(child) = self.child(&root, w) {
                        let mut chain = vec![root, child];
                        self.search(&mut chain, max_order, &mut out);
                    }
                    out
                })
                .collect();
            found.extend(subtrees.into_iter().flatten());
        }

        debug!(
            "image sources: {} visible up to order {max_order}",
            found.len()
        );
        Ok(found.into())
    }

    /// Mirror `node` across wall `w`, if the node is strictly behind it.
    fn child(&self, node: &Node, w: usize) -> Option<Node> {
        let wall = &self.walls[w];
        if wall.side(&node.position) != Side::Back {
            return None;
        }
        Some(Node {
            position: wall.reflect(&node.position),
            order: node.order + 1,
            attenuation: node.attenuation * (1.0 - wall.absorption()),
            wall: Some(w),
        })
    }

    fn search(&self, chain: &mut Vec<Node>, max_order: usize, out: &mut Vec<ImageSource>) {
        self.visit(chain, out);

        let Some(&node) = chain.last() else {
            return;
        };
        if node.order >= max_order {
            return;
        }
        for w in 0..self.walls.len() {
            if let Some(child) = self.child(&node, w) {
                chain.push(child);
                self.search(chain, max_order, out);
                chain.pop();
            }
        }
    }

    /// Store the last node of `chain` if any microphone sees it.
    fn visit(&self, chain: &[Node], out: &mut Vec<ImageSource>) {
        let Some(node) = chain.last() else {
            return;
        };
        let visible: Vec<bool> = self.mics.iter().map(|m| self.is_visible(chain, m)).collect();
        if visible.iter().any(|&v| v) {
            out.push(ImageSource {
                position: node.position,
                order: node.order,
                attenuation: node.attenuation,
                wall: node.wall,
                visible,
            });
        }
    }

    /// Walk the reflection chain back from the microphone to the real source.
    ///
    /// Each leg must hit the wall that generated the image it points to, and
    /// no leg may cross any wall, obstructing or not, other than the walls it
    /// starts or ends on.
    fn is_visible(&self, chain: &[Node], mic: &Point3) -> bool {
        let mut current = *mic;
        let mut from_wall: Option<usize> = None;

        for node in chain.iter().skip(1).rev() {
            let Some(w) = node.wall else {
                return false;
            };
            let hit = match self.walls[w].intersection(&current, &node.position) {
                Ok(hit) => hit,
                Err(e) => {
                    trace!("degenerate leg toward image of order {}: {e}", node.order);
                    return false;
                }
            };
            let Some(point) = hit.point() else {
                return false;
            };
            if self.is_obstructed(&current, &point, &[from_wall, Some(w)]) {
                return false;
            }
            current = point;
            from_wall = Some(w);
        }

        let source = chain[0].position;
        !self.is_obstructed(&current, &source, &[from_wall])
    }

    /// Whether some wall crosses the inside of `[a, b]`.
    ///
    /// Boundary walls block as well as obstructing ones, so legs through the
    /// notch of a concave room are cut. Walls listed in `exclude` are
    /// ignored, and touching a wall at `a` or `b` is not a crossing. A
    /// degenerate segment counts as obstructed.
    pub(crate) fn is_obstructed(&self, a: &Point3, b: &Point3, exclude: &[Option<usize>]) -> bool {
        if self.tol.points_equal(a, b) {
            trace!("zero-length leg at {a:?}");
            return true;
        }
        self.walls.iter().enumerate().any(|(i, wall)| {
            if exclude.contains(&Some(i)) {
                return false;
            }
            match wall.intersection(a, b) {
                Ok(hit) => hit.is_interior_crossing(),
                Err(_) => true,
            }
        })
    }

    /// Shoebox lattice of image sources, stored.
    ///
    /// Returns the number of stored image sources.
    pub fn image_source_shoebox(
        &mut self,
        source: &Point3,
        room_dims: &[f64],
        max_order: usize,
    ) -> Result<usize> {
        self.image_sources = self.compute_shoebox_image_sources(source, room_dims, max_order)?;
        Ok(self.image_sources.len())
    }

    /// Closed-form image sources of an axis-aligned box `[0, L_d]`.
    ///
    /// Needs, on every axis, a wall in the plane `x_d = 0` and one in
    /// `x_d = L_d`; their absorptions give the attenuation. Every image is
    /// visible from every microphone.
    pub fn compute_shoebox_image_sources(
        &self,
        source: &Point3,
        room_dims: &[f64],
        max_order: usize,
    ) -> Result<ImageSourceSet> {
        let n_dim = self.dim.as_usize();
        if room_dims.len() != n_dim {
            return Err(RoomError::DimensionMismatch {
                expected: n_dim,
                found: room_dims.len(),
            });
        }
        let source = self.prepare_source(source)?;

        // (1 - absorption) of the low and high wall on each axis
        let mut reflect = [[1.0f64; 2]; 3];
        for (d, &len) in room_dims.iter().enumerate() {
            if len.is_nan() || len <= self.tol.eps {
                return Err(RoomError::NotShoebox(format!("axis {d} has length {len}")));
            }
            for (k, target) in [0.0, len].into_iter().enumerate() {
                let wall = self
                    .walls
                    .iter()
                    .find(|w| w.corners().iter().all(|c| (c[d] - target).abs() <= self.tol.eps))
                    .ok_or_else(|| {
                        RoomError::NotShoebox(format!("no wall in the plane x{d} = {target}"))
                    })?;
                reflect[d][k] = 1.0 - wall.absorption();
            }
        }

        let order = max_order as i64;
        let n_mics = self.mics.len();
        let range = |used: i64| -(order - used)..=(order - used);
        let mut found = Vec::new();

        let mut emit = |n: [i64; 3]| {
            let mut position = Point3::origin();
            let mut attenuation = 1.0;
            for d in 0..n_dim {
                let (len, s, nd) = (room_dims[d], source[d], n[d]);
                position[d] = nd as f64 * len + if nd % 2 == 0 { s } else { len - s };
                let (near, far) = (nd.unsigned_abs().div_ceil(2), nd.unsigned_abs() / 2);
                // n > 0 reaches the high wall first, n < 0 the low wall
                let (high, low) = if nd >= 0 { (near, far) } else { (far, near) };
                attenuation *= reflect[d][1].powi(high as i32) * reflect[d][0].powi(low as i32);
            }
            found.push(ImageSource {
                position,
                order: n.iter().map(|x| x.unsigned_abs() as usize).sum(),
                attenuation,
                wall: None,
                visible: vec![true; n_mics],
            });
        };

        match self.dim {
            Dim::Two => {
                for nx in range(0) {
                    for ny in range(nx.abs()) {
                        emit([nx, ny, 0]);
                    }
                }
            }
            Dim::Three => {
                for nx in range(0) {
                    for ny in range(nx.abs()) {
                        for nz in range(nx.abs() + ny.abs()) {
                            emit([nx, ny, nz]);
                        }
                    }
                }
            }
        }

        debug!(
            "shoebox image sources: {} up to order {max_order}",
            found.len()
        );
        Ok(found.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::tests::{box_walls, mics, polygon_walls};
    use crate::wall::Wall;
    use roomsim_math::Point2;

    fn square_room() -> Room {
        let walls = polygon_walls(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)], 0.2);
        Room::new(walls, vec![], &mics(&[Point3::new(2.0, 2.0, 0.0)], Dim::Two)).unwrap()
    }

    #[test]
    fn test_square_room_first_order() {
        let mut room = square_room();
        let n = room.image_source_model(&Point3::new(1.0, 1.0, 0.0), 1).unwrap();
        assert_eq!(n, 5);

        let direct = room.image_sources().get(0).unwrap();
        assert_eq!(direct.order, 0);
        assert_eq!(direct.attenuation, 1.0);
        assert_eq!(direct.wall, None);

        let first: Vec<&ImageSource> = room.image_sources().iter().filter(|s| s.order == 1).collect();
        assert_eq!(first.len(), 4);
        for (i, s) in first.iter().enumerate() {
            assert!((s.attenuation - 0.8).abs() < 1e-12);
            assert_eq!(s.wall, Some(i));
            assert!(s.is_visible(0));
        }
    }

    #[test]
    fn test_corridor_attenuation() {
        let walls = vec![
            Wall::new_2d(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 0.1).unwrap(),
            Wall::new_2d(Point2::new(10.0, 2.0), Point2::new(0.0, 2.0), 0.3).unwrap(),
        ];
        let mut room = Room::new(walls, vec![], &mics(&[Point3::new(8.0, 1.0, 0.0)], Dim::Two)).unwrap();
        room.image_source_model(&Point3::new(2.0, 1.0, 0.0), 4).unwrap();

        // Two chains per order, alternating between the walls
        let set = room.image_sources();
        assert_eq!(set.len(), 9);
        assert_eq!(set.max_order(), Some(4));
        for s in set {
            if s.order == 0 {
                continue;
            }
            let last = s.wall.unwrap();
            let (n_last, n_other) = (s.order.div_ceil(2), s.order / 2);
            let (a_last, a_other) = if last == 0 { (0.9, 0.7) } else { (0.7, 0.9) };
            let expected = f64::powi(a_last, n_last as i32) * f64::powi(a_other, n_other as i32);
            assert!((s.attenuation - expected).abs() < 1e-12, "order {}", s.order);
        }
    }

    #[test]
    fn test_obstructing_wall_hides_direct_path() {
        let mut walls = polygon_walls(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)], 0.2);
        // Free-standing panel between source and microphone
        walls.push(Wall::new_2d(Point2::new(1.5, 0.5), Point2::new(1.5, 3.5), 0.5).unwrap());
        let room = Room::new(walls, vec![4], &mics(&[Point3::new(3.0, 2.0, 0.0)], Dim::Two)).unwrap();
        assert!(room.is_closed());

        let set = room.compute_image_sources(&Point3::new(0.5, 2.0, 0.0), 1).unwrap();
        assert!(set.iter().all(|s| s.order > 0));
        // The floor and ceiling reflections pass around the panel
        assert!(set.iter().any(|s| s.wall == Some(0)));
        assert!(set.iter().any(|s| s.wall == Some(2)));

        assert!(matches!(
            room.compute_image_sources(&Point3::new(9.0, 2.0, 0.0), 1),
            Err(RoomError::OutOfBounds { .. })
        ));
    }

    fn l_room(mic: Point3) -> Room {
        let walls = polygon_walls(
            &[(0.0, 0.0), (4.0, 0.0), (4.0, 2.0), (2.0, 2.0), (2.0, 4.0), (0.0, 4.0)],
            0.2,
        );
        Room::new(walls, vec![], &mics(&[mic], Dim::Two)).unwrap()
    }

    #[test]
    fn test_concave_room_hides_paths_through_notch() {
        let room = l_room(Point3::new(3.5, 1.5, 0.0));
        assert!(room.is_closed());

        // The straight line crosses the re-entrant walls
        let hidden = room.compute_image_sources(&Point3::new(1.5, 3.5, 0.0), 0).unwrap();
        assert!(hidden.is_empty());

        let seen = room.compute_image_sources(&Point3::new(1.0, 1.0, 0.0), 0).unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen.get(0).unwrap().is_visible(0));
    }

    #[test]
    fn test_concave_room_reflections_checked_per_leg() {
        let room = l_room(Point3::new(3.5, 1.5, 0.0));
        let source = Point3::new(1.5, 3.5, 0.0);
        let set = room.compute_image_sources(&source, 1).unwrap();
        for s in &set {
            assert_eq!(s.order, 1);
            let w = s.wall.unwrap();
            let hit = room.walls()[w]
                .intersection(room.mic_pos().unwrap(), &s.position)
                .unwrap()
                .point()
                .unwrap();
            assert!(!room.is_obstructed(room.mic_pos().unwrap(), &hit, &[Some(w)]));
            assert!(!room.is_obstructed(&hit, &source, &[Some(w)]));
        }
    }

    #[test]
    fn test_direct_path_visible_iff_contained() {
        let room = square_room();
        let set = room.compute_image_sources(&Point3::new(3.0, 0.5, 0.0), 0).unwrap();
        assert_eq!(set.len(), 1);
        assert!(room.contains(&Point3::new(3.0, 0.5, 0.0)));

        assert!(matches!(
            room.compute_image_sources(&Point3::new(5.0, 0.5, 0.0), 0),
            Err(RoomError::OutOfBounds { .. })
        ));
    }

    fn sorted(set: &ImageSourceSet) -> Vec<(Point3, usize, f64)> {
        let mut v: Vec<_> = set.iter().map(|s| (s.position, s.order, s.attenuation)).collect();
        v.sort_by(|a, b| {
            a.0.x
                .total_cmp(&b.0.x)
                .then(a.0.y.total_cmp(&b.0.y))
                .then(a.0.z.total_cmp(&b.0.z))
        });
        v
    }

    #[test]
    fn test_shoebox_matches_general_search() {
        let absorption = [0.1, 0.2, 0.3, 0.15, 0.25, 0.05];
        let walls = box_walls(4.0, 3.0, 2.0, absorption);
        let room = Room::new(
            walls,
            vec![],
            &mics(&[Point3::new(2.7, 1.9, 1.3)], Dim::Three),
        )
        .unwrap();
        let source = Point3::new(1.1, 0.8, 0.7);

        let general = room.compute_image_sources(&source, 3).unwrap();
        let shoebox = room
            .compute_shoebox_image_sources(&source, &[4.0, 3.0, 2.0], 3)
            .unwrap();
        assert_eq!(shoebox.len(), 63);
        assert_eq!(general.len(), 63);

        for (g, s) in sorted(&general).iter().zip(sorted(&shoebox).iter()) {
            assert!((g.0 - s.0).norm() < 1e-9);
            assert_eq!(g.1, s.1);
            assert!((g.2 - s.2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_shoebox_2d() {
        let walls = polygon_walls(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)], 0.2);
        let mut room = Room::new(walls, vec![], &mics(&[Point3::new(2.0, 2.0, 0.0)], Dim::Two)).unwrap();
        let n = room
            .image_source_shoebox(&Point3::new(1.0, 1.0, 0.0), &[4.0, 4.0], 2)
            .unwrap();
        // 1 + 4 + 8 lattice points with |nx| + |ny| <= 2
        assert_eq!(n, 13);
        let high_x = room
            .image_sources()
            .iter()
            .find(|s| s.position == Point3::new(7.0, 1.0, 0.0))
            .unwrap();
        assert_eq!(high_x.order, 1);
        assert!((high_x.attenuation - 0.8).abs() < 1e-12);
        assert!(room.image_sources().iter().all(|s| s.wall.is_none() && s.is_visible(0)));
    }

    #[test]
    fn test_shoebox_rejects_other_rooms() {
        let walls = polygon_walls(&[(0.0, 0.0), (4.0, 0.0), (5.0, 4.0), (0.0, 4.0)], 0.2);
        let room = Room::new(walls, vec![], &mics(&[Point3::new(2.0, 2.0, 0.0)], Dim::Two)).unwrap();
        assert!(matches!(
            room.compute_shoebox_image_sources(&Point3::new(1.0, 1.0, 0.0), &[4.0, 4.0], 1),
            Err(RoomError::NotShoebox(_))
        ));
        assert!(matches!(
            room.compute_shoebox_image_sources(&Point3::new(1.0, 1.0, 0.0), &[4.0, 4.0, 3.0], 1),
            Err(RoomError::DimensionMismatch { expected: 2, found: 3 })
        ));
    }
}
