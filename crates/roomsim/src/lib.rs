#![warn(missing_docs)]

//! Geometric room acoustics for roomsim.
//!
//! Re-exports the kernel layers and the types most callers need: build
//! [`Wall`]s, put them in a [`Room`] with some microphones, then run the
//! image-source model and/or the ray tracer and collect the
//! [`RirEntry`] list from [`Room::get_rir_entries`].
//!
//! # Example
//!
//! ```
//! use nalgebra::DMatrix;
//! use roomsim::{Point3, Room, Wall};
//!
//! let (l, w, h) = (4.0, 3.0, 2.0);
//! let p = Point3::new;
//! let walls = [
//!     vec![p(0.0, 0.0, 0.0), p(0.0, 0.0, h), p(0.0, w, h), p(0.0, w, 0.0)],
//!     vec![p(l, 0.0, 0.0), p(l, w, 0.0), p(l, w, h), p(l, 0.0, h)],
//!     vec![p(0.0, 0.0, 0.0), p(l, 0.0, 0.0), p(l, 0.0, h), p(0.0, 0.0, h)],
//!     vec![p(0.0, w, 0.0), p(0.0, w, h), p(l, w, h), p(l, w, 0.0)],
//!     vec![p(0.0, 0.0, 0.0), p(0.0, w, 0.0), p(l, w, 0.0), p(l, 0.0, 0.0)],
//!     vec![p(0.0, 0.0, h), p(l, 0.0, h), p(l, w, h), p(0.0, w, h)],
//! ]
//! .into_iter()
//! .map(|corners| Wall::new_3d(corners, 0.1))
//! .collect::<Result<Vec<_>, _>>()?;
//!
//! let mics = DMatrix::from_column_slice(3, 1, &[3.0, 2.0, 1.0]);
//! let mut room = Room::new(walls, vec![], &mics)?;
//! let n = room.image_source_shoebox(&p(1.0, 1.0, 1.0), &[l, w, h], 2)?;
//! assert_eq!(n, 25);
//! # Ok::<(), roomsim::RoomError>(())
//! ```

pub use roomsim_geom;
pub use roomsim_math;
pub use roomsim_room;

pub use roomsim_geom::{
    angle_between, cos_angle_between, distance_to_line, intersects_sphere, line_equation,
    orientation, point_in_polygon, polygon_area, reflected_end, segment_end, segment_end_2d,
    segment_intersection_2d, segment_plane_intersection, solve_quadratic, sphere_intersection,
    GeometryError, Intersection, Orientation, Plane, PolygonLocation, QuadraticRoots, Ray,
};
pub use roomsim_math::{
    default_eps, set_default_eps, Aabb3, Dim, Point2, Point3, Tolerance, Vec2, Vec3,
};
pub use roomsim_room::{
    Bounce, ContributionKind, EnergyHistogram, ImageSource, ImageSourceSet, RayOutcome,
    RayTermination, RayTracingResult, RayTracingSettings, RayTracingSummary, RirEntry, Room,
    RoomError, ScatterSplit, ScatteringLaw, Side, Wall, WallHit,
};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn square_room(side: f64, absorption: f64, mics: &[(f64, f64)]) -> Room {
        let corners = [(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)];
        let walls = (0..4)
            .map(|i| {
                let (x0, y0) = corners[i];
                let (x1, y1) = corners[(i + 1) % 4];
                Wall::new_2d(Point2::new(x0, y0), Point2::new(x1, y1), absorption).unwrap()
            })
            .collect();
        let coords: Vec<f64> = mics.iter().flat_map(|&(x, y)| [x, y]).collect();
        let mics = DMatrix::from_column_slice(2, mics.len(), &coords);
        Room::new(walls, vec![], &mics).unwrap()
    }

    fn box_room(dims: [f64; 3], absorption: f64, scattering: f64, mic: Point3) -> Room {
        let [l, w, h] = dims;
        let p = Point3::new;
        let walls = [
            vec![p(0.0, 0.0, 0.0), p(0.0, 0.0, h), p(0.0, w, h), p(0.0, w, 0.0)],
            vec![p(l, 0.0, 0.0), p(l, w, 0.0), p(l, w, h), p(l, 0.0, h)],
            vec![p(0.0, 0.0, 0.0), p(l, 0.0, 0.0), p(l, 0.0, h), p(0.0, 0.0, h)],
            vec![p(0.0, w, 0.0), p(0.0, w, h), p(l, w, h), p(l, w, 0.0)],
            vec![p(0.0, 0.0, 0.0), p(0.0, w, 0.0), p(l, w, 0.0), p(l, 0.0, 0.0)],
            vec![p(0.0, 0.0, h), p(l, 0.0, h), p(l, w, h), p(0.0, w, h)],
        ]
        .into_iter()
        .map(|c| Wall::new_3d(c, absorption).unwrap().with_scattering(scattering).unwrap())
        .collect();
        let mics = DMatrix::from_column_slice(3, 1, &[mic.x, mic.y, mic.z]);
        Room::new(walls, vec![], &mics).unwrap()
    }

    fn key(s: &ImageSource) -> (i64, i64, i64, usize, i64) {
        let q = |v: f64| (v * 1e6).round() as i64;
        (q(s.position.x), q(s.position.y), q(s.position.z), s.order, q(s.attenuation))
    }

    #[test]
    fn test_square_first_order_entries() {
        let mut room = square_room(4.0, 0.2, &[(2.0, 2.0)]);
        let n = room.image_source_model(&Point3::new(1.0, 1.0, 0.0), 1).unwrap();
        assert_eq!(n, 5);

        let entries = room.get_rir_entries();
        assert_eq!(entries.len(), 5);

        let direct = &entries[0];
        assert_eq!(direct.kind, ContributionKind::ImageSource { order: 0 });
        assert_relative_eq!(direct.distance, 2.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(direct.energy, 1.0, epsilon = 1e-12);

        let expected = [10.0_f64.sqrt(), 10.0_f64.sqrt(), 26.0_f64.sqrt(), 26.0_f64.sqrt()];
        for (entry, d) in entries[1..].iter().zip(expected) {
            assert_eq!(entry.kind, ContributionKind::ImageSource { order: 1 });
            assert_relative_eq!(entry.distance, d, epsilon = 1e-12);
            assert_relative_eq!(entry.energy, 0.8, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_entries_grouped_per_mic() {
        let mut room = square_room(4.0, 0.2, &[(3.0, 3.0), (2.0, 2.0)]);
        room.image_source_model(&Point3::new(1.0, 1.0, 0.0), 2).unwrap();
        let entries = room.get_rir_entries();

        let per_mic = |m: usize| entries.iter().filter(|e| e.mic == m).count();
        assert_eq!(per_mic(0) + per_mic(1), entries.len());
        assert_eq!(per_mic(0), per_mic(1));
        for pair in entries.windows(2) {
            assert!(
                pair[0].mic < pair[1].mic
                    || (pair[0].mic == pair[1].mic && pair[0].distance <= pair[1].distance)
            );
        }
    }

    #[test]
    fn test_shoebox_matches_general_search() {
        let source = Point3::new(1.1, 0.8, 0.7);
        let room = box_room([4.0, 3.0, 2.0], 0.25, 0.0, Point3::new(2.7, 1.9, 1.3));

        let mut general: Vec<_> = room
            .compute_image_sources(&source, 3)
            .unwrap()
            .iter()
            .map(key)
            .collect();
        let mut shoebox: Vec<_> = room
            .compute_shoebox_image_sources(&source, &[4.0, 3.0, 2.0], 3)
            .unwrap()
            .iter()
            .map(key)
            .collect();
        general.sort_unstable();
        shoebox.sort_unstable();
        assert_eq!(general, shoebox);
    }

    #[test]
    fn test_source_outside_closed_room_rejected() {
        let mut room = square_room(4.0, 0.2, &[(2.0, 2.0)]);
        let err = room.image_source_model(&Point3::new(5.0, 1.0, 0.0), 1).unwrap_err();
        assert!(matches!(err, RoomError::OutOfBounds { .. }));
        assert!(room.image_sources().is_empty());
    }

    #[test]
    fn test_contains_box() {
        let room = box_room([4.0, 3.0, 2.0], 0.1, 0.0, Point3::new(1.0, 1.0, 1.0));
        assert!(room.contains(&Point3::new(2.0, 1.5, 1.0)));
        assert!(room.contains(&Point3::new(0.0, 1.5, 1.0)));
        assert!(!room.contains(&Point3::new(4.5, 1.5, 1.0)));
        assert!(!room.contains(&Point3::new(2.0, 1.5, -0.1)));
    }

    #[test]
    fn test_ray_tracing_merges_with_image_sources() {
        let mut room = box_room([4.0, 3.0, 2.0], 0.3, 0.2, Point3::new(3.0, 2.0, 1.0));
        let source = Point3::new(1.0, 1.0, 1.0);
        room.image_source_model(&source, 1).unwrap();

        let settings = RayTracingSettings {
            n_rays: 500,
            mic_radius: 0.3,
            time_threshold: 0.05,
            ..Default::default()
        };
        let summary = room.ray_tracing(&source, &settings).unwrap();
        assert_eq!(summary.n_rays, 500);
        assert_eq!(summary.escaped, 0);
        assert!(summary.n_entries > 0);

        let entries = room.get_rir_entries();
        let n_ism = entries
            .iter()
            .filter(|e| matches!(e.kind, ContributionKind::ImageSource { .. }))
            .count();
        let n_rays = entries.iter().filter(|e| e.kind == ContributionKind::Ray).count();
        assert_eq!(n_ism, 7);
        assert_eq!(n_rays, summary.n_entries);
        for pair in entries.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }

        let ray_energy: f64 = room.ray_entries().iter().map(|e| e.energy).sum();
        let hist = room.histogram().unwrap();
        assert_relative_eq!(hist.total_energy(0), ray_energy, epsilon = 1e-9);
    }

    #[test]
    fn test_ray_tracing_deterministic_for_seed() {
        let source = Point3::new(1.0, 1.0, 1.0);
        let settings = RayTracingSettings {
            n_rays: 200,
            time_threshold: 0.05,
            scattering_law: ScatteringLaw::Lambertian,
            seed: 7,
            ..Default::default()
        };
        let room = box_room([4.0, 3.0, 2.0], 0.3, 0.5, Point3::new(3.0, 2.0, 1.0));
        let a = room.trace_rays(&source, &settings).unwrap();
        let b = room.trace_rays(&source, &settings).unwrap();
        assert_eq!(a.entries, b.entries);
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn test_default_tolerance_is_captured_by_walls() {
        let wall = Wall::new_2d(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), 0.1).unwrap();
        assert_eq!(wall.tolerance().eps, default_eps());
        assert_eq!(Tolerance::default().eps, default_eps());
    }
}
