//! Stochastic ray tracing with diffuse scattering.

use std::f64::consts::PI;

use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use roomsim_geom::{reflected_end, sphere_intersection, Ray};
use roomsim_math::{Dim, Point3, Vec3};

use crate::error::Result;
use crate::rir::{ContributionKind, EnergyHistogram, RirEntry};
use crate::room::Room;
use crate::settings::{RayTracingSettings, ScatteringLaw};
use crate::wall::Side;

/// Golden angle in radians, for the Fibonacci sphere.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Nearest wall hit along a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    /// Id of the wall.
    pub wall: usize,
    /// Hit point.
    pub point: Point3,
    /// Distance from the segment start.
    pub distance: f64,
}

/// A ray arriving at a wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounce {
    /// Id of the wall hit.
    pub wall: usize,
    /// Start of the incoming segment.
    pub from: Point3,
    /// Hit point.
    pub point: Point3,
    /// Distance travelled by the ray up to the hit point.
    pub travelled: f64,
}

/// How a ray's energy is split at a wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterSplit {
    /// Energy lost to the wall.
    pub absorbed: f64,
    /// Energy scattered diffusely.
    pub diffuse: f64,
    /// Energy reflected specularly.
    pub specular: f64,
}

impl ScatterSplit {
    /// Sum of the three shares.
    pub fn total(&self) -> f64 {
        self.absorbed + self.diffuse + self.specular
    }
}

/// Why a ray stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayTermination {
    /// Energy fell below the threshold.
    EnergyThreshold,
    /// The travel distance limit was reached.
    MaxDistance,
    /// Too many reflections.
    MaxBounces,
    /// The ray left the room without hitting a wall.
    Escaped,
}

/// Lifetime summary of one ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayOutcome {
    /// Why the ray stopped.
    pub termination: RayTermination,
    /// Number of wall reflections.
    pub bounces: usize,
    /// Distance travelled.
    pub distance: f64,
    /// Energy left when the ray stopped.
    pub energy: f64,
}

/// Counters of a ray-tracing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RayTracingSummary {
    /// Rays emitted.
    pub n_rays: usize,
    /// Entries recorded.
    pub n_entries: usize,
    /// Total reflections over all rays.
    pub total_bounces: usize,
    /// Rays stopped by the energy threshold.
    pub energy_threshold: usize,
    /// Rays stopped by the distance limit.
    pub max_distance: usize,
    /// Rays stopped by the bounce limit.
    pub max_bounces: usize,
    /// Rays that escaped the room.
    pub escaped: usize,
}

impl RayTracingSummary {
    fn record(&mut self, outcome: &RayOutcome) {
        self.total_bounces += outcome.bounces;
        match outcome.termination {
            RayTermination::EnergyThreshold => self.energy_threshold += 1,
            RayTermination::MaxDistance => self.max_distance += 1,
            RayTermination::MaxBounces => self.max_bounces += 1,
            RayTermination::Escaped => self.escaped += 1,
        }
    }
}

/// Entries and counters of a ray-tracing run.
#[derive(Debug, Clone, PartialEq)]
pub struct RayTracingResult {
    /// Recorded entries, grouped by ray in emission order.
    pub entries: Vec<RirEntry>,
    /// Run counters.
    pub summary: RayTracingSummary,
}

impl RayTracingResult {
    /// Bin the entries per microphone by arrival time.
    pub fn histogram(&self, bin: f64, sound_speed: f64, n_mics: usize) -> EnergyHistogram {
        EnergyHistogram::from_entries(&self.entries, bin, sound_speed, n_mics)
    }
}

/// Fraction of the half-space around a hit point covered by a capture
/// sphere of radius `r` at distance `d`.
fn hit_probability(dim: Dim, r: f64, d: f64) -> f64 {
    if d <= r {
        return 1.0;
    }
    let ratio = r / d;
    match dim {
        Dim::Two => 2.0 * ratio.asin() / PI,
        Dim::Three => 1.0 - (1.0 - ratio * ratio).sqrt(),
    }
}

/// Emission directions: uniform angles in 2D, a Fibonacci sphere in 3D.
fn emission_directions(dim: Dim, n: usize) -> Vec<Vec3> {
    match dim {
        Dim::Two => (0..n)
            .map(|i| {
                let phi = 2.0 * PI * i as f64 / n as f64;
                Vec3::new(phi.cos(), phi.sin(), 0.0)
            })
            .collect(),
        Dim::Three => (0..n)
            .map(|i| {
                let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
                let r = (1.0 - z * z).sqrt();
                let phi = GOLDEN_ANGLE * i as f64;
                Vec3::new(r * phi.cos(), r * phi.sin(), z)
            })
            .collect(),
    }
}

/// Seed of the generator of ray `index`.
fn ray_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64).wrapping_add(1).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

impl Room {
    /// Nearest wall hit along `[start, end]`, further than `eps` from `start`.
    ///
    /// With `scattered_ray` set only obstructing walls are considered.
    pub fn next_wall_hit(&self, start: &Point3, end: &Point3, scattered_ray: bool) -> Option<WallHit> {
        let ray = Ray::through(start, end).ok()?;
        let length = (end - start).norm();

        let candidates: Box<dyn Iterator<Item = usize> + '_> = if scattered_ray {
            Box::new(self.obstructing.iter().copied())
        } else {
            Box::new(0..self.walls.len())
        };

        let mut best: Option<WallHit> = None;
        for w in candidates {
            let wall = &self.walls[w];
            match ray.intersect_aabb(wall.aabb()) {
                Some((t_min, _)) if t_min <= length => {}
                _ => continue,
            }
            let point = match wall.intersection(start, end) {
                Ok(hit) => match hit.point() {
                    Some(p) => p,
                    None => continue,
                },
                Err(e) => {
                    trace!("skipping wall {w}: {e}");
                    continue;
                }
            };
            let distance = (point - start).norm();
            if distance <= self.tol.eps {
                continue;
            }
            let closer = match best {
                Some(b) => distance < b.distance,
                None => true,
            };
            if closer {
                best = Some(WallHit {
                    wall: w,
                    point,
                    distance,
                });
            }
        }
        best
    }

    /// Split `energy` at `bounce`.
    ///
    /// Under [`ScatteringLaw::DiffuseRain`] the diffuse share reaching each
    /// microphone visible from the hit point is recorded in `out`, at the
    /// travelled distance plus the way from the hit to the capture sphere.
    pub fn scat_ray(
        &self,
        energy: f64,
        bounce: &Bounce,
        settings: &RayTracingSettings,
        out: &mut Vec<RirEntry>,
    ) -> ScatterSplit {
        let Bounce {
            wall,
            from: prev_point,
            point: hit_point,
            travelled: travel_dist,
        } = *bounce;
        let w = &self.walls[wall];
        let absorbed = energy * w.absorption();
        let reflected = energy - absorbed;
        let diffuse = reflected * w.scattering();
        let split = ScatterSplit {
            absorbed,
            diffuse,
            specular: reflected - diffuse,
        };

        if settings.scattering_law != ScatteringLaw::DiffuseRain || diffuse <= 0.0 {
            return split;
        }

        let incoming_side = w.side(&prev_point);
        let max_distance = settings.max_distance();
        for (m, mic) in self.mics.iter().enumerate() {
            if w.side(mic) != incoming_side {
                continue;
            }
            if self.is_obstructed(&hit_point, mic, &[Some(wall)]) {
                continue;
            }
            let entry = match sphere_intersection(&hit_point, mic, mic, settings.mic_radius, &self.tol) {
                Ok(Some(p)) => p,
                Ok(None) => continue,
                Err(e) => {
                    trace!("diffuse rain to mic {m} skipped: {e}");
                    continue;
                }
            };
            let distance = travel_dist + (entry - hit_point).norm();
            if distance > max_distance {
                continue;
            }
            let p_hit = hit_probability(self.dim, settings.mic_radius, (mic - hit_point).norm());
            out.push(RirEntry {
                mic: m,
                distance,
                energy: diffuse * p_hit,
                kind: ContributionKind::Ray,
            });
        }
        split
    }

    /// Follow one ray from `origin` until it stops.
    pub fn simul_ray<R: Rng>(
        &self,
        origin: &Point3,
        direction: &Vec3,
        energy: f64,
        settings: &RayTracingSettings,
        rng: &mut R,
        out: &mut Vec<RirEntry>,
    ) -> Result<RayOutcome> {
        let mut dir = Ray::new(*origin, self.dim.flatten_vec(direction))?.direction.into_inner();
        let mut start = self.dim.flatten(origin);
        let mut energy_left = energy;
        let mut travelled = 0.0;
        let mut bounces = 0;
        let threshold = settings.energy_threshold * energy;
        let max_distance = settings.max_distance();

        let outcome = |termination, bounces, distance, energy| RayOutcome {
            termination,
            bounces,
            distance,
            energy,
        };

        loop {
            let end = start + dir * self.max_dist;
            let Some(hit) = self.next_wall_hit(&start, &end, false) else {
                trace!("ray escaped from {start:?} after {bounces} bounces");
                return Ok(outcome(RayTermination::Escaped, bounces, travelled, energy_left));
            };

            for (m, mic) in self.mics.iter().enumerate() {
                // A pass through a sphere around the last hit point was
                // recorded on the incoming segment
                if bounces > 0 && (start - mic).norm() <= settings.mic_radius + self.tol.eps {
                    continue;
                }
                if let Ok(Some(p)) =
                    sphere_intersection(&start, &hit.point, mic, settings.mic_radius, &self.tol)
                {
                    let distance = travelled + (p - start).norm();
                    if distance <= max_distance {
                        out.push(RirEntry {
                            mic: m,
                            distance,
                            energy: energy_left,
                            kind: ContributionKind::Ray,
                        });
                    }
                }
            }

            travelled += hit.distance;
            if travelled >= max_distance {
                return Ok(outcome(RayTermination::MaxDistance, bounces, travelled, energy_left));
            }

            let bounce = Bounce {
                wall: hit.wall,
                from: start,
                point: hit.point,
                travelled,
            };
            let split = self.scat_ray(energy_left, &bounce, settings, out);
            bounces += 1;

            let wall = &self.walls[hit.wall];
            let junction = self.junction_walls(&hit, &start);
            let specular = if junction.len() > 1 {
                trace!("ray hit the junction of walls {junction:?}");
                self.junction_reflection(&junction, &start, &dir)
            } else {
                reflected_end(&start, &hit.point, wall.normal().as_ref(), 1.0)? - hit.point
            };
            let (next_dir, next_energy) = match settings.scattering_law {
                ScatteringLaw::DiffuseRain => (specular, split.specular),
                ScatteringLaw::Lambertian => {
                    let kept = split.diffuse + split.specular;
                    if junction.len() == 1 && rng.random::<f64>() < wall.scattering() {
                        (self.lambertian_direction(hit.wall, &start, rng), kept)
                    } else {
                        (specular, kept)
                    }
                }
            };

            energy_left = next_energy;
            if energy_left < threshold {
                return Ok(outcome(RayTermination::EnergyThreshold, bounces, travelled, energy_left));
            }
            if bounces >= settings.max_bounces {
                return Ok(outcome(RayTermination::MaxBounces, bounces, travelled, energy_left));
            }

            start = hit.point;
            dir = self.dim.flatten_vec(&next_dir).normalize();
        }
    }

    /// Walls meeting at the hit point, starting with the wall that was hit.
    ///
    /// Walls containing `from` are left out.
    fn junction_walls(&self, hit: &WallHit, from: &Point3) -> Vec<usize> {
        let mut walls = vec![hit.wall];
        walls.extend((0..self.walls.len()).filter(|&i| {
            let wall = &self.walls[i];
            i != hit.wall && wall.side(from) != Side::On && wall.touches(&hit.point)
        }));
        walls
    }

    /// Outgoing direction at an edge or corner shared by `walls`.
    ///
    /// Mirrors `dir` about the mean of the wall normals turned toward `from`,
    /// which sends a ray back along itself in a right-angled corner. When
    /// the mirrored direction would still leave through one of the walls,
    /// the ray is sent straight back.
    fn junction_reflection(&self, walls: &[usize], from: &Point3, dir: &Vec3) -> Vec3 {
        let inward: Vec<Vec3> = walls
            .iter()
            .map(|&w| {
                let wall = &self.walls[w];
                let n = wall.normal().into_inner();
                if wall.side(from) == Side::Front {
                    n
                } else {
                    -n
                }
            })
            .collect();
        let sum = inward.iter().fold(Vec3::zeros(), |acc, n| acc + n);
        let Some(mean) = sum.try_normalize(self.tol.eps) else {
            return -dir;
        };
        let mirrored = dir - mean * (2.0 * dir.dot(&mean));
        if inward.iter().all(|n| n.dot(&mirrored) > 0.0) {
            mirrored
        } else {
            -dir
        }
    }

    /// Cosine-weighted direction leaving wall `w` toward the side of `from`.
    fn lambertian_direction<R: Rng>(&self, w: usize, from: &Point3, rng: &mut R) -> Vec3 {
        let wall = &self.walls[w];
        let sign = if wall.side(from) == Side::Front { 1.0 } else { -1.0 };
        let n = wall.normal().into_inner() * sign;
        let (b0, b1) = wall.basis();

        match self.dim {
            Dim::Two => {
                // Angle from the normal with density cos(theta) / 2
                let theta = (2.0 * rng.random::<f64>() - 1.0).asin();
                n * theta.cos() + b0.into_inner() * theta.sin()
            }
            Dim::Three => {
                let u1: f64 = rng.random();
                let phi = 2.0 * PI * rng.random::<f64>();
                let r = u1.sqrt();
                n * (1.0 - u1).sqrt() + b0.into_inner() * (r * phi.cos()) + b1.into_inner() * (r * phi.sin())
            }
        }
    }

    /// Ray tracing without touching the stored results.
    ///
    /// Rays start with energy `1 / n_rays` and run in parallel, each with its
    /// own generator seeded from `settings.seed` and the ray index. Entries
    /// are concatenated in ray order, so the result does not depend on
    /// scheduling.
    pub fn trace_rays(&self, source: &Point3, settings: &RayTracingSettings) -> Result<RayTracingResult> {
        settings.validate()?;
        let source = self.prepare_source(source)?;
        let energy = 1.0 / settings.n_rays as f64;
        let directions = emission_directions(self.dim, settings.n_rays);

        let per_ray: Vec<(RayOutcome, Vec<RirEntry>)> = directions
            .par_iter()
            .enumerate()
            .map(|(i, dir)| -> Result<(RayOutcome, Vec<RirEntry>)> {
                let mut rng = StdRng::seed_from_u64(ray_seed(settings.seed, i));
                let mut out = Vec::new();
                let outcome = self.simul_ray(&source, dir, energy, settings, &mut rng, &mut out)?;
                Ok((outcome, out))
            })
            .collect::<Result<_>>()?;

        let mut summary = RayTracingSummary {
            n_rays: settings.n_rays,
            ..Default::default()
        };
        let mut entries = Vec::new();
        for (outcome, out) in per_ray {
            summary.record(&outcome);
            entries.extend(out);
        }
        summary.n_entries = entries.len();

        if summary.escaped > 0 {
            warn!("{} of {} rays escaped the room", summary.escaped, summary.n_rays);
        }
        debug!(
            "ray tracing: {} rays, {} entries, {} bounces",
            summary.n_rays, summary.n_entries, summary.total_bounces
        );
        Ok(RayTracingResult { entries, summary })
    }

    /// Run the ray tracer and store its entries and histogram.
    pub fn ray_tracing(&mut self, source: &Point3, settings: &RayTracingSettings) -> Result<RayTracingSummary> {
        let result = self.trace_rays(source, settings)?;
        let summary = result.summary;
        self.histogram = Some(result.histogram(settings.hist_bin, settings.sound_speed, self.mics.len()));
        self.ray_result = Some(result);
        Ok(summary)
    }
}
