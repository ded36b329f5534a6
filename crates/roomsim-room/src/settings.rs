//! Ray-tracing parameters.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomError};

/// How scattered energy leaves a wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScatteringLaw {
    /// The ray continues specularly; the scattered share is deposited at
    /// every microphone visible from the hit point.
    #[default]
    DiffuseRain,
    /// With probability equal to the scattering coefficient the ray
    /// continues in a cosine-weighted random direction.
    Lambertian,
}

/// Ray-tracing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayTracingSettings {
    /// Number of rays emitted from the source.
    pub n_rays: usize,
    /// Radius of the capture sphere around each microphone (m).
    pub mic_radius: f64,
    /// Rays stop once their energy drops below this fraction of the initial energy.
    pub energy_threshold: f64,
    /// Rays stop after travelling for this long (s).
    pub time_threshold: f64,
    /// Speed of sound (m/s).
    pub sound_speed: f64,
    /// Maximum number of wall reflections per ray.
    pub max_bounces: usize,
    /// Scattering model.
    pub scattering_law: ScatteringLaw,
    /// Seed for the per-ray random generators.
    pub seed: u64,
    /// Histogram bin width (s).
    pub hist_bin: f64,
}

impl Default for RayTracingSettings {
    fn default() -> Self {
        Self {
            n_rays: 10_000,
            mic_radius: 0.15,
            energy_threshold: 1e-7,
            time_threshold: 1.0,
            sound_speed: 343.0,
            max_bounces: 10_000,
            scattering_law: ScatteringLaw::DiffuseRain,
            seed: 0,
            hist_bin: 0.004,
        }
    }
}

impl RayTracingSettings {
    /// Maximum travelled distance of a ray (m).
    pub fn max_distance(&self) -> f64 {
        self.time_threshold * self.sound_speed
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.n_rays == 0 {
            return Err(RoomError::InvalidSettings("n_rays must be positive".into()));
        }
        if !self.mic_radius.is_finite() || self.mic_radius <= 0.0 {
            return Err(RoomError::InvalidSettings(
                "mic_radius must be positive".into(),
            ));
        }
        if self.energy_threshold.is_nan() || self.energy_threshold <= 0.0 || self.energy_threshold >= 1.0 {
            return Err(RoomError::InvalidSettings(
                "energy_threshold must be between 0 and 1".into(),
            ));
        }
        if !self.time_threshold.is_finite() || self.time_threshold <= 0.0 {
            return Err(RoomError::InvalidSettings(
                "time_threshold must be positive".into(),
            ));
        }
        if !self.sound_speed.is_finite() || self.sound_speed <= 0.0 {
            return Err(RoomError::InvalidSettings(
                "sound_speed must be positive".into(),
            ));
        }
        if self.max_bounces == 0 {
            return Err(RoomError::InvalidSettings(
                "max_bounces must be positive".into(),
            ));
        }
        if !self.hist_bin.is_finite() || self.hist_bin <= 0.0 {
            return Err(RoomError::InvalidSettings("hist_bin must be positive".into()));
        }
        Ok(())
    }
}
