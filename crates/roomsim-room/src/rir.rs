//! Room impulse response entries.

/// Where an RIR contribution comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionKind {
    /// Exact specular path from an image source of the given order.
    ImageSource {
        /// Number of wall reflections.
        order: usize,
    },
    /// Energy deposited by the ray tracer.
    Ray,
}

/// One discrete contribution to a microphone's impulse response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RirEntry {
    /// Microphone index.
    pub mic: usize,
    /// Travelled path length.
    pub distance: f64,
    /// Image-source attenuation or ray energy.
    pub energy: f64,
    /// Origin of the contribution.
    pub kind: ContributionKind,
}

impl RirEntry {
    /// Arrival delay in seconds.
    pub fn delay(&self, sound_speed: f64) -> f64 {
        self.distance / sound_speed
    }
}

/// Sort by microphone, then by distance.
pub(crate) fn sort_entries(entries: &mut [RirEntry]) {
    entries.sort_by(|a, b| a.mic.cmp(&b.mic).then(a.distance.total_cmp(&b.distance)));
}

/// Ray-tracing energy binned per microphone by arrival time.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyHistogram {
    bin_width: f64,
    bins: Vec<Vec<f64>>,
}

impl EnergyHistogram {
    /// Bin `entries` into slots of `bin_width` seconds.
    ///
    /// Entries for microphones at or beyond `n_mics` are ignored.
    pub fn from_entries(entries: &[RirEntry], bin_width: f64, sound_speed: f64, n_mics: usize) -> Self {
        let mut bins = vec![Vec::new(); n_mics];
        for entry in entries {
            let Some(hist) = bins.get_mut(entry.mic) else {
                continue;
            };
            let slot = (entry.delay(sound_speed) / bin_width).floor() as usize;
            if hist.len() <= slot {
                hist.resize(slot + 1, 0.0);
            }
            hist[slot] += entry.energy;
        }
        Self { bin_width, bins }
    }

    /// Width of a bin in seconds.
    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// Number of microphones.
    pub fn n_mics(&self) -> usize {
        self.bins.len()
    }

    /// Energy per bin for one microphone.
    pub fn mic(&self, mic: usize) -> &[f64] {
        self.bins.get(mic).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total energy received by a microphone.
    pub fn total_energy(&self, mic: usize) -> f64 {
        self.mic(mic).iter().sum()
    }
}
