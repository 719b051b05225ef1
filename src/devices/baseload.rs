use std::any::Any;

use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, gaussian_noise};
use crate::sim::clock::Time;
use crate::sim::component::{Component, UpdateContext};

/// A baseload generator that models daily electricity consumption patterns.
///
/// `BaseLoad` creates a sinusoidal power demand pattern with configurable baseline,
/// amplitude, phase, and random noise to simulate typical daily load patterns.
///
/// # Examples
///
/// ```
/// use sgt_sim::devices::baseload::BaseLoad;
///
/// // Create a baseload with typical parameters
/// let mut load = BaseLoad::new(
///     1.0,   // base_kw - average consumption
///     0.5,   // amp_kw - daily variation
///     0.0,   // phase_rad - no phase shift
///     0.05,  // noise_std - small random variation
///     42,    // seed - for reproducible randomness
/// );
///
/// // Get demand at noon
/// let demand = load.demand_kw(12.0);
/// assert!(demand >= 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct BaseLoad {
    /// Baseline power consumption in kilowatts
    pub base_kw: f32,

    /// Amplitude of the sinusoidal variation in kilowatts
    pub amp_kw: f32,

    /// Phase offset of the sinusoidal pattern in radians
    pub phase_rad: f32,

    /// Standard deviation of the Gaussian noise in kilowatts
    pub noise_std: f32,

    last_kw: f32,

    /// Random number generator for noise generation
    rng: StdRng,
}

impl BaseLoad {
    /// Creates a new baseload generator with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `base_kw` - The baseline power consumption in kilowatts
    /// * `amp_kw` - The amplitude of sinusoidal daily variation in kilowatts
    /// * `phase_rad` - The phase offset in radians
    /// * `noise_std` - The standard deviation of Gaussian noise in kilowatts
    /// * `seed` - Random seed for reproducible noise generation
    pub fn new(base_kw: f32, amp_kw: f32, phase_rad: f32, noise_std: f32, seed: u64) -> Self {
        Self {
            base_kw,
            amp_kw,
            phase_rad,
            noise_std,
            last_kw: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Calculates the power demand at `hour` of day.
    ///
    /// The demand combines the baseline, a sinusoidal daily pattern and
    /// Gaussian noise, and is never negative.
    pub fn demand_kw(&mut self, hour: f32) -> f32 {
        let day_pos = hour.rem_euclid(24.0) / 24.0; // [0,1)
        let angle = 2.0 * std::f32::consts::PI * day_pos + self.phase_rad;
        let noise = gaussian_noise(&mut self.rng, self.noise_std);

        let kw = self.base_kw + self.amp_kw * angle.sin() + noise;
        kw.max(0.0) // no negative demand
    }
}

impl Device for BaseLoad {
    fn power_kw(&self) -> f32 {
        self.last_kw
    }
}

impl Component for BaseLoad {
    fn component_type(&self) -> &'static str {
        "BaseLoad"
    }

    fn update_state(&mut self, t: Time, _ctx: &mut UpdateContext<'_>) {
        if let Some(hour) = t.hour_of_day() {
            self.last_kw = self.demand_kw(hour);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
