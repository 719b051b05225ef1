use std::any::Any;

use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{Device, daylight_frac, gaussian_noise};
use crate::sim::clock::Time;
use crate::sim::component::{Component, UpdateContext};

/// A solar PV generator that models power generation based on daylight hours.
///
/// `SolarPv` creates a half-sine shaped generation profile between sunrise and sunset
/// times with configurable peak power output and random noise to simulate
/// variations due to weather conditions.
///
/// # Power Flow Convention (Feeder)
/// Returns **negative** values during daylight (generation reduces feeder load).
#[derive(Debug, Clone)]
pub struct SolarPv {
    /// Maximum power output in kilowatts under ideal conditions.
    pub kw_peak: f32,

    /// Hour of day when generation starts (inclusive).
    pub sunrise_hr: f32,

    /// Hour of day when generation stops (exclusive).
    pub sunset_hr: f32,

    /// Standard deviation of the Gaussian noise as a fraction of output.
    pub noise_std: f32,

    output_kw: f32,

    /// Random number generator for noise generation.
    rng: StdRng,
}

impl SolarPv {
    /// Creates a new solar PV generator with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `kw_peak` - Maximum power output in kilowatts under ideal conditions
    /// * `sunrise_hr` - Hour of day when generation starts
    /// * `sunset_hr` - Hour of day when generation stops
    /// * `noise_std` - Standard deviation of noise (e.g., 0.05 for +/-5% variation)
    /// * `seed` - Random seed for reproducible noise generation
    ///
    /// # Panics
    ///
    /// Panics unless `0 <= sunrise_hr < sunset_hr <= 24`.
    pub fn new(kw_peak: f32, sunrise_hr: f32, sunset_hr: f32, noise_std: f32, seed: u64) -> Self {
        assert!((0.0..24.0).contains(&sunrise_hr) && sunrise_hr < sunset_hr && sunset_hr <= 24.0);
        Self {
            kw_peak: kw_peak.max(0.0),
            sunrise_hr,
            sunset_hr,
            noise_std: noise_std.max(0.0),
            output_kw: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generation at `hour` of day in feeder convention (zero or negative).
    pub fn generation_kw(&mut self, hour: f32) -> f32 {
        let frac = daylight_frac(hour, self.sunrise_hr, self.sunset_hr);
        if frac <= 0.0 {
            return 0.0;
        }

        let noise_mult = 1.0 + gaussian_noise(&mut self.rng, self.noise_std);
        let kw = self.kw_peak * frac * noise_mult;

        // Return negative for generation (feeder convention: negative = export)
        -(kw.max(0.0))
    }
}

impl Device for SolarPv {
    fn power_kw(&self) -> f32 {
        self.output_kw
    }
}

impl Component for SolarPv {
    fn component_type(&self) -> &'static str {
        "SolarPV"
    }

    fn update_state(&mut self, t: Time, _ctx: &mut UpdateContext<'_>) {
        self.output_kw = match t.hour_of_day() {
            Some(hour) => self.generation_kw(hour),
            None => 0.0,
        };
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
