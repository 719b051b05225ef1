//! Common types and helpers for grid device components.

use rand::{Rng, rngs::StdRng};

use super::{BaseLoad, Battery, Feeder, SolarPv};
use crate::sim::component::{ComponentId, UpdateContext};

/// A device whose state reduces to a signed power flow at the feeder.
///
/// Positive values are consumption (load), negative values generation.
pub trait Device {
    /// Power drawn at the last update, in kilowatts.
    fn power_kw(&self) -> f32;
}

/// Reads the power of any known device among the running component's peers.
///
/// # Returns
///
/// `None` if `id` is unknown, is the running component, or is not a device.
pub fn peer_power_kw(ctx: &UpdateContext<'_>, id: ComponentId) -> Option<f32> {
    ctx.peer::<SolarPv>(id)
        .map(Device::power_kw)
        .or_else(|| ctx.peer::<BaseLoad>(id).map(Device::power_kw))
        .or_else(|| ctx.peer::<Battery>(id).map(Device::power_kw))
        .or_else(|| ctx.peer::<Feeder>(id).map(Device::power_kw))
}

/// Sums [`peer_power_kw`] over `inputs`, skipping non-devices.
pub fn sum_peer_power_kw(ctx: &UpdateContext<'_>, inputs: &[ComponentId]) -> f32 {
    inputs
        .iter()
        .filter_map(|&id| peer_power_kw(ctx, id))
        .sum()
}

/// Fraction of peak output on a half-sine between sunrise and sunset.
///
/// # Arguments
///
/// * `hour` - Hour of day in `[0, 24)`
/// * `sunrise_hr` - Hour generation starts (inclusive)
/// * `sunset_hr` - Hour generation stops (exclusive)
///
/// # Returns
///
/// A value in `[0, 1]`, zero outside daylight.
pub fn daylight_frac(hour: f32, sunrise_hr: f32, sunset_hr: f32) -> f32 {
    if hour < sunrise_hr || hour >= sunset_hr || sunset_hr <= sunrise_hr {
        return 0.0;
    }
    let x = (hour - sunrise_hr) / (sunset_hr - sunrise_hr);
    (std::f32::consts::PI * x).sin().max(0.0)
}

/// Utility function to generate Gaussian noise using Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and specified standard deviation
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f32) -> f32 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f32 = rng.random::<f32>().clamp(1e-6, 1.0);
    let u2: f32 = rng.random::<f32>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
    z0 * std_dev
}
