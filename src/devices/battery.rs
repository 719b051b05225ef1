use std::any::Any;

use tracing::trace;

use crate::devices::types::{Device, sum_peer_power_kw};
use crate::sim::clock::Time;
use crate::sim::component::{Component, ComponentId, UpdateContext};

/// SOC distance from a bound treated as sitting on it.
const SOC_EPS: f32 = 1e-4;

/// A battery energy storage system that can charge and discharge electricity.
///
/// `Battery` models a battery with configurable capacity, charge/discharge rates,
/// and efficiencies. Each update first integrates the power held since the
/// previous update, then re-dispatches to offset the net load of its inputs.
///
/// # Power Flow Convention (Feeder)
/// - Positive power: Charging (consuming power from the grid / load)
/// - Negative power: Discharging (supplying power to the grid / generation)
#[derive(Debug, Clone)]
pub struct Battery {
    /// Battery capacity in kilowatt-hours.
    pub capacity_kwh: f32,

    /// State of charge as a fraction (0.0 to 1.0).
    pub soc: f32,

    /// Maximum charge power in kilowatts (positive value).
    pub max_charge_kw: f32,

    /// Maximum discharge power in kilowatts (positive value).
    pub max_discharge_kw: f32,

    /// Charging efficiency (0..1.0).
    pub eta_c: f32,

    /// Discharging efficiency (0..1.0).
    pub eta_d: f32,

    inputs: Vec<ComponentId>,
    power_kw: f32,
    last_update: Time,
}

impl Battery {
    /// Creates a new battery with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `capacity_kwh` - Battery capacity in kWh (must be > 0)
    /// * `soc` - Initial state of charge as a fraction (0.0 to 1.0)
    /// * `max_charge_kw` - Maximum charging power in kW
    /// * `max_discharge_kw` - Maximum discharging power in kW
    /// * `eta_c` - Charging efficiency (0..1.0)
    /// * `eta_d` - Discharging efficiency (0..1.0)
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero/negative, SOC out of range, or efficiencies invalid.
    pub fn new(
        capacity_kwh: f32,
        soc: f32,
        max_charge_kw: f32,
        max_discharge_kw: f32,
        eta_c: f32,
        eta_d: f32,
    ) -> Self {
        assert!(capacity_kwh > 0.0);
        assert!((0.0..=1.0).contains(&soc));
        assert!(max_charge_kw >= 0.0 && max_discharge_kw >= 0.0);
        assert!(eta_c > 0.0 && eta_c <= 1.0);
        assert!(eta_d > 0.0 && eta_d <= 1.0);

        Self {
            capacity_kwh,
            soc,
            max_charge_kw,
            max_discharge_kw,
            eta_c,
            eta_d,
            inputs: Vec::new(),
            power_kw: 0.0,
            last_update: Time::NEG_INFINITY,
        }
    }

    /// Sets the components whose net power the battery offsets.
    pub fn with_inputs(mut self, inputs: Vec<ComponentId>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Components whose net power the battery offsets.
    pub fn inputs(&self) -> &[ComponentId] {
        &self.inputs
    }

    /// Holds `setpoint_kw` for `dt_hours` and returns the power actually drawn.
    ///
    /// Enforces charge/discharge power limits, SOC bounds, and efficiency losses.
    pub fn apply(&mut self, setpoint_kw: f32, dt_hours: f32) -> f32 {
        if dt_hours <= 0.0 {
            return 0.0;
        }
        let cmd_kw = self.limit(setpoint_kw);

        let actual_kw = if cmd_kw > 0.0 {
            // Charging: limit by available capacity
            let max_kwh = (1.0 - self.soc) * self.capacity_kwh / self.eta_c;
            let actual_kw = cmd_kw.min((max_kwh / dt_hours).max(0.0));
            self.soc += (actual_kw * dt_hours * self.eta_c) / self.capacity_kwh;
            actual_kw
        } else if cmd_kw < 0.0 {
            // Discharging: limit by available energy
            let max_kwh = self.soc * self.capacity_kwh * self.eta_d;
            let actual_abs_kw = (-cmd_kw).min((max_kwh / dt_hours).max(0.0));
            self.soc -= (actual_abs_kw * dt_hours) / (self.capacity_kwh * self.eta_d);
            -actual_abs_kw
        } else {
            0.0
        };

        self.soc = self.soc.clamp(0.0, 1.0);
        actual_kw
    }

    /// Setpoint that cancels `net_kw` within power and SOC limits.
    pub fn dispatch(&self, net_kw: f32) -> f32 {
        let setpoint = self.limit(-net_kw);
        if (setpoint > 0.0 && self.soc >= 1.0 - SOC_EPS) || (setpoint < 0.0 && self.soc <= SOC_EPS) {
            0.0
        } else {
            setpoint
        }
    }

    fn limit(&self, setpoint_kw: f32) -> f32 {
        if setpoint_kw >= 0.0 {
            setpoint_kw.min(self.max_charge_kw)
        } else {
            setpoint_kw.max(-self.max_discharge_kw)
        }
    }

    /// Hours until the current setpoint drives SOC onto a bound.
    fn hours_to_bound(&self) -> Option<f32> {
        if self.power_kw > 0.0 {
            Some((1.0 - self.soc) * self.capacity_kwh / (self.eta_c * self.power_kw))
        } else if self.power_kw < 0.0 {
            Some(self.soc * self.capacity_kwh * self.eta_d / -self.power_kw)
        } else {
            None
        }
    }
}

impl Device for Battery {
    fn power_kw(&self) -> f32 {
        self.power_kw
    }
}

impl Component for Battery {
    fn component_type(&self) -> &'static str {
        "Battery"
    }

    fn initialize_state(&mut self, _ctx: &mut UpdateContext<'_>) {
        self.power_kw = 0.0;
        self.last_update = Time::NEG_INFINITY;
    }

    fn update_state(&mut self, t: Time, ctx: &mut UpdateContext<'_>) {
        let dt_hours = t.hours_since(ctx.last_updated());
        let held_kw = self.power_kw;
        let actual_kw = self.apply(held_kw, dt_hours);

        let net_kw = sum_peer_power_kw(ctx, &self.inputs);
        self.power_kw = self.dispatch(net_kw);
        self.last_update = t;
        trace!(
            time = %t,
            held_kw,
            actual_kw,
            net_kw,
            setpoint_kw = self.power_kw,
            soc = self.soc,
            "battery dispatch"
        );
    }

    /// The instant SOC would hit a bound under the current setpoint.
    fn valid_until(&self) -> Time {
        match self.hours_to_bound() {
            Some(hours) => {
                let secs = (hours * 3600.0).ceil().max(1.0);
                if secs < i64::MAX as f32 {
                    self.last_update.offset(secs as i64)
                } else {
                    Time::POS_INFINITY
                }
            }
            None => Time::POS_INFINITY,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
