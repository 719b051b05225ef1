//! Per-instant records produced by a scenario run.

use std::fmt;

use super::clock::Time;

/// Grid state captured once an instant has settled.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// The settled instant.
    pub time: Time,
    /// Solar generation in feeder convention (kW, negative during daylight).
    pub solar_kw: f32,
    /// Base-load demand (kW, positive).
    pub load_kw: f32,
    /// Battery setpoint (kW, positive = charging).
    pub battery_kw: f32,
    /// Battery state of charge (0.0 to 1.0).
    pub battery_soc: f32,
    /// Feeder net load (kW).
    pub feeder_kw: f32,
    /// Whether feeder net load is within import/export limits.
    pub within_feeder_limits: bool,
    /// Component updates needed to settle this instant.
    pub updates: u64,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>8} | feeder={:>6.2} kW | load={:.2}  solar={:.2}  bat={:.2} \
             (SoC={:.1}%) | updates={} ok={}",
            self.time.to_string(),
            self.feeder_kw,
            self.load_kw,
            self.solar_kw,
            self.battery_kw,
            self.battery_soc * 100.0,
            self.updates,
            self.within_feeder_limits,
        )
    }
}

/// One component update observed through its `did_update` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecord {
    /// Time the component was brought to.
    pub time: Time,
    /// Component name.
    pub component: String,
}

impl fmt::Display for UpdateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}  {}", self.time.to_string(), self.component)
    }
}
