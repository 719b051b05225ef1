use std::any::Any;

use tracing::warn;

use crate::devices::types::{Device, sum_peer_power_kw};
use crate::sim::clock::Time;
use crate::sim::component::{Component, ComponentId, UpdateContext};

/// A simple feeder model that aggregates device power into net load.
///
/// Net load convention:
/// - Positive values increase feeder load (consumption)
/// - Negative values reduce feeder load (generation)
#[derive(Debug, Clone)]
pub struct Feeder {
    inputs: Vec<ComponentId>,
    net_kw: f32,
    max_import_kw: f32,
    max_export_kw: f32,
}

impl Feeder {
    /// Creates a new feeder with no power limits.
    pub fn new(inputs: Vec<ComponentId>) -> Self {
        Self {
            inputs,
            net_kw: 0.0,
            max_import_kw: f32::INFINITY,
            max_export_kw: f32::INFINITY,
        }
    }

    /// Creates a new feeder with import and export power limits.
    ///
    /// # Panics
    ///
    /// Panics if `max_import_kw` or `max_export_kw` is negative.
    pub fn with_limits(inputs: Vec<ComponentId>, max_import_kw: f32, max_export_kw: f32) -> Self {
        assert!(max_import_kw >= 0.0);
        assert!(max_export_kw >= 0.0);

        Self {
            inputs,
            net_kw: 0.0,
            max_import_kw,
            max_export_kw,
        }
    }

    /// Components summed into the net load.
    pub fn inputs(&self) -> &[ComponentId] {
        &self.inputs
    }

    /// Resets accumulated net load to zero.
    pub fn reset(&mut self) {
        self.net_kw = 0.0;
    }

    /// Adds a signed contribution to feeder net load.
    pub fn add_net_kw(&mut self, kw: f32) {
        self.net_kw += kw;
    }

    /// Returns the current net load in kW.
    pub fn net_kw(&self) -> f32 {
        self.net_kw
    }

    /// Returns the maximum import (positive load) limit in kW.
    pub fn max_import_kw(&self) -> f32 {
        self.max_import_kw
    }

    /// Returns the maximum export (negative load) limit in kW.
    pub fn max_export_kw(&self) -> f32 {
        self.max_export_kw
    }

    /// Returns `true` when net load is within import/export limits.
    pub fn within_limits(&self) -> bool {
        self.net_kw >= -self.max_export_kw && self.net_kw <= self.max_import_kw
    }
}

impl Device for Feeder {
    fn power_kw(&self) -> f32 {
        self.net_kw
    }
}

impl Component for Feeder {
    fn component_type(&self) -> &'static str {
        "Feeder"
    }

    fn update_state(&mut self, t: Time, ctx: &mut UpdateContext<'_>) {
        self.reset();
        self.add_net_kw(sum_peer_power_kw(ctx, &self.inputs));
        if !self.within_limits() {
            warn!(
                time = %t,
                net_kw = self.net_kw,
                max_import_kw = self.max_import_kw,
                max_export_kw = self.max_export_kw,
                "feeder limit violated"
            );
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
