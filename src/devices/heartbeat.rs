use std::any::Any;

use crate::sim::clock::Time;
use crate::sim::component::{Component, UpdateContext};

/// A component with no physical state that wants an update every `dt_secs`.
///
/// Devices that force-depend on a heartbeat are refreshed once per beat.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    dt_secs: i64,
    last_beat: Option<Time>,
    beats: u64,
}

impl Heartbeat {
    /// # Panics
    ///
    /// Panics if `dt_secs` is not positive.
    pub fn new(dt_secs: i64) -> Self {
        assert!(dt_secs > 0, "heartbeat period must be positive");
        Self {
            dt_secs,
            last_beat: None,
            beats: 0,
        }
    }

    pub fn dt_secs(&self) -> i64 {
        self.dt_secs
    }

    /// Changes the cadence, counted from the last beat.
    ///
    /// Raises `needs_update` so the scheduler re-reads [`valid_until`]
    /// at the current instant instead of waiting for the old beat.
    ///
    /// [`valid_until`]: Component::valid_until
    ///
    /// # Panics
    ///
    /// Panics if `dt_secs` is not positive.
    pub fn set_dt(&mut self, dt_secs: i64, ctx: &mut UpdateContext<'_>) {
        assert!(dt_secs > 0, "heartbeat period must be positive");
        self.dt_secs = dt_secs;
        ctx.request_update();
    }

    /// Beats so far.
    pub fn beats(&self) -> u64 {
        self.beats
    }
}

impl Component for Heartbeat {
    fn component_type(&self) -> &'static str {
        "Heartbeat"
    }

    fn initialize_state(&mut self, _ctx: &mut UpdateContext<'_>) {
        self.last_beat = None;
        self.beats = 0;
    }

    fn update_state(&mut self, t: Time, _ctx: &mut UpdateContext<'_>) {
        let due = self
            .last_beat
            .is_none_or(|last| t >= last.offset(self.dt_secs));
        if due {
            self.beats += 1;
            self.last_beat = Some(t);
        }
    }

    fn valid_until(&self) -> Time {
        self.last_beat
            .map_or(Time::POS_INFINITY, |last| last.offset(self.dt_secs))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
