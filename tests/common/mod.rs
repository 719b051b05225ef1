//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use sgt_sim::config::ScenarioConfig;
use sgt_sim::sim::agenda::Agenda;
use sgt_sim::sim::clock::Time;
use sgt_sim::sim::component::{Component, UpdateContext};
use sgt_sim::sim::event::{EventId, EventRegistry};
use sgt_sim::sim::scheduler::Scheduler;

/// Shared `(label, time)` log written by fixtures and actions.
pub type Log = Rc<RefCell<Vec<(String, Time)>>>;

pub fn secs(s: i64) -> Time {
    Time::from_secs(s)
}

pub fn new_log() -> Log {
    Rc::default()
}

/// Labels in the order they were logged.
pub fn labels(log: &Log) -> Vec<String> {
    log.borrow().iter().map(|(label, _)| label.clone()).collect()
}

/// Logs every update; optionally wants a fixed cadence.
pub struct Recorder {
    name: String,
    log: Log,
    period: Option<i64>,
    last: Time,
}

impl Recorder {
    /// A recorder that only runs when something requests it.
    pub fn passive(name: &str, log: &Log) -> Self {
        Self {
            name: name.to_string(),
            log: Rc::clone(log),
            period: None,
            last: Time::NEG_INFINITY,
        }
    }

    /// A recorder that wants an update every `period` seconds.
    pub fn periodic(name: &str, log: &Log, period: i64) -> Self {
        Self {
            period: Some(period),
            ..Self::passive(name, log)
        }
    }
}

impl Component for Recorder {
    fn component_type(&self) -> &'static str {
        "Recorder"
    }

    fn update_state(&mut self, t: Time, _ctx: &mut UpdateContext<'_>) {
        self.last = t;
        self.log.borrow_mut().push((self.name.clone(), t));
    }

    fn valid_until(&self) -> Time {
        self.period
            .map_or(Time::POS_INFINITY, |period| self.last.offset(period))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Asks for another update at the same instant, `remaining` more times.
pub struct Echo {
    pub remaining: u32,
    pub updates: u32,
}

impl Echo {
    pub fn new(remaining: u32) -> Self {
        Self {
            remaining,
            updates: 0,
        }
    }
}

impl Component for Echo {
    fn component_type(&self) -> &'static str {
        "Echo"
    }

    fn update_state(&mut self, _t: Time, ctx: &mut UpdateContext<'_>) {
        self.updates += 1;
        if self.remaining > 0 {
            self.remaining -= 1;
            ctx.request_update();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Asks to be valid until five seconds before its first update, once.
pub struct Lagging {
    log: Log,
    updates: u32,
    last: Time,
}

impl Lagging {
    pub fn new(log: &Log) -> Self {
        Self {
            log: Rc::clone(log),
            updates: 0,
            last: Time::NEG_INFINITY,
        }
    }
}

impl Component for Lagging {
    fn component_type(&self) -> &'static str {
        "Lagging"
    }

    fn update_state(&mut self, t: Time, _ctx: &mut UpdateContext<'_>) {
        self.updates += 1;
        self.last = t;
        self.log.borrow_mut().push(("lagging".to_string(), t));
    }

    fn valid_until(&self) -> Time {
        if self.updates == 1 {
            self.last.offset(-5)
        } else {
            Time::POS_INFINITY
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Attaches an action to `event` that logs `label` with the agenda time.
pub fn log_event(sim: &mut Scheduler, event: EventId, label: &str, log: &Log) {
    let label = label.to_string();
    let log = Rc::clone(log);
    sim.add_action(
        event,
        format!("log {label}"),
        move |agenda: &mut Agenda, _: &mut EventRegistry<Agenda>| {
            log.borrow_mut().push((label.clone(), agenda.now()));
        },
    )
    .expect("event should exist");
}

/// Baseline scenario cut down to `hours` hours.
pub fn short_scenario(hours: i64) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.end_time = Time::from_secs(hours * 3600);
    cfg
}
