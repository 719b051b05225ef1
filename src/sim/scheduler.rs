//! Dependency-aware discrete-event scheduler.
//!
//! Components are updated either because their scheduled time has come or
//! because something asked for a contingent update at the current time.
//! Within one instant, work runs in weak-order rank so that every component
//! sees its dependencies already brought up to date.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, trace, warn};

use super::agenda::{Agenda, UpdateKey};
use super::clock::Time;
use super::component::{self, Component, ComponentEntry, ComponentEvents, ComponentId};
use super::component::{Dependency, LifecycleState, UpdateContext};
use super::event::{ActionId, EventId, EventRegistry};
use super::weak_order::WoGraph;
use crate::error::SimError;

/// Coarse phase of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Model assembly is still open.
    NotStarted,
    /// `initialize()` ran; no update beyond the first instant yet.
    Initialized,
    /// At least one update happened after initialization.
    Running,
    /// No further update is possible inside the window.
    Finished,
}

/// Counters kept while driving the simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Updates taken from the scheduled queue.
    pub scheduled_updates: u64,
    /// Updates taken from the contingent queue.
    pub contingent_updates: u64,
    /// Instants that settled and fired their completion events.
    pub completed_instants: u64,
    /// Updates performed at the current instant so far.
    pub updates_this_instant: u64,
}

impl SchedulerStats {
    /// All updates performed.
    pub fn total_updates(&self) -> u64 {
        self.scheduled_updates + self.contingent_updates
    }
}

/// Owns a set of components and advances them through simulated time.
///
/// # Examples
///
/// ```
/// use std::any::Any;
/// use sgt_sim::sim::clock::Time;
/// use sgt_sim::sim::component::Component;
/// use sgt_sim::sim::scheduler::Scheduler;
///
/// struct Idle;
/// impl Component for Idle {
///     fn component_type(&self) -> &'static str { "idle" }
///     fn as_any(&self) -> &dyn Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// }
///
/// let mut sim = Scheduler::new(Time::from_secs(0), Time::from_secs(60))?;
/// let id = sim.add_component("idle", Idle)?;
/// sim.initialize()?;
/// assert_eq!(sim.last_updated(id), Some(Time::from_secs(0)));
/// assert!(!sim.do_timestep()?);
/// # Ok::<(), sgt_sim::error::SimError>(())
/// ```
pub struct Scheduler {
    start_time: Time,
    end_time: Time,
    current_time: Time,
    state: RunState,
    registry: EventRegistry<Agenda>,
    agenda: Agenda,
    entries: Vec<ComponentEntry>,
    names: HashMap<String, ComponentId>,
    order: Vec<ComponentId>,
    scheduled: BTreeSet<(Time, UpdateKey)>,
    scheduled_at: Vec<Option<Time>>,
    will_start_new_timestep: EventId,
    did_complete_timestep: EventId,
    max_updates_per_instant: Option<u64>,
    stats: SchedulerStats,
}

impl Scheduler {
    /// Creates an empty scheduler for the window `[start_time, end_time)`.
    pub fn new(start_time: Time, end_time: Time) -> Result<Self, SimError> {
        if !start_time.is_finite() || start_time >= end_time {
            return Err(SimError::InvalidWindow {
                start: start_time,
                end: end_time,
            });
        }
        let mut registry = EventRegistry::new();
        let will_start_new_timestep = registry.new_event("simulation will start new timestep");
        let did_complete_timestep = registry.new_event("simulation did complete timestep");
        Ok(Self {
            start_time,
            end_time,
            current_time: Time::NEG_INFINITY,
            state: RunState::NotStarted,
            registry,
            agenda: Agenda::default(),
            entries: Vec::new(),
            names: HashMap::new(),
            order: Vec::new(),
            scheduled: BTreeSet::new(),
            scheduled_at: Vec::new(),
            will_start_new_timestep,
            did_complete_timestep,
            max_updates_per_instant: None,
            stats: SchedulerStats::default(),
        })
    }

    /// Adds a component under a unique name.
    pub fn add_component(
        &mut self,
        name: impl Into<String>,
        model: impl Component,
    ) -> Result<ComponentId, SimError> {
        self.ensure_open()?;
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(SimError::DuplicateComponent(name));
        }
        let events = ComponentEvents::register(&mut self.registry, &name);
        let id = self.agenda.register();
        debug!(component = %name, kind = model.component_type(), %id, "component added");
        self.names.insert(name.clone(), id);
        self.entries
            .push(ComponentEntry::new(name, events, Box::new(model)));
        self.scheduled_at.push(None);
        Ok(id)
    }

    /// Declares that `dependent` reads state of `on`.
    ///
    /// With `force_update`, every completed update of `on` requests a
    /// contingent update of `dependent` at the same instant.
    pub fn add_dependency(
        &mut self,
        dependent: ComponentId,
        on: ComponentId,
        force_update: bool,
    ) -> Result<(), SimError> {
        self.ensure_open()?;
        let dependent_name = self.entry(dependent)?.name.clone();
        let on_entry = self.entry(on)?;
        if dependent == on {
            return Err(SimError::SelfDependency(dependent));
        }
        let on_name = on_entry.name.clone();
        let on_did_update = on_entry.events.did_update;
        let target = self.entry(dependent)?.events.needs_update;

        if force_update {
            self.registry.add_action(
                on_did_update,
                format!("{dependent_name} needs update after {on_name} did update"),
                move |agenda: &mut Agenda, registry: &mut EventRegistry<Agenda>| {
                    if agenda.should_propagate(on, dependent) {
                        registry.trigger(target, agenda);
                    }
                },
            )?;
        }
        debug!(dependent = %dependent_name, on = %on_name, force_update, "dependency added");
        self.entry_mut(dependent)?
            .dependencies
            .push(Dependency { on, force_update });
        Ok(())
    }

    /// Looks up a component id by name.
    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.names.get(name).copied()
    }

    /// Name a component was added under.
    pub fn name(&self, id: ComponentId) -> Option<&str> {
        self.entries.get(id.index()).map(|entry| entry.name.as_str())
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no component was added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Typed read access to a component.
    pub fn component<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.entries
            .get(id.index())?
            .model
            .as_deref()?
            .as_any()
            .downcast_ref::<T>()
    }

    /// Mutates a component between updates.
    ///
    /// `f` gets the same context as an update hook, so it can raise
    /// `needs_update` when the change invalidates the current schedule. The
    /// update itself runs at the current instant on the next
    /// [`do_timestep`](Self::do_timestep).
    pub fn with_component<T: Component, R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut T, &mut UpdateContext<'_>) -> R,
    ) -> Result<R, SimError> {
        component::with_model(
            &mut self.entries,
            id,
            &mut self.registry,
            &mut self.agenda,
            f,
        )
        .ok_or(SimError::UnknownComponent(id))
    }

    /// Dependencies declared for `id`, in declaration order.
    pub fn dependencies(&self, id: ComponentId) -> &[Dependency] {
        self.entries
            .get(id.index())
            .map(|entry| entry.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Time `id` was last brought to; `None` before initialization.
    pub fn last_updated(&self, id: ComponentId) -> Option<Time> {
        self.agenda.last_updated(id)
    }

    /// Lifecycle phase of `id`.
    pub fn lifecycle(&self, id: ComponentId) -> Option<LifecycleState> {
        if id.index() >= self.entries.len() {
            return None;
        }
        Some(match self.agenda.last_updated(id) {
            None => LifecycleState::Uninitialized,
            Some(Time::NEG_INFINITY) => LifecycleState::Initialized,
            Some(_) => LifecycleState::Updated,
        })
    }

    /// Weak-order rank of `id`, assigned by `initialize()`.
    pub fn rank(&self, id: ComponentId) -> Option<usize> {
        self.entries.get(id.index()).and_then(|entry| entry.rank)
    }

    /// Components sorted by rank. Empty before `initialize()`.
    pub fn components_in_rank_order(&self) -> &[ComponentId] {
        &self.order
    }

    /// Lifecycle events of `id`.
    pub fn component_events(&self, id: ComponentId) -> Option<ComponentEvents> {
        self.entries.get(id.index()).map(|entry| entry.events)
    }

    /// Fired before the first update at each new instant.
    pub fn will_start_new_timestep_event(&self) -> EventId {
        self.will_start_new_timestep
    }

    /// Fired once per settled instant, after the per-component events.
    pub fn did_complete_timestep_event(&self) -> EventId {
        self.did_complete_timestep
    }

    /// The registry holding every lifecycle event.
    pub fn events(&self) -> &EventRegistry<Agenda> {
        &self.registry
    }

    /// Mutable registry access for wiring custom events and actions.
    pub fn events_mut(&mut self) -> &mut EventRegistry<Agenda> {
        &mut self.registry
    }

    /// Pending contingent work and component timestamps.
    pub fn agenda(&self) -> &Agenda {
        &self.agenda
    }

    /// Attaches a new action to `event`.
    pub fn add_action(
        &mut self,
        event: EventId,
        description: impl Into<String>,
        callback: impl FnMut(&mut Agenda, &mut EventRegistry<Agenda>) + 'static,
    ) -> Result<ActionId, SimError> {
        Ok(self.registry.add_action(event, description, callback)?)
    }

    /// Fires `event` from outside any update.
    pub fn trigger(&mut self, event: EventId) {
        self.registry.trigger(event, &mut self.agenda);
    }

    /// Fires the `needs_update` event of `id`.
    pub fn request_update(&mut self, id: ComponentId) -> Result<(), SimError> {
        let event = self.entry(id)?.events.needs_update;
        self.trigger(event);
        Ok(())
    }

    pub fn current_time(&self) -> Time {
        self.current_time
    }

    pub fn start_time(&self) -> Time {
        self.start_time
    }

    pub fn end_time(&self) -> Time {
        self.end_time
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Earliest scheduled update, if any.
    pub fn next_scheduled(&self) -> Option<(Time, ComponentId)> {
        self.scheduled.first().map(|&(t, key)| (t, key.id))
    }

    /// Fails the run with [`SimError::Stalled`] once more than `limit`
    /// updates happen at one instant. `None` disables the check.
    pub fn set_max_updates_per_instant(&mut self, limit: Option<u64>) {
        self.max_updates_per_instant = limit;
    }

    /// Freezes the model, ranks and initializes every component, then runs
    /// the first instant at `start_time`.
    pub fn initialize(&mut self) -> Result<(), SimError> {
        if self.state != RunState::NotStarted {
            return Err(SimError::AlreadyInitialized);
        }

        let mut graph = WoGraph::new(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            for dependency in &entry.dependencies {
                graph.link(dependency.on.index(), index);
            }
        }
        graph.weak_order();
        self.agenda.clear_pending();
        self.order = graph.order().iter().map(|&i| ComponentId::new(i)).collect();
        for (rank, &id) in self.order.iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(id.index()) {
                entry.rank = Some(rank);
            }
            self.agenda.set_rank(id, rank);
        }
        info!(
            components = self.entries.len(),
            start = %self.start_time,
            end = %self.end_time,
            "initializing simulation"
        );

        self.scheduled.clear();
        self.scheduled_at.iter_mut().for_each(|slot| *slot = None);
        let order = self.order.clone();
        for &id in &order {
            component::initialize(&mut self.entries, id, &mut self.registry, &mut self.agenda);
            self.schedule(id, self.start_time);
        }

        for &id in &order {
            let entry = self.entry(id)?;
            let event = entry.events.needs_update;
            let description = format!("scheduler: contingent update of {}", entry.name);
            self.registry.add_action(
                event,
                description,
                move |agenda: &mut Agenda, _: &mut EventRegistry<Agenda>| {
                    agenda.request_update(id);
                },
            )?;
        }

        self.agenda.clear_pending();
        self.current_time = Time::NEG_INFINITY;
        self.agenda.set_now(Time::NEG_INFINITY);
        self.state = RunState::Initialized;

        self.do_timestep()?;
        Ok(())
    }

    /// Performs at most one component update.
    ///
    /// Contingent work at the current instant always runs before time
    /// advances. Returns `Ok(false)` when nothing is left to do inside the
    /// window, after which the scheduler is [`RunState::Finished`].
    pub fn do_next_update(&mut self) -> Result<bool, SimError> {
        self.ensure_started()?;

        let next = self.scheduled.first().copied();
        let next_time = next.map_or(Time::POS_INFINITY, |(t, _)| t);

        let contingent = if next_time > self.current_time && self.current_time < self.end_time {
            self.agenda.pop_pending()
        } else {
            None
        };

        if let Some(id) = contingent {
            trace!(component = %self.display_name(id), time = %self.current_time, "contingent update");
            self.unschedule(id);
            self.update_and_reschedule(id);
            self.stats.contingent_updates += 1;
        } else if let Some((t, key)) = next.filter(|&(t, _)| t < self.end_time) {
            if t > self.current_time {
                self.registry
                    .trigger(self.will_start_new_timestep, &mut self.agenda);
                self.current_time = t;
                self.agenda.set_now(t);
                self.stats.updates_this_instant = 0;
                debug!(time = %t, "new timestep");
            }
            trace!(component = %self.display_name(key.id), time = %t, "scheduled update");
            self.unschedule(key.id);
            self.agenda.cancel(key.id);
            self.update_and_reschedule(key.id);
            self.stats.scheduled_updates += 1;
        } else {
            if self.state != RunState::Finished {
                info!(
                    time = %self.current_time,
                    updates = self.stats.total_updates(),
                    "simulation finished"
                );
            }
            self.state = RunState::Finished;
            return Ok(false);
        }

        if self.state == RunState::Initialized && self.current_time > self.start_time {
            self.state = RunState::Running;
        }
        self.stats.updates_this_instant += 1;
        if let Some(limit) = self.max_updates_per_instant {
            if self.stats.updates_this_instant > limit {
                warn!(time = %self.current_time, limit, "instant did not settle");
                return Err(SimError::Stalled {
                    time: self.current_time,
                    updates: self.stats.updates_this_instant,
                });
            }
        }

        let settled = self.agenda.is_idle()
            && self
                .scheduled
                .first()
                .is_none_or(|&(t, _)| t > self.current_time);
        if settled {
            self.complete_timestep();
        }
        Ok(true)
    }

    /// Runs updates until the current instant has settled.
    ///
    /// Returns `Ok(false)` once the window is exhausted.
    pub fn do_timestep(&mut self) -> Result<bool, SimError> {
        self.ensure_started()?;
        let mut performed = self.do_next_update()?;
        while performed && self.has_work_at(self.current_time) {
            performed = self.do_next_update()?;
        }
        Ok(performed)
    }

    /// Drives the simulation to the end of its window.
    pub fn run(&mut self) -> Result<(), SimError> {
        while self.do_timestep()? {}
        Ok(())
    }

    fn has_work_at(&self, t: Time) -> bool {
        !self.agenda.is_idle() || self.scheduled.first().is_some_and(|&(next, _)| next == t)
    }

    fn complete_timestep(&mut self) {
        let now = self.current_time;
        for &id in &self.order {
            if self.agenda.last_updated(id) == Some(now) {
                if let Some(entry) = self.entries.get(id.index()) {
                    self.registry
                        .trigger(entry.events.did_complete_timestep, &mut self.agenda);
                }
            }
        }
        self.registry
            .trigger(self.did_complete_timestep, &mut self.agenda);
        self.stats.completed_instants += 1;
        debug!(time = %now, updates = self.stats.updates_this_instant, "timestep completed");
    }

    fn update_and_reschedule(&mut self, id: ComponentId) {
        let now = self.current_time;
        component::update(&mut self.entries, id, now, &mut self.registry, &mut self.agenda);

        let requested = self
            .entries
            .get(id.index())
            .map_or(Time::POS_INFINITY, ComponentEntry::valid_until);
        let at = if requested < now {
            warn!(
                component = %self.display_name(id),
                requested = %requested,
                now = %now,
                "valid_until is in the past; rescheduling at current time"
            );
            now
        } else {
            requested
        };
        self.schedule(id, at);
    }

    fn schedule(&mut self, id: ComponentId, at: Time) {
        self.unschedule(id);
        if let Some(key) = self.agenda.key(id) {
            self.scheduled.insert((at, key));
            if let Some(slot) = self.scheduled_at.get_mut(id.index()) {
                *slot = Some(at);
            }
        }
    }

    fn unschedule(&mut self, id: ComponentId) {
        let previous = self
            .scheduled_at
            .get_mut(id.index())
            .and_then(Option::take);
        if let (Some(at), Some(key)) = (previous, self.agenda.key(id)) {
            self.scheduled.remove(&(at, key));
        }
    }

    fn display_name(&self, id: ComponentId) -> String {
        self.name(id).map_or_else(|| id.to_string(), str::to_string)
    }

    fn entry(&self, id: ComponentId) -> Result<&ComponentEntry, SimError> {
        self.entries
            .get(id.index())
            .ok_or(SimError::UnknownComponent(id))
    }

    fn entry_mut(&mut self, id: ComponentId) -> Result<&mut ComponentEntry, SimError> {
        self.entries
            .get_mut(id.index())
            .ok_or(SimError::UnknownComponent(id))
    }

    fn ensure_open(&self) -> Result<(), SimError> {
        if self.state == RunState::NotStarted {
            Ok(())
        } else {
            Err(SimError::ModelFrozen)
        }
    }

    fn ensure_started(&self) -> Result<(), SimError> {
        if self.state == RunState::NotStarted {
            Err(SimError::NotInitialized)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    type Log = Rc<RefCell<Vec<(String, Time)>>>;

    /// Records every update; optionally wants a fixed cadence.
    struct Recorder {
        name: &'static str,
        log: Log,
        period: Option<i64>,
        last: Time,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log, period: Option<i64>) -> Self {
            Self {
                name,
                log: Rc::clone(log),
                period,
                last: Time::NEG_INFINITY,
            }
        }
    }

    impl Component for Recorder {
        fn component_type(&self) -> &'static str {
            "recorder"
        }

        fn update_state(&mut self, t: Time, _ctx: &mut UpdateContext<'_>) {
            self.last = t;
            self.log.borrow_mut().push((self.name.to_string(), t));
        }

        fn valid_until(&self) -> Time {
            match self.period {
                Some(period) => self.last.offset(period),
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

    fn secs(s: i64) -> Time {
        Time::from_secs(s)
    }

    fn names(log: &Log) -> Vec<String> {
        log.borrow().iter().map(|(n, _)| n.clone()).collect()
    }

    #[test]
    fn rejects_empty_window() {
        assert!(matches!(
            Scheduler::new(secs(10), secs(10)),
            Err(SimError::InvalidWindow { .. })
        ));
        assert!(Scheduler::new(Time::NEG_INFINITY, secs(10)).is_err());
    }

    #[test]
    fn rejects_duplicates_and_self_dependency() {
        let log: Log = Rc::default();
        let mut sim = Scheduler::new(secs(0), secs(10)).expect("valid window");
        let a = sim
            .add_component("a", Recorder::new("a", &log, None))
            .expect("first add");
        assert_eq!(
            sim.add_component("a", Recorder::new("a", &log, None)).err(),
            Some(SimError::DuplicateComponent("a".into()))
        );
        assert_eq!(
            sim.add_dependency(a, a, true),
            Err(SimError::SelfDependency(a))
        );
        assert_eq!(
            sim.add_dependency(a, ComponentId::new(5), true),
            Err(SimError::UnknownComponent(ComponentId::new(5)))
        );
        assert_eq!(sim.component_id("a"), Some(a));
    }

    #[test]
    fn driving_requires_initialize_and_freezes_model() {
        let log: Log = Rc::default();
        let mut sim = Scheduler::new(secs(0), secs(10)).expect("valid window");
        assert_eq!(sim.do_timestep(), Err(SimError::NotInitialized));
        assert_eq!(sim.do_next_update(), Err(SimError::NotInitialized));

        let a = sim
            .add_component("a", Recorder::new("a", &log, None))
            .expect("add");
        sim.initialize().expect("initialize");
        assert_eq!(sim.initialize(), Err(SimError::AlreadyInitialized));
        assert_eq!(
            sim.add_component("b", Recorder::new("b", &log, None)).err(),
            Some(SimError::ModelFrozen)
        );
        assert_eq!(sim.add_dependency(a, a, false), Err(SimError::ModelFrozen));
    }

    #[test]
    fn initialize_runs_first_instant_in_rank_order() {
        let log: Log = Rc::default();
        let mut sim = Scheduler::new(secs(0), secs(100)).expect("valid window");
        let c = sim
            .add_component("c", Recorder::new("c", &log, None))
            .expect("add c");
        let b = sim
            .add_component("b", Recorder::new("b", &log, None))
            .expect("add b");
        let a = sim
            .add_component("a", Recorder::new("a", &log, Some(10)))
            .expect("add a");
        sim.add_dependency(b, a, true).expect("b on a");
        sim.add_dependency(c, b, false).expect("c on b");

        for id in [a, b, c] {
            assert_eq!(sim.lifecycle(id), Some(LifecycleState::Uninitialized));
        }
        sim.initialize().expect("initialize");

        assert_eq!(sim.components_in_rank_order(), &[a, b, c]);
        assert_eq!(names(&log), vec!["a", "b", "c"]);
        assert_eq!(sim.current_time(), secs(0));
        assert_eq!(sim.state(), RunState::Initialized);
        for id in [a, b, c] {
            assert_eq!(sim.last_updated(id), Some(secs(0)));
            assert_eq!(sim.lifecycle(id), Some(LifecycleState::Updated));
        }
        assert_eq!(sim.next_scheduled(), Some((secs(10), a)));
    }

    #[test]
    fn forced_dependency_runs_contingently_before_time_advances() {
        let log: Log = Rc::default();
        let mut sim = Scheduler::new(secs(0), secs(100)).expect("valid window");
        let a = sim
            .add_component("a", Recorder::new("a", &log, Some(10)))
            .expect("add a");
        let b = sim
            .add_component("b", Recorder::new("b", &log, None))
            .expect("add b");
        let c = sim
            .add_component("c", Recorder::new("c", &log, None))
            .expect("add c");
        sim.add_dependency(b, a, true).expect("b on a");
        sim.add_dependency(c, b, false).expect("c on b");
        sim.initialize().expect("initialize");
        log.borrow_mut().clear();

        assert!(sim.do_timestep().expect("step"));
        assert_eq!(
            *log.borrow(),
            vec![("a".to_string(), secs(10)), ("b".to_string(), secs(10))]
        );
        assert_eq!(sim.last_updated(c), Some(secs(0)));
        assert_eq!(sim.stats().contingent_updates, 1);
    }

    #[test]
    fn run_stops_at_end_time() {
        let log: Log = Rc::default();
        let mut sim = Scheduler::new(secs(0), secs(35)).expect("valid window");
        let a = sim
            .add_component("a", Recorder::new("a", &log, Some(10)))
            .expect("add a");
        sim.initialize().expect("initialize");
        sim.run().expect("run");

        let times: Vec<Time> = log.borrow().iter().map(|&(_, t)| t).collect();
        assert_eq!(times, vec![secs(0), secs(10), secs(20), secs(30)]);
        assert_eq!(sim.state(), RunState::Finished);
        assert_eq!(sim.last_updated(a), Some(secs(30)));
        assert!(!sim.do_timestep().expect("finished scheduler reports no work"));
    }

    #[test]
    fn mutual_forced_dependencies_settle() {
        let log: Log = Rc::default();
        let mut sim = Scheduler::new(secs(0), secs(25)).expect("valid window");
        let a = sim
            .add_component("a", Recorder::new("a", &log, Some(10)))
            .expect("add a");
        let b = sim
            .add_component("b", Recorder::new("b", &log, None))
            .expect("add b");
        let c = sim
            .add_component("c", Recorder::new("c", &log, None))
            .expect("add c");
        sim.add_dependency(b, a, true).expect("b on a");
        sim.add_dependency(c, b, true).expect("c on b");
        sim.add_dependency(a, c, true).expect("a on c");
        sim.set_max_updates_per_instant(Some(50));
        sim.initialize().expect("initialize");
        log.borrow_mut().clear();

        assert!(sim.do_timestep().expect("instant settles"));
        assert_eq!(names(&log), vec!["a", "b", "c"]);
        sim.run().expect("run settles");
    }

    /// Requests an update of itself on every update.
    struct Restless;

    impl Component for Restless {
        fn component_type(&self) -> &'static str {
            "restless"
        }

        fn update_state(&mut self, _t: Time, ctx: &mut UpdateContext<'_>) {
            ctx.request_update();
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn watchdog_reports_stall() {
        let mut sim = Scheduler::new(secs(0), secs(10)).expect("valid window");
        sim.add_component("restless", Restless).expect("add");
        sim.set_max_updates_per_instant(Some(20));
        assert_eq!(
            sim.initialize(),
            Err(SimError::Stalled {
                time: secs(0),
                updates: 21
            })
        );
    }

    #[test]
    fn completion_events_fire_once_per_settled_instant() {
        let log: Log = Rc::default();
        let mut sim = Scheduler::new(secs(0), secs(30)).expect("valid window");
        let a = sim
            .add_component("a", Recorder::new("a", &log, Some(10)))
            .expect("add a");
        let b = sim
            .add_component("b", Recorder::new("b", &log, Some(20)))
            .expect("add b");

        let seen: Log = Rc::default();
        for (id, tag) in [(a, "a done"), (b, "b done")] {
            let events = sim.component_events(id).expect("known component");
            let seen = Rc::clone(&seen);
            sim.add_action(
                events.did_complete_timestep,
                tag,
                move |agenda: &mut Agenda, _: &mut EventRegistry<Agenda>| {
                    seen.borrow_mut().push((tag.to_string(), agenda.now()))
                },
            )
            .expect("event exists");
        }
        let seen_sim = Rc::clone(&seen);
        let sim_done = sim.did_complete_timestep_event();
        sim.add_action(
            sim_done,
            "sim done",
            move |agenda: &mut Agenda, _: &mut EventRegistry<Agenda>| {
                seen_sim.borrow_mut().push(("sim done".into(), agenda.now()))
            },
        )
        .expect("event exists");

        sim.initialize().expect("initialize");
        sim.run().expect("run");

        let expected: Vec<(String, Time)> = [
            ("a done", 0),
            ("b done", 0),
            ("sim done", 0),
            ("a done", 10),
            ("sim done", 10),
            ("a done", 20),
            ("b done", 20),
            ("sim done", 20),
        ]
        .into_iter()
        .map(|(tag, t)| (tag.to_string(), secs(t)))
        .collect();
        assert_eq!(*seen.borrow(), expected);
        assert_eq!(sim.stats().completed_instants, 3);
    }
}
