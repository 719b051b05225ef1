//! Components: the units of state the scheduler updates.

use std::any::Any;
use std::fmt;

use tracing::trace;

use super::agenda::Agenda;
use super::clock::Time;
use super::event::{EventId, EventRegistry};

/// Handle naming a component within one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(usize);

impl ComponentId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Insertion index of the component.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Where a component is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Added to a scheduler, not yet initialized.
    Uninitialized,
    /// Initialized; `last_updated` is negative infinity.
    Initialized,
    /// Updated at least once; `last_updated` is finite.
    Updated,
}

/// The five lifecycle events each component owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentEvents {
    /// Fired before every update.
    pub will_update: EventId,
    /// Fired after every update.
    pub did_update: EventId,
    /// Fired to request a contingent update at the current time.
    pub needs_update: EventId,
    /// Fired before the first update at a strictly later time.
    pub will_start_new_timestep: EventId,
    /// Fired once an instant at which the component updated has settled.
    pub did_complete_timestep: EventId,
}

impl ComponentEvents {
    pub(crate) fn register<C>(registry: &mut EventRegistry<C>, name: &str) -> Self {
        Self {
            will_update: registry.new_event(format!("{name} will update")),
            did_update: registry.new_event(format!("{name} did update")),
            needs_update: registry.new_event(format!("{name} needs update")),
            will_start_new_timestep: registry
                .new_event(format!("{name} will start new timestep")),
            did_complete_timestep: registry.new_event(format!("{name} did complete timestep")),
        }
    }

    /// All five events, in declaration order.
    pub fn all(&self) -> [EventId; 5] {
        [
            self.will_update,
            self.did_update,
            self.needs_update,
            self.will_start_new_timestep,
            self.did_complete_timestep,
        ]
    }
}

/// A declared dependency of one component on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    /// The component depended on.
    pub on: ComponentId,
    /// Whether every update of `on` requests an update of the dependent.
    pub force_update: bool,
}

/// A piece of simulated state driven by the scheduler.
///
/// Implementors only provide the hooks; the scheduler alone decides when
/// they run and surrounds every [`update_state`](Component::update_state)
/// with the lifecycle events in [`ComponentEvents`].
pub trait Component: 'static {
    /// Short type label used in logs.
    fn component_type(&self) -> &'static str;

    /// Called once by `Scheduler::initialize`, in rank order.
    fn initialize_state(&mut self, _ctx: &mut UpdateContext<'_>) {}

    /// Brings the component from `ctx.last_updated()` to `t`.
    fn update_state(&mut self, _t: Time, _ctx: &mut UpdateContext<'_>) {}

    /// Latest time the current state stays valid without another update.
    fn valid_until(&self) -> Time {
        Time::POS_INFINITY
    }

    /// Enables typed access through `Scheduler::component` and
    /// [`UpdateContext::peer`].
    fn as_any(&self) -> &dyn Any;

    /// Enables typed mutation through `Scheduler::with_component`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// What a component sees while one of its hooks runs.
///
/// Peers are read-only. The running component itself is not reachable
/// through [`peer`](UpdateContext::peer).
pub struct UpdateContext<'a> {
    id: ComponentId,
    events: ComponentEvents,
    registry: &'a mut EventRegistry<Agenda>,
    agenda: &'a mut Agenda,
    peers: &'a [ComponentEntry],
}

impl<'a> UpdateContext<'a> {
    /// The running component.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Current simulated time.
    pub fn now(&self) -> Time {
        self.agenda.now()
    }

    /// Time the running component was last brought to.
    pub fn last_updated(&self) -> Time {
        self.agenda.last_updated(self.id).unwrap_or_default()
    }

    /// The running component's lifecycle events.
    pub fn events(&self) -> ComponentEvents {
        self.events
    }

    /// Fires the component's own `needs_update` event.
    pub fn request_update(&mut self) {
        self.trigger(self.events.needs_update);
    }

    /// Fires an arbitrary event.
    pub fn trigger(&mut self, event: EventId) {
        self.registry.trigger(event, self.agenda);
    }

    /// Typed read access to another component.
    ///
    /// Returns `None` for unknown ids, for the running component, or when
    /// the peer is not a `T`.
    pub fn peer<T: Component>(&self, id: ComponentId) -> Option<&'a T> {
        let peers: &'a [ComponentEntry] = self.peers;
        peers
            .get(id.index())?
            .model
            .as_deref()?
            .as_any()
            .downcast_ref::<T>()
    }
}

/// Scheduler-side record of one component.
pub(crate) struct ComponentEntry {
    pub(crate) name: String,
    pub(crate) events: ComponentEvents,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) rank: Option<usize>,
    /// `None` only while one of the model's own hooks runs.
    pub(crate) model: Option<Box<dyn Component>>,
}

impl ComponentEntry {
    pub(crate) fn new(name: String, events: ComponentEvents, model: Box<dyn Component>) -> Self {
        Self {
            name,
            events,
            dependencies: Vec::new(),
            rank: None,
            model: Some(model),
        }
    }

    pub(crate) fn valid_until(&self) -> Time {
        self.model
            .as_deref()
            .map_or(Time::POS_INFINITY, |model| model.valid_until())
    }
}

/// Resets `id` to negative infinity and runs its `initialize_state` hook.
pub(crate) fn initialize(
    entries: &mut [ComponentEntry],
    id: ComponentId,
    registry: &mut EventRegistry<Agenda>,
    agenda: &mut Agenda,
) {
    agenda.stamp(id, Time::NEG_INFINITY);
    let Some(entry) = entries.get_mut(id.index()) else {
        return;
    };
    let events = entry.events;
    let Some(mut model) = entry.model.take() else {
        return;
    };
    trace!(component = %entry.name, kind = model.component_type(), "initialize");

    let mut ctx = UpdateContext {
        id,
        events,
        registry,
        agenda,
        peers: entries,
    };
    model.initialize_state(&mut ctx);

    if let Some(entry) = entries.get_mut(id.index()) {
        entry.model = Some(model);
    }
}

/// Runs `f` on the model of `id` outside any update, if it is a `T`.
pub(crate) fn with_model<T: Component, R>(
    entries: &mut [ComponentEntry],
    id: ComponentId,
    registry: &mut EventRegistry<Agenda>,
    agenda: &mut Agenda,
    f: impl FnOnce(&mut T, &mut UpdateContext<'_>) -> R,
) -> Option<R> {
    let entry = entries.get_mut(id.index())?;
    let events = entry.events;
    let mut model = entry.model.take()?;

    let result = match model.as_any_mut().downcast_mut::<T>() {
        Some(typed) => {
            let mut ctx = UpdateContext {
                id,
                events,
                registry,
                agenda,
                peers: entries,
            };
            Some(f(typed, &mut ctx))
        }
        None => None,
    };

    if let Some(entry) = entries.get_mut(id.index()) {
        entry.model = Some(model);
    }
    result
}

/// Runs one full update of `id` to time `t`, with its lifecycle events.
pub(crate) fn update(
    entries: &mut [ComponentEntry],
    id: ComponentId,
    t: Time,
    registry: &mut EventRegistry<Agenda>,
    agenda: &mut Agenda,
) {
    let Some(events) = entries.get(id.index()).map(|entry| entry.events) else {
        return;
    };

    if agenda.last_updated(id).is_none_or(|last| last < t) {
        registry.trigger(events.will_start_new_timestep, agenda);
    }
    registry.trigger(events.will_update, agenda);

    let Some(mut model) = entries
        .get_mut(id.index())
        .and_then(|entry| entry.model.take())
    else {
        return;
    };
    {
        let mut ctx = UpdateContext {
            id,
            events,
            registry: &mut *registry,
            agenda: &mut *agenda,
            peers: entries,
        };
        model.update_state(t, &mut ctx);
    }
    if let Some(entry) = entries.get_mut(id.index()) {
        entry.model = Some(model);
    }
    agenda.stamp(id, t);

    registry.trigger(events.did_update, agenda);
}
