//! Event/Action registry.
//!
//! Events and Actions live in a single arena and refer to each other by
//! integer handle. Every link is stored on both sides, and every removal
//! erases it from both sides, so no handle held by a live slot ever points
//! at a removed one. Handles are never reused.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, trace};

use crate::error::EventError;

/// Handle to an [`EventRegistry`] event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(u32);

/// Handle to an [`EventRegistry`] action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(u32);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action#{}", self.0)
    }
}

/// Callback run when an action is performed.
///
/// It receives the context passed to [`EventRegistry::trigger`] and the
/// registry itself, so it may trigger further events synchronously or
/// rewire triggers.
pub type Callback<C> = Box<dyn FnMut(&mut C, &mut EventRegistry<C>)>;

struct EventSlot {
    description: String,
    enabled: bool,
    /// Registration order.
    actions: Vec<ActionId>,
}

struct ActionSlot<C> {
    description: String,
    /// `None` while the callback is executing.
    callback: Option<Callback<C>>,
    triggers: BTreeSet<EventId>,
}

/// Arena of events and the actions they fire.
///
/// Generic over the context `C` handed to every callback during a trigger.
pub struct EventRegistry<C> {
    events: Vec<Option<EventSlot>>,
    actions: Vec<Option<ActionSlot<C>>>,
}

impl<C> Default for EventRegistry<C> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            actions: Vec::new(),
        }
    }
}

impl<C> EventRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new, enabled event with no actions.
    pub fn new_event(&mut self, description: impl Into<String>) -> EventId {
        let id = EventId(self.events.len() as u32);
        self.events.push(Some(EventSlot {
            description: description.into(),
            enabled: true,
            actions: Vec::new(),
        }));
        id
    }

    /// Creates an action that is not yet triggered by any event.
    pub fn new_action(
        &mut self,
        description: impl Into<String>,
        callback: impl FnMut(&mut C, &mut EventRegistry<C>) + 'static,
    ) -> ActionId {
        let id = ActionId(self.actions.len() as u32);
        self.actions.push(Some(ActionSlot {
            description: description.into(),
            callback: Some(Box::new(callback)),
            triggers: BTreeSet::new(),
        }));
        id
    }

    /// Creates an action and registers it on `event`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownEvent`] if `event` is not live. No action
    /// is left behind in that case.
    pub fn add_action(
        &mut self,
        event: EventId,
        description: impl Into<String>,
        callback: impl FnMut(&mut C, &mut EventRegistry<C>) + 'static,
    ) -> Result<ActionId, EventError> {
        if self.event(event).is_none() {
            return Err(EventError::UnknownEvent(event));
        }
        let description = description.into();
        trace!(event = self.describe(event), action = %description, "add action");
        let action = self.new_action(description, callback);
        self.add_trigger(action, event)?;
        Ok(action)
    }

    /// Makes `event` trigger `action`. Adding an existing link is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle is not live.
    pub fn add_trigger(&mut self, action: ActionId, event: EventId) -> Result<(), EventError> {
        if self.event(event).is_none() {
            return Err(EventError::UnknownEvent(event));
        }
        let slot = self
            .action_mut(action)
            .ok_or(EventError::UnknownAction(action))?;
        if slot.triggers.insert(event) {
            if let Some(ev) = self.event_mut(event) {
                ev.actions.push(action);
            }
        }
        Ok(())
    }

    /// Removes the link between `event` and `action`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if either handle is not live.
    pub fn remove_trigger(&mut self, action: ActionId, event: EventId) -> Result<(), EventError> {
        if self.event(event).is_none() {
            return Err(EventError::UnknownEvent(event));
        }
        let slot = self
            .action_mut(action)
            .ok_or(EventError::UnknownAction(action))?;
        if slot.triggers.remove(&event) {
            if let Some(ev) = self.event_mut(event) {
                ev.actions.retain(|a| *a != action);
            }
        }
        Ok(())
    }

    /// Unlinks `action` from every event that triggers it. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownAction`] if `action` is not live.
    pub fn clear_triggers(&mut self, action: ActionId) -> Result<(), EventError> {
        let slot = self
            .action_mut(action)
            .ok_or(EventError::UnknownAction(action))?;
        let triggers = std::mem::take(&mut slot.triggers);
        for event in triggers {
            if let Some(ev) = self.event_mut(event) {
                ev.actions.retain(|a| *a != action);
            }
        }
        Ok(())
    }

    /// Unlinks every action from `event`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownEvent`] if `event` is not live.
    pub fn clear_actions(&mut self, event: EventId) -> Result<(), EventError> {
        let ev = self
            .event_mut(event)
            .ok_or(EventError::UnknownEvent(event))?;
        let actions = std::mem::take(&mut ev.actions);
        for action in actions {
            if let Some(slot) = self.action_mut(action) {
                slot.triggers.remove(&event);
            }
        }
        Ok(())
    }

    /// Destroys an action after unlinking it from every event.
    ///
    /// An action may remove itself from inside its own callback; it is
    /// dropped once the callback returns.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownAction`] if `action` is not live.
    pub fn remove_action(&mut self, action: ActionId) -> Result<(), EventError> {
        self.clear_triggers(action)?;
        if let Some(slot) = self.actions.get_mut(action.0 as usize) {
            *slot = None;
        }
        Ok(())
    }

    /// Destroys an event after unlinking every action it would fire.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownEvent`] if `event` is not live.
    pub fn remove_event(&mut self, event: EventId) -> Result<(), EventError> {
        self.clear_actions(event)?;
        if let Some(slot) = self.events.get_mut(event.0 as usize) {
            *slot = None;
        }
        Ok(())
    }

    /// Enables or disables `event`. A disabled event ignores triggers.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownEvent`] if `event` is not live.
    pub fn set_enabled(&mut self, event: EventId, enabled: bool) -> Result<(), EventError> {
        let ev = self
            .event_mut(event)
            .ok_or(EventError::UnknownEvent(event))?;
        ev.enabled = enabled;
        Ok(())
    }

    /// Whether `event` is live and enabled.
    pub fn is_enabled(&self, event: EventId) -> bool {
        self.event(event).is_some_and(|ev| ev.enabled)
    }

    /// Whether `event` is live.
    pub fn contains_event(&self, event: EventId) -> bool {
        self.event(event).is_some()
    }

    /// Whether `action` is live.
    pub fn contains_action(&self, action: ActionId) -> bool {
        self.action(action).is_some()
    }

    /// Description of a live event.
    pub fn description(&self, event: EventId) -> Option<&str> {
        self.event(event).map(|ev| ev.description.as_str())
    }

    /// Description of a live action.
    pub fn action_description(&self, action: ActionId) -> Option<&str> {
        self.action(action).map(|a| a.description.as_str())
    }

    /// Actions registered on `event`, in registration order.
    pub fn actions(&self, event: EventId) -> &[ActionId] {
        self.event(event).map_or(&[], |ev| ev.actions.as_slice())
    }

    /// Events that currently trigger `action`.
    pub fn triggers(&self, action: ActionId) -> Vec<EventId> {
        self.action(action)
            .map(|a| a.triggers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Performs every action registered on `event`, in registration order.
    ///
    /// Nested triggers run depth-first before the next action of this event.
    /// Actions registered while the event is firing wait for the next
    /// trigger; actions unlinked while it is firing are skipped. An action
    /// re-entered by a nested trigger is skipped for that nested firing.
    /// Triggering a disabled or removed event does nothing.
    pub fn trigger(&mut self, event: EventId, ctx: &mut C) {
        let Some(ev) = self.event(event) else {
            trace!(%event, "trigger ignored: event was removed");
            return;
        };
        if !ev.enabled {
            trace!(event = %ev.description, "trigger ignored: event is disabled");
            return;
        }
        trace!(event = %ev.description, "event triggered");
        let pending = ev.actions.clone();

        for action in pending {
            let Some(slot) = self.action_mut(action) else {
                continue;
            };
            if !slot.triggers.contains(&event) {
                continue;
            }
            let Some(mut callback) = slot.callback.take() else {
                debug!(
                    action = %slot.description,
                    event = %event,
                    "action skipped: already executing"
                );
                continue;
            };
            trace!(action = %slot.description, "perform action");
            callback(ctx, self);
            if let Some(slot) = self.action_mut(action) {
                slot.callback = Some(callback);
            }
        }
    }

    fn describe(&self, event: EventId) -> &str {
        self.description(event).unwrap_or("<removed>")
    }

    fn event(&self, event: EventId) -> Option<&EventSlot> {
        self.events.get(event.0 as usize).and_then(Option::as_ref)
    }

    fn event_mut(&mut self, event: EventId) -> Option<&mut EventSlot> {
        self.events.get_mut(event.0 as usize).and_then(Option::as_mut)
    }

    fn action(&self, action: ActionId) -> Option<&ActionSlot<C>> {
        self.actions.get(action.0 as usize).and_then(Option::as_ref)
    }

    fn action_mut(&mut self, action: ActionId) -> Option<&mut ActionSlot<C>> {
        self.actions.get_mut(action.0 as usize).and_then(Option::as_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<&'static str>;

    fn push(tag: &'static str) -> impl FnMut(&mut Log, &mut EventRegistry<Log>) + 'static {
        move |log, _| log.push(tag)
    }

    #[test]
    fn actions_run_in_registration_order() {
        let mut reg = EventRegistry::<Log>::new();
        let ev = reg.new_event("ev");
        reg.add_action(ev, "first", push("a")).unwrap();
        reg.add_action(ev, "second", push("b")).unwrap();
        reg.add_action(ev, "third", push("c")).unwrap();

        let mut log = Log::new();
        reg.trigger(ev, &mut log);
        assert_eq!(log, vec!["a", "b", "c"]);
    }

    #[test]
    fn nested_triggers_are_depth_first() {
        let mut reg = EventRegistry::<Log>::new();
        let outer = reg.new_event("outer");
        let inner = reg.new_event("inner");
        reg.add_action(inner, "inner", push("inner")).unwrap();
        reg.add_action(outer, "before", push("before")).unwrap();
        reg.add_action(outer, "nest", move |log: &mut Log, reg: &mut EventRegistry<Log>| {
            reg.trigger(inner, log);
            log.push("after nested");
        })
        .unwrap();
        reg.add_action(outer, "last", push("last")).unwrap();

        let mut log = Log::new();
        reg.trigger(outer, &mut log);
        assert_eq!(log, vec!["before", "inner", "after nested", "last"]);
    }

    #[test]
    fn disabled_event_is_a_no_op() {
        let mut reg = EventRegistry::<Log>::new();
        let ev = reg.new_event("ev");
        reg.add_action(ev, "a", push("a")).unwrap();
        reg.set_enabled(ev, false).unwrap();
        assert!(!reg.is_enabled(ev));

        let mut log = Log::new();
        reg.trigger(ev, &mut log);
        assert!(log.is_empty());

        reg.set_enabled(ev, true).unwrap();
        reg.trigger(ev, &mut log);
        assert_eq!(log, vec!["a"]);
    }

    #[test]
    fn action_with_many_triggers_is_unlinked_everywhere_on_removal() {
        let mut reg = EventRegistry::<Log>::new();
        let events: Vec<_> = (0..4).map(|i| reg.new_event(format!("ev{i}"))).collect();
        let action = reg.new_action("shared", push("x"));
        for ev in &events {
            reg.add_trigger(action, *ev).unwrap();
        }
        assert_eq!(reg.triggers(action).len(), 4);

        reg.remove_action(action).unwrap();
        assert!(!reg.contains_action(action));
        for ev in &events {
            assert!(reg.actions(*ev).is_empty());
        }

        let mut log = Log::new();
        for ev in &events {
            reg.trigger(*ev, &mut log);
        }
        assert!(log.is_empty());
    }

    #[test]
    fn event_removal_unlinks_every_action() {
        let mut reg = EventRegistry::<Log>::new();
        let ev = reg.new_event("doomed");
        let other = reg.new_event("other");
        let a = reg.add_action(ev, "a", push("a")).unwrap();
        let b = reg.add_action(ev, "b", push("b")).unwrap();
        reg.add_trigger(b, other).unwrap();

        reg.remove_event(ev).unwrap();
        assert!(!reg.contains_event(ev));
        assert!(reg.triggers(a).is_empty());
        assert_eq!(reg.triggers(b), vec![other]);

        let mut log = Log::new();
        reg.trigger(ev, &mut log);
        reg.trigger(other, &mut log);
        assert_eq!(log, vec!["b"]);
    }

    #[test]
    fn clear_triggers_is_idempotent() {
        let mut reg = EventRegistry::<Log>::new();
        let ev = reg.new_event("ev");
        let a = reg.add_action(ev, "a", push("a")).unwrap();
        reg.clear_triggers(a).unwrap();
        reg.clear_triggers(a).unwrap();
        assert!(reg.triggers(a).is_empty());
        assert!(reg.actions(ev).is_empty());
        assert!(reg.contains_action(a));
    }

    #[test]
    fn duplicate_trigger_is_not_registered_twice() {
        let mut reg = EventRegistry::<Log>::new();
        let ev = reg.new_event("ev");
        let a = reg.add_action(ev, "a", push("a")).unwrap();
        reg.add_trigger(a, ev).unwrap();
        assert_eq!(reg.actions(ev), &[a]);
    }

    #[test]
    fn remove_trigger_unlinks_one_side_only() {
        let mut reg = EventRegistry::<Log>::new();
        let e1 = reg.new_event("e1");
        let e2 = reg.new_event("e2");
        let a = reg.add_action(e1, "a", push("a")).unwrap();
        reg.add_trigger(a, e2).unwrap();
        reg.remove_trigger(a, e1).unwrap();
        assert!(reg.actions(e1).is_empty());
        assert_eq!(reg.actions(e2), &[a]);
        assert_eq!(reg.triggers(a), vec![e2]);
    }

    #[test]
    fn stale_handles_are_rejected() {
        let mut reg = EventRegistry::<Log>::new();
        let ev = reg.new_event("ev");
        let a = reg.new_action("a", push("a"));
        reg.remove_event(ev).unwrap();
        assert_eq!(reg.add_trigger(a, ev), Err(EventError::UnknownEvent(ev)));
        assert!(matches!(
            reg.add_action(ev, "b", push("b")),
            Err(EventError::UnknownEvent(_))
        ));
        reg.remove_action(a).unwrap();
        assert_eq!(reg.remove_action(a), Err(EventError::UnknownAction(a)));
        assert_eq!(reg.clear_triggers(a), Err(EventError::UnknownAction(a)));
    }

    #[test]
    fn failed_add_action_leaves_no_orphan() {
        let mut reg = EventRegistry::<Log>::new();
        let ev = reg.new_event("ev");
        reg.remove_event(ev).unwrap();
        assert!(reg.add_action(ev, "a", push("a")).is_err());
        assert!(reg.actions.is_empty());
    }

    #[test]
    fn action_can_remove_itself_while_running() {
        let mut reg = EventRegistry::<Log>::new();
        let ev = reg.new_event("ev");
        let id = ActionId(0);
        let a = reg
            .add_action(ev, "once", move |log: &mut Log, reg: &mut EventRegistry<Log>| {
                log.push("once");
                reg.remove_action(id).unwrap();
            })
            .unwrap();
        assert_eq!(a, id);

        let mut log = Log::new();
        reg.trigger(ev, &mut log);
        reg.trigger(ev, &mut log);
        assert_eq!(log, vec!["once"]);
        assert!(!reg.contains_action(a));
    }

    #[test]
    fn recursive_self_trigger_is_skipped() {
        let mut reg = EventRegistry::<Log>::new();
        let ev = reg.new_event("ev");
        reg.add_action(ev, "recurse", move |log: &mut Log, reg: &mut EventRegistry<Log>| {
            log.push("enter");
            reg.trigger(ev, log);
        })
        .unwrap();

        let mut log = Log::new();
        reg.trigger(ev, &mut log);
        assert_eq!(log, vec!["enter"]);
    }

    #[test]
    fn action_added_while_firing_waits_for_next_trigger() {
        let mut reg = EventRegistry::<Log>::new();
        let ev = reg.new_event("ev");
        reg.add_action(ev, "adder", move |log: &mut Log, reg: &mut EventRegistry<Log>| {
            log.push("adder");
            reg.add_action(ev, "late", push("late")).unwrap();
        })
        .unwrap();

        let mut log = Log::new();
        reg.trigger(ev, &mut log);
        assert_eq!(log, vec!["adder"]);
    }

    #[test]
    fn action_shared_by_nested_events_runs_once_per_outer_firing() {
        let mut reg = EventRegistry::<Log>::new();
        let e1 = reg.new_event("e1");
        let e2 = reg.new_event("e2");
        let alpha = reg
            .add_action(e1, "alpha", move |log: &mut Log, reg: &mut EventRegistry<Log>| {
                log.push("alpha");
                reg.trigger(e2, log);
            })
            .unwrap();
        reg.add_trigger(alpha, e2).unwrap();
        reg.add_action(e2, "beta", push("beta")).unwrap();

        let mut log = Log::new();
        reg.trigger(e1, &mut log);
        assert_eq!(log, vec!["alpha", "beta"]);

        log.clear();
        reg.trigger(e2, &mut log);
        assert_eq!(log, vec!["alpha", "beta", "beta"]);
    }
}
