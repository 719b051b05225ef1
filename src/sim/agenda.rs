//! Pending work visible to event actions.

use std::collections::BTreeSet;

use super::clock::Time;
use super::component::ComponentId;

/// Orders pending work: lower rank first, then lower id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UpdateKey {
    /// Weak-order rank of the component.
    pub rank: usize,
    /// The component itself.
    pub id: ComponentId,
}

/// The slice of scheduler state that actions may read and extend.
///
/// Every [`EventRegistry`] trigger inside a [`Scheduler`] threads the agenda
/// through to the actions it fires, which is how a `needs_update` signal
/// turns into a contingent update.
///
/// [`EventRegistry`]: super::event::EventRegistry
/// [`Scheduler`]: super::scheduler::Scheduler
#[derive(Debug, Default)]
pub struct Agenda {
    now: Time,
    contingent: BTreeSet<UpdateKey>,
    ranks: Vec<usize>,
    stamps: Vec<Option<Time>>,
}

impl Agenda {
    /// Current simulated time.
    pub fn now(&self) -> Time {
        self.now
    }

    /// Queues a contingent update of `id` at the current time.
    /// Unknown ids are ignored.
    pub fn request_update(&mut self, id: ComponentId) {
        if let Some(key) = self.key(id) {
            self.contingent.insert(key);
        }
    }

    /// Whether `id` has a contingent update queued.
    pub fn is_pending(&self, id: ComponentId) -> bool {
        self.key(id).is_some_and(|key| self.contingent.contains(&key))
    }

    /// Number of queued contingent updates.
    pub fn pending_len(&self) -> usize {
        self.contingent.len()
    }

    /// Whether no contingent update is queued.
    pub fn is_idle(&self) -> bool {
        self.contingent.is_empty()
    }

    /// Queued contingent updates in the order they will run.
    pub fn pending(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.contingent.iter().map(|key| key.id)
    }

    /// Time `id` was last updated to; `None` before initialization.
    pub fn last_updated(&self, id: ComponentId) -> Option<Time> {
        self.stamps.get(id.index()).copied().flatten()
    }

    /// Weak-order rank of `id`. Before ranking this is the insertion index.
    pub fn rank(&self, id: ComponentId) -> Option<usize> {
        self.ranks.get(id.index()).copied()
    }

    /// Whether a completed update of `from` must re-trigger `to`.
    ///
    /// Edges that follow the rank order always propagate. An edge against
    /// the rank order exists only inside a dependency cycle; it propagates
    /// only while `to` has not been brought up to the current time yet.
    pub fn should_propagate(&self, from: ComponentId, to: ComponentId) -> bool {
        match (self.rank(from), self.rank(to)) {
            (Some(a), Some(b)) if a < b => true,
            (Some(_), Some(_)) => self.last_updated(to).is_none_or(|t| t < self.now),
            _ => false,
        }
    }

    pub(crate) fn register(&mut self) -> ComponentId {
        let id = ComponentId::new(self.ranks.len());
        self.ranks.push(id.index());
        self.stamps.push(None);
        id
    }

    /// Must be called with no contingent work queued.
    pub(crate) fn set_rank(&mut self, id: ComponentId, rank: usize) {
        debug_assert!(self.contingent.is_empty());
        if let Some(slot) = self.ranks.get_mut(id.index()) {
            *slot = rank;
        }
    }

    pub(crate) fn key(&self, id: ComponentId) -> Option<UpdateKey> {
        self.rank(id).map(|rank| UpdateKey { rank, id })
    }

    pub(crate) fn set_now(&mut self, now: Time) {
        self.now = now;
    }

    pub(crate) fn stamp(&mut self, id: ComponentId, t: Time) {
        if let Some(slot) = self.stamps.get_mut(id.index()) {
            *slot = Some(t);
        }
    }

    pub(crate) fn pop_pending(&mut self) -> Option<ComponentId> {
        self.contingent.pop_first().map(|key| key.id)
    }

    pub(crate) fn cancel(&mut self, id: ComponentId) {
        if let Some(key) = self.key(id) {
            self.contingent.remove(&key);
        }
    }

    pub(crate) fn clear_pending(&mut self) {
        self.contingent.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agenda(n: usize) -> (Agenda, Vec<ComponentId>) {
        let mut agenda = Agenda::default();
        let ids = (0..n).map(|_| agenda.register()).collect();
        (agenda, ids)
    }

    #[test]
    fn pending_work_runs_in_rank_order() {
        let (mut agenda, ids) = agenda(3);
        agenda.set_rank(ids[0], 2);
        agenda.set_rank(ids[1], 0);
        agenda.set_rank(ids[2], 1);

        for id in &ids {
            agenda.request_update(*id);
        }
        agenda.request_update(ids[0]);
        assert_eq!(agenda.pending_len(), 3);
        assert_eq!(agenda.pop_pending(), Some(ids[1]));
        assert_eq!(agenda.pop_pending(), Some(ids[2]));
        assert_eq!(agenda.pop_pending(), Some(ids[0]));
        assert!(agenda.is_idle());
    }

    #[test]
    fn cancel_removes_queued_update() {
        let (mut agenda, ids) = agenda(2);
        agenda.request_update(ids[1]);
        assert!(agenda.is_pending(ids[1]));
        agenda.cancel(ids[1]);
        assert!(!agenda.is_pending(ids[1]));
        agenda.cancel(ids[1]);
        assert!(agenda.is_idle());
    }

    #[test]
    fn unknown_id_is_ignored() {
        let (mut agenda, _) = agenda(1);
        agenda.request_update(ComponentId::new(7));
        assert!(agenda.is_idle());
        assert_eq!(agenda.last_updated(ComponentId::new(7)), None);
    }

    #[test]
    fn backward_edges_propagate_only_to_stale_targets() {
        let (mut agenda, ids) = agenda(2);
        let now = Time::from_secs(10);
        agenda.set_now(now);
        agenda.stamp(ids[0], Time::from_secs(0));
        agenda.stamp(ids[1], Time::from_secs(0));

        assert!(agenda.should_propagate(ids[0], ids[1]));
        assert!(agenda.should_propagate(ids[1], ids[0]));

        agenda.stamp(ids[0], now);
        assert!(!agenda.should_propagate(ids[1], ids[0]));
        agenda.stamp(ids[1], now);
        assert!(agenda.should_propagate(ids[0], ids[1]));
    }
}
