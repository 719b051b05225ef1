//! Error types for model assembly and simulation driving.

use crate::sim::clock::Time;
use crate::sim::component::ComponentId;
use crate::sim::event::{ActionId, EventId};

/// Errors raised by the Event/Action registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The event handle does not refer to a live event.
    #[error("unknown event {0}")]
    UnknownEvent(EventId),

    /// The action handle does not refer to a live action.
    #[error("unknown action {0}")]
    UnknownAction(ActionId),
}

/// Errors raised while assembling or driving a [`Scheduler`].
///
/// [`Scheduler`]: crate::sim::scheduler::Scheduler
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// The component id does not belong to this scheduler.
    #[error("unknown component {0}")]
    UnknownComponent(ComponentId),

    /// A component with the same name was already added.
    #[error("duplicate component name \"{0}\"")]
    DuplicateComponent(String),

    /// A component was declared to depend on itself.
    #[error("component {0} cannot depend on itself")]
    SelfDependency(ComponentId),

    /// The model can no longer change because the scheduler was initialized.
    #[error("model is frozen after initialize()")]
    ModelFrozen,

    /// `initialize()` was called on an already initialized scheduler.
    #[error("scheduler is already initialized")]
    AlreadyInitialized,

    /// A driving operation was called before `initialize()`.
    #[error("scheduler is not initialized")]
    NotInitialized,

    /// The simulation window is empty or reversed.
    #[error("start time {start} must precede end time {end}")]
    InvalidWindow {
        /// Requested start time.
        start: Time,
        /// Requested end time.
        end: Time,
    },

    /// The watchdog limit on updates within one instant was exceeded.
    #[error("stalled at {time} after {updates} updates in one instant")]
    Stalled {
        /// The instant that never completed.
        time: Time,
        /// Updates performed at that instant when the watchdog fired.
        updates: u64,
    },

    /// An Event/Action registry operation failed.
    #[error(transparent)]
    Event(#[from] EventError),
}
