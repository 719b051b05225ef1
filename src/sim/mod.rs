/// Contingent work queue and timestamps shared with event actions.
pub mod agenda;
/// Simulated time with infinite sentinels.
pub mod clock;
/// Component trait, lifecycle events and update context.
pub mod component;
/// Event/Action registry.
pub mod event;
pub mod kpi;
/// Discrete-event scheduler.
pub mod scheduler;
pub mod weak_order;
/// Step and update records.
pub mod types;
