//! Dependency-aware discrete-event simulator for small grid models.
//!
//! Components declare what they depend on, the [`sim::scheduler::Scheduler`]
//! ranks them by that graph, and updates are driven either by each
//! component's own schedule or by contingent requests raised through the
//! [`sim::event`] registry.

pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
pub mod io;
pub mod runner;
/// Scheduler, events, ordering and reporting.
pub mod sim;
