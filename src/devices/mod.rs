//! Grid device components driven by the scheduler.

/// Residential base-load profile generator.
pub mod baseload;
/// Stationary battery storage model.
pub mod battery;
/// Feeder aggregate with import/export limits.
pub mod feeder;
/// Fixed-cadence update source.
pub mod heartbeat;
/// Solar photovoltaic generation model.
pub mod solar;
pub mod types;

// Re-export the main types for convenience
pub use baseload::BaseLoad;
pub use battery::Battery;
pub use feeder::Feeder;
pub use heartbeat::Heartbeat;
pub use solar::SolarPv;
pub use types::Device;
