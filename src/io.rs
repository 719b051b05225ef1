//! Output formats for scenario results.

pub mod export;
