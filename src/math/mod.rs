//! Mathematical utilities shared by the forecast and report stages.

pub mod stats;

pub use stats::*;
