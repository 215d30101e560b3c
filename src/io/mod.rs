//! Input/output helpers: timeline exports (CSV/JSON).

pub mod export;

pub use export::*;
