//! `fuelcast` library crate.
//!
//! The binary (`fuelcast`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning processes
//! - the service can be embedded behind another front-end (HTTP, notebooks)

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
