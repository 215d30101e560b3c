//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - observed series (`PricePoint`, `AlignedSeries`)
//! - pipeline outputs (`HistoricalRecord`, `ForecastRecord`, `TimelineRecord`)
//! - presentation payloads (`Metrics`, `FeatureScore`)
//! - run configuration (`PipelineConfig`)

pub mod types;

pub use types::*;
