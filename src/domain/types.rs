//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory while the pipeline runs
//! - handed read-only to the presentation layer
//! - exported to JSON/CSV

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Default EIA v2 API root.
pub const EIA_BASE_URL: &str = "https://api.eia.gov/v2";

/// Longest history or horizon the pipeline accepts, in weeks (about a century).
pub const MAX_WEEKS: usize = 5200;

/// A single dated observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Where an aligned series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesOrigin {
    Provider,
    Synthetic,
}

/// Target and driver series joined on date.
///
/// `dates`, `target` and `driver` always have the same length and matching
/// positions. An empty series is valid; callers decide how to degrade.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    pub dates: Vec<NaiveDate>,
    pub target: Vec<f64>,
    pub driver: Vec<f64>,
    pub origin: SeriesOrigin,
}

impl AlignedSeries {
    /// Inner-join two ascending, deduplicated series on exact date equality.
    ///
    /// Dates present in only one of the inputs are dropped.
    pub fn inner_join(target: &[PricePoint], driver: &[PricePoint], origin: SeriesOrigin) -> Self {
        let mut dates = Vec::new();
        let mut t_out = Vec::new();
        let mut d_out = Vec::new();

        let (mut i, mut j) = (0, 0);
        while i < target.len() && j < driver.len() {
            let (a, b) = (&target[i], &driver[j]);
            match a.date.cmp(&b.date) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    dates.push(a.date);
                    t_out.push(a.value);
                    d_out.push(b.value);
                    i += 1;
                    j += 1;
                }
            }
        }

        Self {
            dates,
            target: t_out,
            driver: d_out,
            origin,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn last_target(&self) -> Option<f64> {
        self.target.last().copied()
    }
}

/// One observed week with both models' in-sample reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub date: NaiveDate,
    pub actual: f64,
    pub timeseries: f64,
    pub regression: f64,
}

/// One future week. There is no `actual` field: the week is unobserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub timeseries: f64,
    pub regression: f64,
}

/// A presentation row of the combined timeline.
///
/// Field names on the wire follow the dashboard contract (`sarima`, `xgboost`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineRecord {
    pub date: String,
    pub actual: Option<f64>,
    #[serde(rename = "sarima")]
    pub timeseries: Option<f64>,
    #[serde(rename = "xgboost")]
    pub regression: Option<f64>,
}

/// Ordered history-then-forecast rows.
pub type ForecastTimeline = Vec<TimelineRecord>;

/// Accuracy summary over the historical span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(rename = "sarima_rmse")]
    pub timeseries_rmse: f64,
    #[serde(rename = "xgboost_rmse")]
    pub regression_rmse: f64,
    pub current_price: f64,
}

/// A named importance score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    pub feature: String,
    pub score: f64,
}

impl FeatureScore {
    pub fn new(feature: impl Into<String>, score: f64) -> Self {
        Self {
            feature: feature.into(),
            score,
        }
    }
}

/// Which path produced a column of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchSource {
    /// Output of a loaded model.
    Model,
    /// Placeholder or heuristic used because the model was absent or failed.
    Fallback,
}

/// Provenance of every generated column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchReport {
    pub timeseries_history: BranchSource,
    pub regression_history: BranchSource,
    pub timeseries_forecast: BranchSource,
    pub regression_forecast: BranchSource,
}

/// Input row for the regression model.
///
/// Field names match the feature names the model was trained with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow {
    pub close: f64,
    pub dayofyear: f64,
    pub month: f64,
    pub year: f64,
    pub gas_price_lag1: f64,
    pub crude_price_lag4: f64,
}

impl FeatureRow {
    /// Canonical training order of the features.
    pub const NAMES: [&'static str; 6] = [
        "close",
        "dayofyear",
        "month",
        "year",
        "gas_price_lag1",
        "crude_price_lag4",
    ];

    /// Build a row, taking the calendar fields from `date`.
    pub fn for_date(date: NaiveDate, close: f64, gas_price_lag1: f64, crude_price_lag4: f64) -> Self {
        Self {
            close,
            dayofyear: date.ordinal() as f64,
            month: date.month() as f64,
            year: date.year() as f64,
            gas_price_lag1,
            crude_price_lag4,
        }
    }

    /// Value by canonical position (see [`FeatureRow::NAMES`]).
    pub fn get(&self, index: usize) -> Option<f64> {
        match index {
            0 => Some(self.close),
            1 => Some(self.dayofyear),
            2 => Some(self.month),
            3 => Some(self.year),
            4 => Some(self.gas_price_lag1),
            5 => Some(self.crude_price_lag4),
            _ => None,
        }
    }

    pub fn position(name: &str) -> Option<usize> {
        Self::NAMES.iter().position(|n| *n == name)
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults and `.env`).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Lookback window for the provider query.
    pub historical_weeks: usize,
    /// Number of future weeks to forecast.
    pub forecast_weeks: usize,
    /// Seed for the pipeline's noise terms.
    pub seed: u64,
    /// Seed for the synthetic fallback series.
    pub synthetic_seed: u64,
    pub regression_model_path: PathBuf,
    pub timeseries_model_path: PathBuf,
    pub eia_base_url: String,
    pub eia_api_key: Option<String>,
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            historical_weeks: 52,
            forecast_weeks: 12,
            seed: 42,
            synthetic_seed: 42,
            regression_model_path: PathBuf::from("xgboost_gas_model.json"),
            timeseries_model_path: PathBuf::from("sarimax_gas_model.json"),
            eia_base_url: EIA_BASE_URL.to_string(),
            eia_api_key: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}
