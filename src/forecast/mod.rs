//! Forecast orchestration.
//!
//! Given an aligned series and the model host this produces the in-sample
//! reconstruction of every observed week and a fixed-horizon forward forecast
//! for both models. Each model branch degrades on its own: a missing or failing
//! model yields placeholders (history) or a heuristic path (forecast) for that
//! branch only, and [`BranchReport`] records which path was taken.

pub mod history;
pub mod horizon;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::domain::{AlignedSeries, BranchReport, ForecastRecord, HistoricalRecord, MAX_WEEKS};
use crate::models::ModelHost;

use horizon::{forecast_regression, forecast_timeseries};

pub use horizon::{Heuristic, REGRESSION_FALLBACK, TIMESERIES_FALLBACK, forecast_dates, project_driver};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastError {
    #[error("cannot forecast from an empty series")]
    EmptySeries,
    #[error("forecast horizon of {0} weeks is out of range")]
    HorizonOutOfRange(usize),
}

/// Everything one orchestration run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastOutput {
    pub history: Vec<HistoricalRecord>,
    pub forecast: Vec<ForecastRecord>,
    pub projected_driver: Vec<f64>,
    pub branches: BranchReport,
}

/// Independent random streams for the stages that draw noise.
///
/// All three derive from one seed, so a run is reproducible while a fallback in
/// one branch leaves the other branch's draws untouched.
#[derive(Debug, Clone)]
pub struct StageRngs {
    pub driver: StdRng,
    pub timeseries: StdRng,
    pub regression: StdRng,
}

impl StageRngs {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            driver: StdRng::seed_from_u64(seed),
            timeseries: StdRng::seed_from_u64(seed.wrapping_add(1)),
            regression: StdRng::seed_from_u64(seed.wrapping_add(2)),
        }
    }
}

/// Run the full reconstruction and `horizon`-week forecast.
pub fn generate(
    series: &AlignedSeries,
    host: &ModelHost,
    horizon: usize,
    seed: u64,
) -> Result<ForecastOutput, ForecastError> {
    let last_date = series.last_date().ok_or(ForecastError::EmptySeries)?;
    if horizon > MAX_WEEKS {
        return Err(ForecastError::HorizonOutOfRange(horizon));
    }
    let mut rngs = StageRngs::from_seed(seed);

    let (ts_history, ts_history_source) = history::reconstruct_timeseries(series, host);
    let (reg_history, reg_history_source) = history::reconstruct_regression(series, host);

    let history = series
        .dates
        .iter()
        .zip(&series.target)
        .zip(ts_history.iter().zip(&reg_history))
        .map(|((date, actual), (ts, reg))| HistoricalRecord {
            date: *date,
            actual: *actual,
            timeseries: *ts,
            regression: *reg,
        })
        .collect();

    let dates = forecast_dates(last_date, horizon)?;
    let projected_driver = project_driver(&series.driver, horizon, &mut rngs.driver);
    let (ts_forecast, ts_forecast_source) =
        forecast_timeseries(series, host, &projected_driver, &mut rngs.timeseries);
    let (reg_forecast, reg_forecast_source) =
        forecast_regression(series, host, &projected_driver, &dates, &mut rngs.regression);

    let forecast = dates
        .iter()
        .zip(ts_forecast.iter().zip(&reg_forecast))
        .map(|(date, (ts, reg))| ForecastRecord {
            date: *date,
            timeseries: *ts,
            regression: *reg,
        })
        .collect();

    let branches = BranchReport {
        timeseries_history: ts_history_source,
        regression_history: reg_history_source,
        timeseries_forecast: ts_forecast_source,
        regression_forecast: reg_forecast_source,
    };
    info!(
        weeks = series.len(),
        horizon,
        timeseries = ?branches.timeseries_forecast,
        regression = ?branches.regression_forecast,
        "forecast generated"
    );

    Ok(ForecastOutput {
        history,
        forecast,
        projected_driver,
        branches,
    })
}
