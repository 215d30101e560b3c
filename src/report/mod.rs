//! Reporting: accuracy metrics and the presentation timeline.

pub mod format;

use crate::domain::{ForecastRecord, ForecastTimeline, HistoricalRecord, Metrics, TimelineRecord};
use crate::math::round_to;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    #[error("length mismatch: {actual} actual values vs {predicted} predictions")]
    LengthMismatch { actual: usize, predicted: usize },
    #[error("cannot score an empty series")]
    Empty,
}

/// Root mean squared error between two equal-length, non-empty slices.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64, MetricsError> {
    if actual.len() != predicted.len() {
        return Err(MetricsError::LengthMismatch {
            actual: actual.len(),
            predicted: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(MetricsError::Empty);
    }
    let sse: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    Ok((sse / actual.len() as f64).sqrt())
}

/// Per-model RMSE over the observed weeks plus the latest observed price.
pub fn compute_metrics(history: &[HistoricalRecord]) -> Result<Metrics, MetricsError> {
    let last = history.last().ok_or(MetricsError::Empty)?;
    let actual: Vec<f64> = history.iter().map(|r| r.actual).collect();
    let timeseries: Vec<f64> = history.iter().map(|r| r.timeseries).collect();
    let regression: Vec<f64> = history.iter().map(|r| r.regression).collect();

    Ok(Metrics {
        timeseries_rmse: round_to(rmse(&actual, &timeseries)?, 3),
        regression_rmse: round_to(rmse(&actual, &regression)?, 3),
        current_price: round_to(last.actual, 2),
    })
}

/// Historical rows then forecast rows, prices rounded to cents.
pub fn assemble_timeline(history: &[HistoricalRecord], forecast: &[ForecastRecord]) -> ForecastTimeline {
    let past = history.iter().map(|r| TimelineRecord {
        date: r.date.format("%Y-%m-%d").to_string(),
        actual: Some(round_to(r.actual, 2)),
        timeseries: Some(round_to(r.timeseries, 2)),
        regression: Some(round_to(r.regression, 2)),
    });
    let future = forecast.iter().map(|r| TimelineRecord {
        date: r.date.format("%Y-%m-%d").to_string(),
        actual: None,
        timeseries: Some(round_to(r.timeseries, 2)),
        regression: Some(round_to(r.regression, 2)),
    });
    past.chain(future).collect()
}
