//! In-sample reconstruction of the observed weeks.

use tracing::{debug, warn};

use crate::domain::{AlignedSeries, BranchSource, FeatureRow};
use crate::models::ModelHost;

/// Longest lag used by the regression features.
pub const REGRESSION_MAX_LAG: usize = 4;

/// Time-series column over the whole history; `actual` when the model cannot supply it.
pub fn reconstruct_timeseries(series: &AlignedSeries, host: &ModelHost) -> (Vec<f64>, BranchSource) {
    match host.predict_timeseries_insample(series.len(), &series.driver) {
        Some(fitted) => (fitted, BranchSource::Model),
        None => (series.target.clone(), BranchSource::Fallback),
    }
}

/// Feature rows for every week whose lags exist, paired with the week index.
pub fn history_feature_rows(series: &AlignedSeries) -> Vec<(usize, FeatureRow)> {
    (0..series.len())
        .filter_map(|t| {
            let lag1 = series.target[t.checked_sub(1)?];
            let lag4 = series.driver[t.checked_sub(REGRESSION_MAX_LAG)?];
            Some((t, FeatureRow::for_date(series.dates[t], series.driver[t], lag1, lag4)))
        })
        .collect()
}

/// Regression column over the whole history.
///
/// Predictions overwrite only the weeks with complete features, and only if the
/// whole batch succeeds. Every other week keeps the observed value.
pub fn reconstruct_regression(series: &AlignedSeries, host: &ModelHost) -> (Vec<f64>, BranchSource) {
    let mut column = series.target.clone();
    if !host.regression().is_loaded() {
        return (column, BranchSource::Fallback);
    }

    let indexed = history_feature_rows(series);
    if indexed.is_empty() {
        debug!(weeks = series.len(), "history too short for lagged features");
        return (column, BranchSource::Fallback);
    }

    let rows: Vec<FeatureRow> = indexed.iter().map(|(_, row)| *row).collect();
    match host.predict_regression(&rows) {
        Ok(predictions) => {
            for ((t, _), value) in indexed.iter().zip(predictions) {
                column[*t] = value;
            }
            (column, BranchSource::Model)
        }
        Err(err) => {
            warn!(error = %err, "in-sample regression failed; keeping observed values");
            (column, BranchSource::Fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::domain::SeriesOrigin;
    use crate::models::testing::{StubRegression, StubTimeSeries, host};

    fn series(n: usize) -> AlignedSeries {
        let start = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        AlignedSeries {
            dates: (0..n).map(|i| start + Duration::weeks(i as i64)).collect(),
            target: (0..n).map(|i| 3.0 + 0.1 * i as f64).collect(),
            driver: (0..n).map(|i| 70.0 + i as f64).collect(),
            origin: SeriesOrigin::Synthetic,
        }
    }

    #[test]
    fn feature_rows_start_at_lag_four() {
        let s = series(6);
        let rows = history_feature_rows(&s);
        assert_eq!(rows.len(), 2);
        let (t, row) = rows[0];
        assert_eq!(t, 4);
        assert_eq!(row.close, 74.0);
        assert!((row.gas_price_lag1 - 3.3).abs() < 1e-12);
        assert_eq!(row.crude_price_lag4, 70.0);
        assert!(history_feature_rows(&series(4)).is_empty());
    }

    #[test]
    fn regression_history_keeps_first_weeks() {
        let s = series(8);
        let host = host(Some(Box::new(StubRegression::new(1.0))), None);
        let (column, source) = reconstruct_regression(&s, &host);
        assert_eq!(source, BranchSource::Model);
        assert_eq!(&column[..4], &s.target[..4]);
        for t in 4..8 {
            assert!((column[t] - (s.target[t - 1] + 1.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn regression_history_is_all_or_nothing() {
        let s = series(8);
        let host = host(Some(Box::new(StubRegression::failing_on(1.0, 1))), None);
        let (column, source) = reconstruct_regression(&s, &host);
        assert_eq!(source, BranchSource::Fallback);
        assert_eq!(column, s.target);
    }

    #[test]
    fn short_history_falls_back_without_calling_model() {
        let s = series(3);
        let host = host(Some(Box::new(StubRegression::failing_on(1.0, 1))), None);
        let (column, source) = reconstruct_regression(&s, &host);
        assert_eq!(source, BranchSource::Fallback);
        assert_eq!(column, s.target);
    }

    #[test]
    fn timeseries_history_uses_model_or_actual() {
        let s = series(5);
        let ok = host(None, Some(Box::new(StubTimeSeries { level: -67.0, fail: false })));
        let (column, source) = reconstruct_timeseries(&s, &ok);
        assert_eq!(source, BranchSource::Model);
        assert_eq!(column, vec![3.0, 4.0, 5.0, 6.0, 7.0]);

        let failing = host(None, Some(Box::new(StubTimeSeries { level: 0.0, fail: true })));
        let (column, source) = reconstruct_timeseries(&s, &failing);
        assert_eq!(source, BranchSource::Fallback);
        assert_eq!(column, s.target);
    }
}
