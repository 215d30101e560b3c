//! Forward forecast: driver projection, both model branches and their heuristics.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use tracing::warn;

use crate::domain::{AlignedSeries, BranchSource, FeatureRow};
use crate::forecast::ForecastError;
use crate::forecast::history::REGRESSION_MAX_LAG;
use crate::math::{gaussian, mean, pct_change_std};
use crate::models::{ModelHost, PredictionError};

/// Window for the projected driver level.
const DRIVER_LEVEL_WINDOW: usize = 12;
/// Distance back to the observation the driver trend is measured from.
const DRIVER_TREND_SPAN: usize = 13;

/// Linear drift plus Gaussian noise used when a model branch cannot produce output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heuristic {
    pub slope: f64,
    pub noise_std: f64,
}

pub const TIMESERIES_FALLBACK: Heuristic = Heuristic {
    slope: 0.01,
    noise_std: 0.04,
};

pub const REGRESSION_FALLBACK: Heuristic = Heuristic {
    slope: 0.012,
    noise_std: 0.03,
};

impl Heuristic {
    /// `last + slope * i + N(0, noise_std^2)` for `i` in `0..horizon`.
    pub fn path(&self, last: f64, horizon: usize, rng: &mut StdRng) -> Vec<f64> {
        (0..horizon)
            .map(|i| last + self.slope * i as f64 + gaussian(rng, self.noise_std))
            .collect()
    }
}

/// Weekly dates following `last`; errors if any would fall past the calendar.
pub fn forecast_dates(last: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>, ForecastError> {
    (1..=horizon)
        .map(|k| {
            i64::try_from(k)
                .ok()
                .and_then(|k| last.checked_add_signed(Duration::weeks(k)))
                .ok_or(ForecastError::HorizonOutOfRange(horizon))
        })
        .collect()
}

/// Future driver values: recent level plus recent trend plus unit noise.
///
/// The trend is zero when fewer than 13 observations exist. An empty driver
/// projects around zero.
pub fn project_driver(driver: &[f64], horizon: usize, rng: &mut StdRng) -> Vec<f64> {
    let n = driver.len();
    let window = &driver[n.saturating_sub(DRIVER_LEVEL_WINDOW)..];
    let level = mean(window).unwrap_or(0.0);
    let trend = if n >= DRIVER_TREND_SPAN {
        (driver[n - 1] - driver[n - DRIVER_TREND_SPAN]) / DRIVER_TREND_SPAN as f64
    } else {
        0.0
    };

    (0..horizon)
        .map(|i| level + trend * i as f64 + gaussian(rng, 1.0))
        .collect()
}

/// Time-series branch: the model's forward forecast or the heuristic.
pub fn forecast_timeseries(
    series: &AlignedSeries,
    host: &ModelHost,
    projected_driver: &[f64],
    rng: &mut StdRng,
) -> (Vec<f64>, BranchSource) {
    let horizon = projected_driver.len();
    match host.predict_timeseries_forecast(projected_driver, horizon) {
        Some(values) => (values, BranchSource::Model),
        None => {
            let last = series.last_target().unwrap_or(0.0);
            (TIMESERIES_FALLBACK.path(last, horizon, rng), BranchSource::Fallback)
        }
    }
}

/// Regression branch: autoregressive one-step predictions or the heuristic.
///
/// A failure at any step discards the steps already computed.
pub fn forecast_regression(
    series: &AlignedSeries,
    host: &ModelHost,
    projected_driver: &[f64],
    dates: &[NaiveDate],
    rng: &mut StdRng,
) -> (Vec<f64>, BranchSource) {
    if host.regression().is_loaded() {
        match autoregressive(series, host, projected_driver, dates, rng) {
            Ok(values) => return (values, BranchSource::Model),
            Err(err) => warn!(error = %err, "regression forecast failed; using heuristic for all steps"),
        }
    }
    let last = series.last_target().unwrap_or(0.0);
    (REGRESSION_FALLBACK.path(last, dates.len(), rng), BranchSource::Fallback)
}

fn autoregressive(
    series: &AlignedSeries,
    host: &ModelHost,
    projected_driver: &[f64],
    dates: &[NaiveDate],
    rng: &mut StdRng,
) -> Result<Vec<f64>, PredictionError> {
    let n = series.len();
    if n == 0 {
        return Err(PredictionError::InvalidInput("no observed history".to_string()));
    }
    if projected_driver.len() < dates.len() {
        return Err(PredictionError::LengthMismatch {
            expected: dates.len(),
            got: projected_driver.len(),
        });
    }

    let sigma = pct_change_std(&series.target);
    let mut lags: Vec<f64> = series.target[n.saturating_sub(REGRESSION_MAX_LAG)..].to_vec();
    let mut out = Vec::with_capacity(dates.len());

    for (i, date) in dates.iter().enumerate() {
        let lag1 = *lags
            .last()
            .ok_or_else(|| PredictionError::InvalidInput("empty lag buffer".to_string()))?;
        let crude_lag4 = if i < REGRESSION_MAX_LAG {
            // Clamped to the first observation when history is shorter than the lag.
            series.driver[n.saturating_sub(REGRESSION_MAX_LAG - i)]
        } else {
            projected_driver[i - REGRESSION_MAX_LAG]
        };
        let row = FeatureRow::for_date(*date, projected_driver[i], lag1, crude_lag4);

        let prediction = host
            .predict_regression(std::slice::from_ref(&row))?
            .first()
            .copied()
            .ok_or(PredictionError::LengthMismatch { expected: 1, got: 0 })?;
        if !prediction.is_finite() {
            return Err(PredictionError::NonFinite { index: i });
        }

        let value = prediction + prediction * gaussian(rng, sigma);
        lags.push(value);
        out.push(value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::domain::SeriesOrigin;
    use crate::models::testing::{StubRegression, StubTimeSeries, host};

    fn flat_series(n: usize) -> AlignedSeries {
        let start = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        AlignedSeries {
            dates: (0..n).map(|i| start + Duration::weeks(i as i64)).collect(),
            target: vec![3.0; n],
            driver: (0..n).map(|i| 60.0 + i as f64).collect(),
            origin: SeriesOrigin::Synthetic,
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn dates_step_weekly() {
        let last = NaiveDate::from_ymd_opt(2025, 12, 22).unwrap();
        let dates = forecast_dates(last, 3).unwrap();
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2025, 12, 29).unwrap());
        assert_eq!(dates[2], NaiveDate::from_ymd_opt(2026, 1, 12).unwrap());
        assert!(forecast_dates(last, 0).unwrap().is_empty());
    }

    #[test]
    fn dates_past_the_calendar_are_an_error() {
        assert_eq!(
            forecast_dates(NaiveDate::MAX, 1),
            Err(ForecastError::HorizonOutOfRange(1))
        );
    }

    #[test]
    fn driver_trend_uses_thirteen_week_span() {
        // 20 points rising by 1: level of the last 12 is 13.5, trend 12/13.
        let driver: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let projected = project_driver(&driver, 30, &mut rng());
        let trend = 12.0 / 13.0;
        let residuals: Vec<f64> = projected
            .iter()
            .enumerate()
            .map(|(i, v)| v - (13.5 + trend * i as f64))
            .collect();
        let m = mean(&residuals).unwrap();
        assert!(m.abs() < 1.0, "noise should be centered, mean residual {m}");
        assert!(residuals.iter().all(|r| r.abs() < 5.0));
    }

    #[test]
    fn short_driver_has_no_trend() {
        let driver = [10.0, 20.0, 30.0];
        let mut a = rng();
        let projected = project_driver(&driver, 4, &mut a);
        let mut b = rng();
        for (i, v) in projected.iter().enumerate() {
            let expected = 20.0 + gaussian(&mut b, 1.0);
            assert!((v - expected).abs() < 1e-12, "step {i}");
        }
    }

    #[test]
    fn timeseries_branch_falls_back_to_heuristic() {
        let s = flat_series(20);
        let projected = vec![0.5; 12];
        let failing = host(None, Some(Box::new(StubTimeSeries { level: 0.0, fail: true })));
        let (values, source) = forecast_timeseries(&s, &failing, &projected, &mut rng());
        assert_eq!(source, BranchSource::Fallback);
        assert_eq!(values, TIMESERIES_FALLBACK.path(3.0, 12, &mut rng()));

        let ok = host(None, Some(Box::new(StubTimeSeries { level: 1.0, fail: false })));
        let (values, source) = forecast_timeseries(&s, &ok, &projected, &mut rng());
        assert_eq!(source, BranchSource::Model);
        assert_eq!(values, vec![1.5; 12]);
    }

    #[test]
    fn regression_feeds_predictions_back_as_lags() {
        // Flat history gives sigma 0, so the stub's +0.1 steps compound exactly.
        let s = flat_series(20);
        let dates = forecast_dates(s.last_date().unwrap(), 5).unwrap();
        let projected = vec![70.0; 5];
        let h = host(Some(Box::new(StubRegression::new(0.1))), None);
        let (values, source) = forecast_regression(&s, &h, &projected, &dates, &mut rng());
        assert_eq!(source, BranchSource::Model);
        for (i, v) in values.iter().enumerate() {
            assert!((v - (3.0 + 0.1 * (i + 1) as f64)).abs() < 1e-9);
        }
    }

    #[test]
    fn failure_mid_horizon_replaces_whole_branch() {
        let s = flat_series(20);
        let dates = forecast_dates(s.last_date().unwrap(), 12).unwrap();
        let projected = vec![70.0; 12];
        // Steps 1 and 2 succeed with a large jump; step 3 fails.
        let h = host(Some(Box::new(StubRegression::failing_on(100.0, 3))), None);
        let (values, source) = forecast_regression(&s, &h, &projected, &dates, &mut rng());
        assert_eq!(source, BranchSource::Fallback);

        // The two completed steps each drew one noise term before the failure.
        let mut expected_rng = rng();
        gaussian(&mut expected_rng, 0.0);
        gaussian(&mut expected_rng, 0.0);
        assert_eq!(values, REGRESSION_FALLBACK.path(3.0, 12, &mut expected_rng));
    }

    #[test]
    fn lag_four_is_clamped_on_short_history() {
        // Two observations: steps 0..=2 must read driver[0], step 3 reads driver[1].
        let s = flat_series(2);
        let dates = forecast_dates(s.last_date().unwrap(), 6).unwrap();
        let projected: Vec<f64> = (0..6).map(|i| 80.0 + i as f64).collect();

        struct Recorder(std::sync::Mutex<Vec<f64>>);
        impl crate::models::RegressionModel for Recorder {
            fn name(&self) -> &str {
                "recorder"
            }
            fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, PredictionError> {
                let mut seen = self.0.lock().unwrap();
                seen.extend(rows.iter().map(|r| r.crude_price_lag4));
                Ok(rows.iter().map(|r| r.gas_price_lag1).collect())
            }
        }

        let recorder = std::sync::Arc::new(Recorder(std::sync::Mutex::new(Vec::new())));
        struct Shared(std::sync::Arc<Recorder>);
        impl crate::models::RegressionModel for Shared {
            fn name(&self) -> &str {
                "shared"
            }
            fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, PredictionError> {
                self.0.predict(rows)
            }
        }

        let h = host(Some(Box::new(Shared(recorder.clone()))), None);
        let (_, source) = forecast_regression(&s, &h, &projected, &dates, &mut rng());
        assert_eq!(source, BranchSource::Model);
        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(seen, vec![60.0, 60.0, 60.0, 61.0, 80.0, 81.0]);
    }

    #[test]
    fn absent_regression_uses_heuristic() {
        let s = flat_series(10);
        let dates = forecast_dates(s.last_date().unwrap(), 4).unwrap();
        let h = host(None, None);
        let (values, source) = forecast_regression(&s, &h, &[70.0; 4], &dates, &mut rng());
        assert_eq!(source, BranchSource::Fallback);
        assert_eq!(values, REGRESSION_FALLBACK.path(3.0, 4, &mut rng()));
    }
}
