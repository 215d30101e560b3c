//! Shared forecast pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! EIA fetch (or synthetic) -> model load -> reconstruct/forecast -> metrics -> timeline
//!
//! The result is built once and is read-only afterwards, so it can be shared
//! across threads behind an `Arc`.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::domain::{AlignedSeries, BranchReport, FeatureScore, Metrics, PipelineConfig, SeriesOrigin, TimelineRecord};
use crate::error::AppError;
use crate::models::{ModelHost, fallback_importance};

/// Immutable results of one pipeline run.
#[derive(Debug, Clone)]
pub struct ForecastService {
    origin: SeriesOrigin,
    timeline: Vec<TimelineRecord>,
    metrics: Metrics,
    importance: Vec<FeatureScore>,
    branches: BranchReport,
}

/// The JSON document printed by `--json` and written by `--export-json`.
#[derive(Debug, Serialize)]
pub struct DashboardPayload<'a> {
    pub forecast: &'a [TimelineRecord],
    pub metrics: Metrics,
    pub feature_importance: &'a [FeatureScore],
}

impl ForecastService {
    /// Fetch data, load models and run the whole pipeline once.
    pub fn build(config: &PipelineConfig, today: NaiveDate) -> Result<Arc<Self>, AppError> {
        let host = ModelHost::load(config);
        let series = crate::data::fetch_aligned(config, config.historical_weeks, today);
        Self::from_parts(&series, &host, config).map(Arc::new)
    }

    /// Run the pipeline on an already aligned series and loaded host.
    pub fn from_parts(series: &AlignedSeries, host: &ModelHost, config: &PipelineConfig) -> Result<Self, AppError> {
        let output = crate::forecast::generate(series, host, config.forecast_weeks, config.seed)?;
        let metrics = crate::report::compute_metrics(&output.history)?;
        let timeline = crate::report::assemble_timeline(&output.history, &output.forecast);
        let importance = host
            .feature_importance()
            .filter(|scores| !scores.is_empty())
            .unwrap_or_else(fallback_importance);

        info!(
            records = timeline.len(),
            origin = ?series.origin,
            current_price = metrics.current_price,
            "pipeline complete"
        );

        Ok(Self {
            origin: series.origin,
            timeline,
            metrics,
            importance,
            branches: output.branches,
        })
    }

    pub fn get_timeline(&self) -> &[TimelineRecord] {
        &self.timeline
    }

    pub fn get_metrics(&self) -> Metrics {
        self.metrics
    }

    /// Never empty: the static table stands in when the model has none.
    pub fn get_feature_importance(&self) -> &[FeatureScore] {
        &self.importance
    }

    pub fn origin(&self) -> SeriesOrigin {
        self.origin
    }

    pub fn branches(&self) -> BranchReport {
        self.branches
    }

    pub fn payload(&self) -> DashboardPayload<'_> {
        DashboardPayload {
            forecast: &self.timeline,
            metrics: self.metrics,
            feature_importance: &self.importance,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::data::synthetic_series;
    use crate::domain::BranchSource;
    use crate::models::testing::{StubRegression, StubTimeSeries, host};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 12).unwrap()
    }

    #[test]
    fn absent_models_give_full_timeline_and_static_importance() {
        let series = synthetic_series(52, today(), 42);
        let service = ForecastService::from_parts(&series, &ModelHost::empty(), &PipelineConfig::default()).unwrap();

        assert_eq!(service.get_timeline().len(), 65);
        assert_eq!(service.get_feature_importance(), fallback_importance().as_slice());
        let m = service.get_metrics();
        assert_eq!(m.timeseries_rmse, 0.0);
        assert_eq!(m.regression_rmse, 0.0);
        assert_eq!(m.current_price, crate::math::round_to(series.target[52], 2));
        assert_eq!(service.origin(), SeriesOrigin::Synthetic);
    }

    #[test]
    fn loaded_models_are_reported_per_branch() {
        let series = synthetic_series(20, today(), 42);
        let h = host(
            Some(Box::new(StubRegression::new(0.0))),
            Some(Box::new(StubTimeSeries { level: 0.0, fail: true })),
        );
        let service = ForecastService::from_parts(&series, &h, &PipelineConfig::default()).unwrap();
        let b = service.branches();
        assert_eq!(b.regression_history, BranchSource::Model);
        assert_eq!(b.regression_forecast, BranchSource::Model);
        assert_eq!(b.timeseries_history, BranchSource::Fallback);
        assert_eq!(b.timeseries_forecast, BranchSource::Fallback);
        // The stub has no importance of its own.
        assert_eq!(service.get_feature_importance().len(), 12);
    }

    #[test]
    fn payload_serializes_dashboard_shape() {
        let series = synthetic_series(10, today(), 42);
        let config = PipelineConfig {
            forecast_weeks: 3,
            ..PipelineConfig::default()
        };
        let service = ForecastService::from_parts(&series, &ModelHost::empty(), &config).unwrap();
        let json = serde_json::to_value(service.payload()).unwrap();

        let forecast = json["forecast"].as_array().unwrap();
        assert_eq!(forecast.len(), 14);
        assert!(forecast[13]["actual"].is_null());
        assert!(forecast[13]["sarima"].is_number());
        assert!(json["metrics"]["sarima_rmse"].is_number());
        assert!(json["metrics"]["current_price"].is_number());
        assert_eq!(json["feature_importance"].as_array().unwrap().len(), 12);

        let last_observed = series.last_date().unwrap();
        assert_eq!(
            forecast[11]["date"],
            (last_observed + Duration::weeks(1)).format("%Y-%m-%d").to_string()
        );
    }

    #[test]
    fn oversized_horizon_is_a_compute_error() {
        let series = synthetic_series(10, today(), 42);
        let config = PipelineConfig {
            forecast_weeks: 14_000_000,
            ..PipelineConfig::default()
        };
        let err = ForecastService::from_parts(&series, &ModelHost::empty(), &config).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_COMPUTE);
    }

    #[test]
    fn service_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Arc<ForecastService>>();
    }
}
