//! Time-series source: provider fetch with synthetic fallback.

pub mod eia;
pub mod sample;

use chrono::{Duration, NaiveDate};
use tracing::{info, warn};

use crate::domain::{AlignedSeries, MAX_WEEKS, PipelineConfig};

pub use eia::{EiaClient, SourceError};
pub use sample::synthetic_series;

/// Fetch the aligned target/driver series for the last `weeks` weeks.
///
/// Never fails: any provider problem (network, timeout, status, payload shape,
/// no overlapping dates) is logged and replaced by a synthetic series of the
/// same shape. There is no retry. `weeks` is clamped to `1..=MAX_WEEKS`.
pub fn fetch_aligned(config: &PipelineConfig, weeks: usize, today: NaiveDate) -> AlignedSeries {
    let clamped = weeks.clamp(1, MAX_WEEKS);
    if clamped != weeks {
        warn!(requested = weeks, using = clamped, "history length out of range");
    }
    let weeks = clamped;
    match fetch_from_provider(config, weeks, today) {
        Ok(series) => {
            info!(points = series.len(), "using EIA price history");
            series
        }
        Err(err) => {
            warn!(error = %err, "EIA data unavailable, generating synthetic series");
            synthetic_series(weeks, today, config.synthetic_seed)
        }
    }
}

fn fetch_from_provider(
    config: &PipelineConfig,
    weeks: usize,
    today: NaiveDate,
) -> Result<AlignedSeries, SourceError> {
    let start = i64::try_from(weeks)
        .ok()
        .and_then(|w| today.checked_sub_signed(Duration::weeks(w)))
        .ok_or(SourceError::Lookback(weeks))?;
    let client = EiaClient::from_config(config)?;
    client.fetch_aligned(start, weeks)
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use super::*;
    use crate::domain::SeriesOrigin;

    #[test]
    fn unreachable_provider_falls_back_to_synthetic() {
        let config = PipelineConfig {
            // Port 9 (discard) is closed on test machines; the connection is refused quickly.
            eia_base_url: "http://127.0.0.1:9/v2".to_string(),
            request_timeout: StdDuration::from_millis(500),
            ..PipelineConfig::default()
        };
        let today = NaiveDate::from_ymd_opt(2025, 6, 12).unwrap();

        let series = fetch_aligned(&config, 52, today);
        assert_eq!(series.origin, SeriesOrigin::Synthetic);
        assert_eq!(series.len(), 53);
        assert_eq!(series.target.len(), series.driver.len());
        for w in series.dates.windows(2) {
            assert!(w[0] < w[1]);
        }
    }

    #[test]
    fn zero_weeks_is_clamped() {
        let config = PipelineConfig {
            eia_base_url: "http://127.0.0.1:9/v2".to_string(),
            request_timeout: StdDuration::from_millis(500),
            ..PipelineConfig::default()
        };
        let today = NaiveDate::from_ymd_opt(2025, 6, 12).unwrap();
        let series = fetch_aligned(&config, 0, today);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn oversized_lookback_is_clamped_instead_of_overflowing() {
        let config = PipelineConfig {
            eia_base_url: "http://127.0.0.1:9/v2".to_string(),
            request_timeout: StdDuration::from_millis(500),
            ..PipelineConfig::default()
        };
        let today = NaiveDate::from_ymd_opt(2025, 6, 12).unwrap();
        let series = fetch_aligned(&config, 20_000_000, today);
        assert_eq!(series.origin, SeriesOrigin::Synthetic);
        assert_eq!(series.len(), MAX_WEEKS + 1);
    }

    #[test]
    fn lookback_before_the_calendar_is_a_source_error() {
        let config = PipelineConfig::default();
        let err = fetch_from_provider(&config, 10, NaiveDate::MIN).unwrap_err();
        assert_eq!(err, SourceError::Lookback(10));
    }
}
