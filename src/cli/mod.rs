//! Command-line parsing for the weekly gasoline forecaster.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline and presentation code.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::domain::{EIA_BASE_URL, MAX_WEEKS, PipelineConfig};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fuelcast", version, about = "Weekly US gasoline price forecaster (EIA-based)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the timeline, print summary and table, and optionally export.
    Forecast(ForecastArgs),
    /// Print the accuracy metrics only.
    Metrics(CommonArgs),
    /// Print the regression model's feature importance.
    Importance(CommonArgs),
    /// Plot the timeline in the terminal.
    Plot(PlotArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Weeks of history to request from EIA.
    #[arg(long, default_value_t = 52, value_parser = parse_weeks)]
    pub weeks: usize,

    /// Weeks to forecast.
    #[arg(long, default_value_t = 12, value_parser = parse_weeks)]
    pub horizon: usize,

    /// Seed for the forecast noise terms.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Seed for the synthetic series used when EIA is unavailable.
    #[arg(long, default_value_t = 42)]
    pub synthetic_seed: u64,

    /// XGBoost JSON model file.
    #[arg(long, value_name = "JSON", default_value = "xgboost_gas_model.json")]
    pub regression_model: PathBuf,

    /// SARIMAX JSON model file.
    #[arg(long, value_name = "JSON", default_value = "sarimax_gas_model.json")]
    pub timeseries_model: PathBuf,

    /// EIA API base URL.
    #[arg(long, default_value = EIA_BASE_URL)]
    pub eia_url: String,

    /// HTTP timeout for EIA requests, in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Print machine-readable JSON instead of tables.
    #[arg(long)]
    pub json: bool,
}

impl CommonArgs {
    /// Pipeline configuration; the API key comes from the environment, not argv.
    pub fn to_config(&self, eia_api_key: Option<String>) -> PipelineConfig {
        PipelineConfig {
            historical_weeks: self.weeks,
            forecast_weeks: self.horizon,
            seed: self.seed,
            synthetic_seed: self.synthetic_seed,
            regression_model_path: self.regression_model.clone(),
            timeseries_model_path: self.timeseries_model.clone(),
            eia_base_url: self.eia_url.clone(),
            eia_api_key,
            request_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// A week count in `1..=MAX_WEEKS`.
fn parse_weeks(raw: &str) -> Result<usize, String> {
    let weeks: usize = raw.parse().map_err(|e| format!("`{raw}` is not a week count: {e}"))?;
    if (1..=MAX_WEEKS).contains(&weeks) {
        Ok(weeks)
    } else {
        Err(format!("must be between 1 and {MAX_WEEKS}"))
    }
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Export the timeline to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export timeline, metrics and importance to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_defaults() {
        let cli = Cli::parse_from(["fuelcast", "metrics"]);
        let Command::Metrics(args) = cli.command else {
            panic!("expected metrics subcommand");
        };
        let config = args.to_config(None);
        let defaults = PipelineConfig::default();
        assert_eq!(config.historical_weeks, defaults.historical_weeks);
        assert_eq!(config.forecast_weeks, defaults.forecast_weeks);
        assert_eq!(config.seed, defaults.seed);
        assert_eq!(config.regression_model_path, defaults.regression_model_path);
        assert_eq!(config.timeseries_model_path, defaults.timeseries_model_path);
        assert_eq!(config.eia_base_url, defaults.eia_base_url);
        assert_eq!(config.request_timeout, defaults.request_timeout);
    }

    #[test]
    fn week_counts_are_bounded() {
        for bad in ["0", "5201", "20000000", "-3", "many"] {
            assert!(Cli::try_parse_from(["fuelcast", "metrics", "--weeks", bad]).is_err(), "--weeks {bad}");
            assert!(Cli::try_parse_from(["fuelcast", "plot", "--horizon", bad]).is_err(), "--horizon {bad}");
        }
        let cli = Cli::try_parse_from(["fuelcast", "metrics", "--weeks", "5200", "--horizon", "1"]).unwrap();
        let Command::Metrics(args) = cli.command else {
            panic!("expected metrics subcommand");
        };
        assert_eq!(args.weeks, MAX_WEEKS);
        assert_eq!(args.horizon, 1);
    }

    #[test]
    fn forecast_accepts_exports() {
        let cli = Cli::parse_from([
            "fuelcast",
            "forecast",
            "--horizon",
            "8",
            "--export",
            "out.csv",
            "--export-json",
            "out.json",
            "--json",
        ]);
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast subcommand");
        };
        assert_eq!(args.common.horizon, 8);
        assert!(args.common.json);
        assert_eq!(args.export, Some(PathBuf::from("out.csv")));
        assert_eq!(args.export_json, Some(PathBuf::from("out.json")));
    }
}
