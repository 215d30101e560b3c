//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - sets up logging and `.env`
//! - parses CLI arguments
//! - runs the forecast pipeline once
//! - prints tables, plots or JSON
//! - writes optional exports

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::app::pipeline::ForecastService;
use crate::cli::{Command, CommonArgs, ForecastArgs, PlotArgs};
use crate::error::{AppError, EXIT_COMPUTE};

pub mod pipeline;

/// Environment variable holding the EIA API key.
pub const EIA_API_KEY_VAR: &str = "EIA_API_KEY";

/// Entry point for the `fuelcast` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    // `fuelcast` and `fuelcast --weeks 26` behave like `fuelcast forecast ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Forecast(args) => handle_forecast(args),
        Command::Metrics(args) => handle_metrics(args),
        Command::Importance(args) => handle_importance(args),
        Command::Plot(args) => handle_plot(args),
    }
}

/// Logs go to stderr so stdout stays clean for tables and `--json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fuelcast=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn build_service(args: &CommonArgs) -> Result<Arc<ForecastService>, AppError> {
    let api_key = std::env::var(EIA_API_KEY_VAR).ok().filter(|k| !k.trim().is_empty());
    let config = args.to_config(api_key);
    let today = chrono::Local::now().date_naive();
    ForecastService::build(&config, today)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(EXIT_COMPUTE, format!("Failed to serialize output: {e}")))?;
    println!("{text}");
    Ok(())
}

fn handle_forecast(args: ForecastArgs) -> Result<(), AppError> {
    let service = build_service(&args.common)?;

    if args.common.json {
        print_json(&service.payload())?;
    } else {
        println!(
            "{}",
            crate::report::format::format_summary(
                service.origin(),
                service.get_timeline(),
                &service.get_metrics(),
                &service.branches(),
            )
        );
        println!("{}", crate::report::format::format_timeline(service.get_timeline()));
    }

    // Optional exports.
    if let Some(path) = &args.export {
        crate::io::write_timeline_csv(path, service.get_timeline())?;
    }
    if let Some(path) = &args.export_json {
        crate::io::write_json(path, &service.payload())?;
    }

    Ok(())
}

fn handle_metrics(args: CommonArgs) -> Result<(), AppError> {
    let service = build_service(&args)?;
    if args.json {
        return print_json(&service.get_metrics());
    }
    println!("{}", crate::report::format::format_metrics(&service.get_metrics()));
    Ok(())
}

fn handle_importance(args: CommonArgs) -> Result<(), AppError> {
    let service = build_service(&args)?;
    if args.json {
        return print_json(&service.get_feature_importance());
    }
    println!("{}", crate::report::format::format_importance(service.get_feature_importance()));
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let service = build_service(&args.common)?;
    let plot = crate::plot::render_timeline_plot(service.get_timeline(), args.width, args.height);
    println!("{plot}");
    Ok(())
}

/// Rewrite argv so `fuelcast` defaults to `fuelcast forecast`.
///
/// Rules:
/// - `fuelcast`                      -> `fuelcast forecast`
/// - `fuelcast --weeks 26 ...`       -> `fuelcast forecast --weeks 26 ...`
/// - `fuelcast --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("forecast".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "forecast" | "metrics" | "importance" | "plot");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "forecast flags".
    if arg1.starts_with('-') {
        argv.insert(1, "forecast".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_forecast() {
        assert_eq!(rewrite_args(args(&["fuelcast"])), args(&["fuelcast", "forecast"]));
        assert_eq!(
            rewrite_args(args(&["fuelcast", "--weeks", "26"])),
            args(&["fuelcast", "forecast", "--weeks", "26"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(rewrite_args(args(&["fuelcast", "plot"])), args(&["fuelcast", "plot"]));
        assert_eq!(rewrite_args(args(&["fuelcast", "--help"])), args(&["fuelcast", "--help"]));
        let cli = crate::cli::Cli::parse_from(rewrite_args(args(&["fuelcast", "--json"])));
        assert!(matches!(cli.command, Command::Forecast(ref a) if a.common.json));
    }
}
