//! Formatted terminal output.
//!
//! Formatting stays in one place so the pipeline code stays free of layout
//! concerns and output changes are localized.

use crate::domain::{BranchReport, BranchSource, FeatureScore, Metrics, SeriesOrigin, TimelineRecord};

/// Run summary: data origin, span, metrics and which branches used a model.
pub fn format_summary(
    origin: SeriesOrigin,
    timeline: &[TimelineRecord],
    metrics: &Metrics,
    branches: &BranchReport,
) -> String {
    let mut out = String::new();

    out.push_str("=== fuelcast - Weekly Gasoline Forecast (EIA-based) ===\n");
    let origin_label = match origin {
        SeriesOrigin::Provider => "EIA",
        SeriesOrigin::Synthetic => "synthetic (provider unavailable)",
    };
    out.push_str(&format!("Data: {origin_label}\n"));

    let observed = timeline.iter().filter(|r| r.actual.is_some()).count();
    let first = timeline.first().map(|r| r.date.as_str()).unwrap_or("-");
    let last = timeline.last().map(|r| r.date.as_str()).unwrap_or("-");
    out.push_str(&format!(
        "Weeks: observed={observed} forecast={} | span=[{first}, {last}]\n",
        timeline.len() - observed
    ));

    out.push('\n');
    out.push_str(&format_metrics(metrics));

    out.push_str("\nBranches:\n");
    out.push_str(&format!(
        "  SARIMA  history={:<8} forecast={}\n",
        source_label(branches.timeseries_history),
        source_label(branches.timeseries_forecast)
    ));
    out.push_str(&format!(
        "  XGBoost history={:<8} forecast={}\n",
        source_label(branches.regression_history),
        source_label(branches.regression_forecast)
    ));
    out.push('\n');

    out
}

pub fn format_metrics(metrics: &Metrics) -> String {
    format!(
        "Current price: ${:.2}\nSARIMA RMSE : {:.3}\nXGBoost RMSE: {:.3}\n",
        metrics.current_price, metrics.timeseries_rmse, metrics.regression_rmse
    )
}

/// Week-by-week table; forecast rows show `-` for the actual price.
pub fn format_timeline(rows: &[TimelineRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<10} {:>8} {:>8} {:>8}\n", "date", "actual", "sarima", "xgboost"));
    out.push_str(&format!("{:-<10} {:-<8} {:-<8} {:-<8}\n", "", "", "", ""));

    let mut in_forecast = false;
    for r in rows {
        if r.actual.is_none() && !in_forecast {
            in_forecast = true;
            out.push_str("-- forecast --\n");
        }
        out.push_str(&format!(
            "{:<10} {:>8} {:>8} {:>8}\n",
            r.date,
            fmt_price(r.actual),
            fmt_price(r.timeseries),
            fmt_price(r.regression)
        ));
    }
    out
}

pub fn format_importance(scores: &[FeatureScore]) -> String {
    let width = scores
        .iter()
        .map(|s| s.feature.chars().count())
        .max()
        .unwrap_or(7)
        .max(7);
    let mut out = String::new();
    out.push_str(&format!("{:<width$} {:>6}\n", "feature", "score"));
    out.push_str(&format!("{:-<width$} {:-<6}\n", "", ""));
    for s in scores {
        out.push_str(&format!("{:<width$} {:>6.3}\n", s.feature, s.score));
    }
    out
}

fn fmt_price(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{x:.2}"),
        None => "-".to_string(),
    }
}

fn source_label(source: BranchSource) -> &'static str {
    match source {
        BranchSource::Model => "model",
        BranchSource::Fallback => "fallback",
    }
}
