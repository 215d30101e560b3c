//! Small descriptive statistics over price series.

use rand::Rng;
use rand_distr::StandardNormal;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator); `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    Some(var.sqrt())
}

/// Period-over-period fractional changes, skipping steps from a zero level.
pub fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .filter(|c| c.is_finite())
        .collect()
}

/// Standard deviation of period-over-period changes, or 0 when undefined.
pub fn pct_change_std(values: &[f64]) -> f64 {
    sample_std(&pct_changes(values)).filter(|s| s.is_finite()).unwrap_or(0.0)
}

/// One draw from `N(0, std^2)`.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, std: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    z * std
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
