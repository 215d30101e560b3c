//! Synthetic price series used when the provider is unavailable.
//!
//! Each series is `base + trend + seasonal + noise`:
//! - trend: linear ramp from `trend_start` to `trend_end` across the span
//! - seasonal: `amplitude * sin(...)` over `cycles` full periods
//! - noise: Gaussian with `noise_std`, from a seeded RNG so runs are reproducible

use std::f64::consts::PI;

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

use crate::domain::{AlignedSeries, MAX_WEEKS, SeriesOrigin};

/// Shape parameters of one synthetic series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticProfile {
    pub base: f64,
    pub trend_start: f64,
    pub trend_end: f64,
    pub amplitude: f64,
    pub cycles: f64,
    pub noise_std: f64,
}

/// Weekly retail gasoline, $/gal.
pub const TARGET_PROFILE: SyntheticProfile = SyntheticProfile {
    base: 3.20,
    trend_start: 0.0,
    trend_end: 0.4,
    amplitude: 0.15,
    cycles: 1.0,
    noise_std: 0.05,
};

/// WTI crude, $/bbl.
pub const DRIVER_PROFILE: SyntheticProfile = SyntheticProfile {
    base: 75.0,
    trend_start: -10.0,
    trend_end: 10.0,
    amplitude: 5.0,
    cycles: 2.0,
    noise_std: 2.0,
};

/// Build a synthetic aligned series of `weeks + 1` Monday-dated points ending on
/// the last Monday on or before `today`. `weeks` is capped at `MAX_WEEKS`.
pub fn synthetic_series(weeks: usize, today: NaiveDate, seed: u64) -> AlignedSeries {
    let weeks = weeks.min(MAX_WEEKS);
    let n = weeks + 1;
    let end = last_monday(today);
    let dates: Vec<NaiveDate> = (0..n)
        .map(|k| end - Duration::weeks((weeks - k) as i64))
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let target = generate_values(&TARGET_PROFILE, n, &mut rng);
    let driver = generate_values(&DRIVER_PROFILE, n, &mut rng);

    AlignedSeries {
        dates,
        target,
        driver,
        origin: SeriesOrigin::Synthetic,
    }
}

fn generate_values(profile: &SyntheticProfile, n: usize, rng: &mut StdRng) -> Vec<f64> {
    let angle_end = 2.0 * PI * profile.cycles;
    (0..n)
        .map(|i| {
            let trend = linspace_at(profile.trend_start, profile.trend_end, n, i);
            let seasonal = profile.amplitude * linspace_at(0.0, angle_end, n, i).sin();
            let z: f64 = rng.sample(StandardNormal);
            profile.base + trend + seasonal + profile.noise_std * z
        })
        .collect()
}

/// The `i`-th of `n` evenly spaced values from `start` to `end` inclusive.
fn linspace_at(start: f64, end: f64, n: usize, i: usize) -> f64 {
    if n < 2 {
        return start;
    }
    start + (end - start) * i as f64 / (n as f64 - 1.0)
}

fn last_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}
