//! Process-level error for the `fuelcast` binary.
//!
//! Pipeline stages have their own narrow error enums (`SourceError`,
//! `ModelLoadError`, `PredictionError`, `ForecastError`, `MetricsError`) and
//! recover from them locally. Only what cannot be recovered reaches `AppError`,
//! which carries the exit code `main` reports.

use crate::forecast::ForecastError;
use crate::report::MetricsError;

/// Exit code for bad arguments or unwritable output paths.
pub const EXIT_USAGE: u8 = 2;
/// Exit code for unexpected computation failures.
pub const EXIT_COMPUTE: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        AppError::new(EXIT_COMPUTE, format!("Forecast generation failed: {err}"))
    }
}

impl From<MetricsError> for AppError {
    fn from(err: MetricsError) -> Self {
        AppError::new(EXIT_COMPUTE, format!("Metric computation failed: {err}"))
    }
}
