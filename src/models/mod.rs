//! Model host: the two pre-fitted forecasting models.
//!
//! Each model lives in a [`ModelSlot`] that is either loaded or explicitly
//! unavailable. Loading never fails the caller; prediction operations check the
//! slot first and report absence as a value (`None` or
//! [`PredictionError::ModelAbsent`]).

pub mod importance;
pub mod sarimax;
pub mod xgboost;

use tracing::{info, warn};

use crate::domain::{FeatureRow, FeatureScore, PipelineConfig};

pub use importance::fallback_importance;
pub use sarimax::Sarimax;
pub use xgboost::TreeEnsemble;

/// Why a model artifact could not be loaded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelLoadError {
    #[error("cannot read '{path}': {message}")]
    Io { path: String, message: String },
    #[error("malformed model file: {0}")]
    Format(String),
    #[error("invalid model: {0}")]
    Invalid(String),
}

/// Why a prediction call failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("model is not loaded")]
    ModelAbsent,
    #[error("non-finite prediction at position {index}")]
    NonFinite { index: usize },
    #[error("expected {expected} values, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Multi-step regression model over calendar + lag features.
pub trait RegressionModel: Send + Sync {
    fn name(&self) -> &str;

    /// One prediction per row, in order.
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, PredictionError>;

    fn feature_importance(&self) -> Option<Vec<FeatureScore>> {
        None
    }
}

/// Time-series model with one exogenous regressor.
pub trait TimeSeriesModel: Send + Sync {
    fn name(&self) -> &str;

    /// `horizon` values continuing from the end of the training sample.
    fn forecast(&self, future_exog: &[f64], horizon: usize) -> Result<Vec<f64>, PredictionError>;

    /// In-sample fitted values for positions `0..series_length`.
    fn fitted(&self, series_length: usize, exog: &[f64]) -> Result<Vec<f64>, PredictionError>;
}

/// A model that is either loaded or known to be unavailable.
pub enum ModelSlot<M: ?Sized> {
    Loaded(Box<M>),
    Unavailable { reason: String },
}

impl<M: ?Sized> ModelSlot<M> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        ModelSlot::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn get(&self) -> Option<&M> {
        match self {
            ModelSlot::Loaded(m) => Some(m.as_ref()),
            ModelSlot::Unavailable { .. } => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelSlot::Loaded(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            ModelSlot::Loaded(_) => None,
            ModelSlot::Unavailable { reason } => Some(reason),
        }
    }
}

impl<M: ?Sized> std::fmt::Debug for ModelSlot<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSlot::Loaded(_) => f.write_str("Loaded"),
            ModelSlot::Unavailable { reason } => f.debug_struct("Unavailable").field("reason", reason).finish(),
        }
    }
}

/// Holds at most one of each model kind.
#[derive(Debug)]
pub struct ModelHost {
    regression: ModelSlot<dyn RegressionModel>,
    timeseries: ModelSlot<dyn TimeSeriesModel>,
}

impl ModelHost {
    pub fn new(
        regression: ModelSlot<dyn RegressionModel>,
        timeseries: ModelSlot<dyn TimeSeriesModel>,
    ) -> Self {
        Self { regression, timeseries }
    }

    /// A host with neither model; every operation degrades.
    pub fn empty() -> Self {
        Self::new(
            ModelSlot::unavailable("not configured"),
            ModelSlot::unavailable("not configured"),
        )
    }

    /// Load both artifacts from the configured paths, independently.
    pub fn load(config: &PipelineConfig) -> Self {
        let regression = match TreeEnsemble::load(&config.regression_model_path) {
            Ok(model) => {
                info!(
                    path = %config.regression_model_path.display(),
                    trees = model.num_trees(),
                    "loaded regression model"
                );
                ModelSlot::Loaded(Box::new(model) as Box<dyn RegressionModel>)
            }
            Err(err) => {
                warn!(error = %err, "regression model unavailable");
                ModelSlot::unavailable(err.to_string())
            }
        };

        let timeseries = match Sarimax::load(&config.timeseries_model_path) {
            Ok(model) => {
                info!(
                    path = %config.timeseries_model_path.display(),
                    training_len = model.training_len(),
                    sigma2 = ?model.sigma2(),
                    "loaded time-series model"
                );
                ModelSlot::Loaded(Box::new(model) as Box<dyn TimeSeriesModel>)
            }
            Err(err) => {
                warn!(error = %err, "time-series model unavailable");
                ModelSlot::unavailable(err.to_string())
            }
        };

        Self::new(regression, timeseries)
    }

    pub fn regression(&self) -> &ModelSlot<dyn RegressionModel> {
        &self.regression
    }

    pub fn timeseries(&self) -> &ModelSlot<dyn TimeSeriesModel> {
        &self.timeseries
    }

    /// Forward forecast, or `None` if the model is absent or the call fails.
    pub fn predict_timeseries_forecast(&self, future_exog: &[f64], horizon: usize) -> Option<Vec<f64>> {
        let model = self.timeseries.get()?;
        let result = model
            .forecast(future_exog, horizon)
            .and_then(|v| expect_len(v, horizon));
        log_failure(model.name(), result)
    }

    /// In-sample fitted values over `0..series_length`, or `None`.
    pub fn predict_timeseries_insample(&self, series_length: usize, exog: &[f64]) -> Option<Vec<f64>> {
        let model = self.timeseries.get()?;
        let result = model
            .fitted(series_length, exog)
            .and_then(|v| expect_len(v, series_length));
        log_failure(model.name(), result)
    }

    /// Stateless regression, one value per row.
    pub fn predict_regression(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, PredictionError> {
        let model = self.regression.get().ok_or(PredictionError::ModelAbsent)?;
        model.predict(rows).and_then(|v| expect_len(v, rows.len()))
    }

    /// Normalized importance from the regression model, or `None`.
    pub fn feature_importance(&self) -> Option<Vec<FeatureScore>> {
        self.regression.get()?.feature_importance()
    }
}

fn expect_len(values: Vec<f64>, expected: usize) -> Result<Vec<f64>, PredictionError> {
    if values.len() == expected {
        Ok(values)
    } else {
        Err(PredictionError::LengthMismatch {
            expected,
            got: values.len(),
        })
    }
}

fn log_failure(model: &str, result: Result<Vec<f64>, PredictionError>) -> Option<Vec<f64>> {
    match result {
        Ok(v) => Some(v),
        Err(err) => {
            warn!(model, error = %err, "prediction failed");
            None
        }
    }
}
