//! Seasonal ARIMA with one exogenous regressor (SARIMAX), evaluated from
//! pre-fitted parameters.
//!
//! Model:
//!
//! ```text
//! y_t = c + β·x_t + u_t
//! φ(B) Φ(B^s) (1-B)^d (1-B^s)^D u_t = θ(B) Θ(B^s) ε_t
//! ```
//!
//! with `φ(B) = 1 - φ1 B - ...` and `θ(B) = 1 + θ1 B + ...` (statsmodels sign
//! conventions). Predictions use the conditional recursion: pre-sample
//! innovations are zero, and future innovations are zero when forecasting.

use std::path::Path;

use serde::Deserialize;

use crate::models::{ModelLoadError, PredictionError, TimeSeriesModel};

/// On-disk parameter file.
#[derive(Debug, Clone, Deserialize)]
pub struct SarimaxParams {
    /// `(p, d, q)`
    pub order: [usize; 3],
    /// `(P, D, Q, s)`
    #[serde(default = "no_season")]
    pub seasonal_order: [usize; 4],
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub exog_coef: f64,
    #[serde(default)]
    pub ar: Vec<f64>,
    #[serde(default)]
    pub ma: Vec<f64>,
    #[serde(default)]
    pub seasonal_ar: Vec<f64>,
    #[serde(default)]
    pub seasonal_ma: Vec<f64>,
    #[serde(default)]
    pub sigma2: Option<f64>,
    /// Training sample of the target.
    pub endog: Vec<f64>,
    /// Training sample of the exogenous regressor.
    pub exog: Vec<f64>,
}

fn no_season() -> [usize; 4] {
    [0, 0, 0, 0]
}

#[derive(Debug, Clone)]
pub struct Sarimax {
    intercept: f64,
    exog_coef: f64,
    /// `a[k-1]` multiplies `w_{t-k}`.
    ar: Vec<f64>,
    /// `m[k-1]` multiplies `e_{t-k}`.
    ma: Vec<f64>,
    /// `delta[k-1]` multiplies `u_{t-k}` when undoing differencing.
    delta: Vec<f64>,
    endog: Vec<f64>,
    exog: Vec<f64>,
    sigma2: Option<f64>,
}

impl Sarimax {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let text = std::fs::read_to_string(path).map_err(|e| ModelLoadError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ModelLoadError> {
        let params: SarimaxParams =
            serde_json::from_str(text).map_err(|e| ModelLoadError::Format(e.to_string()))?;
        Self::from_params(params)
    }

    pub fn from_params(params: SarimaxParams) -> Result<Self, ModelLoadError> {
        let [p, d, q] = params.order;
        let [sp, sd, sq, s] = params.seasonal_order;

        let check_len = |name: &str, got: usize, want: usize| {
            if got == want {
                Ok(())
            } else {
                Err(ModelLoadError::Invalid(format!(
                    "{name} has {got} coefficients, order requires {want}"
                )))
            }
        };
        check_len("ar", params.ar.len(), p)?;
        check_len("ma", params.ma.len(), q)?;
        check_len("seasonal_ar", params.seasonal_ar.len(), sp)?;
        check_len("seasonal_ma", params.seasonal_ma.len(), sq)?;

        if (sp + sd + sq) > 0 && s < 2 {
            return Err(ModelLoadError::Invalid(format!(
                "seasonal period must be at least 2, got {s}"
            )));
        }
        if params.endog.len() != params.exog.len() {
            return Err(ModelLoadError::Invalid(format!(
                "endog ({}) and exog ({}) lengths differ",
                params.endog.len(),
                params.exog.len()
            )));
        }
        let diff_order = d + sd * s;
        if params.endog.len() <= diff_order {
            return Err(ModelLoadError::Invalid(format!(
                "training sample of {} points is too short for differencing order {diff_order}",
                params.endog.len()
            )));
        }

        let mut values = [params.intercept, params.exog_coef]
            .into_iter()
            .chain(params.ar.iter().copied())
            .chain(params.ma.iter().copied())
            .chain(params.seasonal_ar.iter().copied())
            .chain(params.seasonal_ma.iter().copied())
            .chain(params.endog.iter().copied())
            .chain(params.exog.iter().copied());
        if values.any(|v| !v.is_finite()) {
            return Err(ModelLoadError::Invalid("non-finite parameter or sample value".to_string()));
        }

        let ar_poly = poly_mul(
            &lag_polynomial(&params.ar, 1, -1.0),
            &lag_polynomial(&params.seasonal_ar, s, -1.0),
        );
        let ma_poly = poly_mul(
            &lag_polynomial(&params.ma, 1, 1.0),
            &lag_polynomial(&params.seasonal_ma, s, 1.0),
        );
        let mut diff_poly = vec![1.0];
        for _ in 0..d {
            diff_poly = poly_mul(&diff_poly, &[1.0, -1.0]);
        }
        for _ in 0..sd {
            diff_poly = poly_mul(&diff_poly, &lag_polynomial(&[1.0], s, -1.0));
        }

        Ok(Self {
            intercept: params.intercept,
            exog_coef: params.exog_coef,
            ar: ar_poly[1..].iter().map(|c| -c).collect(),
            ma: ma_poly[1..].to_vec(),
            delta: diff_poly[1..].iter().map(|c| -c).collect(),
            endog: params.endog,
            exog: params.exog,
            sigma2: params.sigma2,
        })
    }

    pub fn training_len(&self) -> usize {
        self.endog.len()
    }

    /// Innovation variance from the fit, reported when the model is loaded.
    pub fn sigma2(&self) -> Option<f64> {
        self.sigma2
    }

    fn regression(&self, x: f64) -> f64 {
        self.intercept + self.exog_coef * x
    }

    /// One-step-ahead predictions of the error process `u` for `0..total`.
    ///
    /// Positions inside `observed` use the observed history; positions past it
    /// are predicted dynamically from earlier predictions. Positions inside the
    /// differencing window repeat the observation.
    fn predict_errors(&self, observed: &[f64], total: usize) -> Vec<f64> {
        let dlen = self.delta.len();
        let mut u = Vec::with_capacity(total);
        let mut w = vec![0.0; total];
        let mut e = vec![0.0; total];
        let mut u_hat = Vec::with_capacity(total);

        for t in 0..total {
            if t < dlen {
                // `observed` is at least `dlen + 1` long (checked at load time or by the caller).
                let v = observed.get(t).copied().unwrap_or(0.0);
                u.push(v);
                u_hat.push(v);
                continue;
            }

            let mut w_hat = 0.0;
            for (k, a) in self.ar.iter().enumerate() {
                let lag = k + 1;
                if t >= dlen + lag {
                    w_hat += a * w[t - lag];
                }
            }
            for (k, m) in self.ma.iter().enumerate() {
                let lag = k + 1;
                if t >= dlen + lag {
                    w_hat += m * e[t - lag];
                }
            }
            let integrated: f64 = self
                .delta
                .iter()
                .enumerate()
                .map(|(k, dk)| dk * u[t - k - 1])
                .sum();
            let pred = w_hat + integrated;
            u_hat.push(pred);

            match observed.get(t) {
                Some(&actual) => {
                    w[t] = actual - integrated;
                    e[t] = w[t] - w_hat;
                    u.push(actual);
                }
                None => {
                    w[t] = w_hat;
                    u.push(pred);
                }
            }
        }

        u_hat
    }
}

impl TimeSeriesModel for Sarimax {
    fn name(&self) -> &str {
        "sarimax"
    }

    fn forecast(&self, future_exog: &[f64], horizon: usize) -> Result<Vec<f64>, PredictionError> {
        if future_exog.len() < horizon {
            return Err(PredictionError::LengthMismatch {
                expected: horizon,
                got: future_exog.len(),
            });
        }

        let observed: Vec<f64> = self
            .endog
            .iter()
            .zip(&self.exog)
            .map(|(y, x)| y - self.regression(*x))
            .collect();
        let n = observed.len();
        let u_hat = self.predict_errors(&observed, n + horizon);

        finite(
            u_hat[n..]
                .iter()
                .zip(future_exog)
                .map(|(u, x)| self.regression(*x) + u)
                .collect(),
        )
    }

    fn fitted(&self, series_length: usize, exog: &[f64]) -> Result<Vec<f64>, PredictionError> {
        if exog.len() < series_length {
            return Err(PredictionError::LengthMismatch {
                expected: series_length,
                got: exog.len(),
            });
        }

        let n_obs = self.endog.len().min(series_length);
        let observed: Vec<f64> = self.endog[..n_obs]
            .iter()
            .zip(exog)
            .map(|(y, x)| y - self.regression(*x))
            .collect();
        if observed.len() <= self.delta.len() && series_length > observed.len() {
            return Err(PredictionError::InvalidInput(
                "not enough observations to start the recursion".to_string(),
            ));
        }
        let u_hat = self.predict_errors(&observed, series_length);

        finite(
            u_hat
                .iter()
                .zip(exog)
                .map(|(u, x)| self.regression(*x) + u)
                .collect(),
        )
    }
}

fn finite(values: Vec<f64>) -> Result<Vec<f64>, PredictionError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(PredictionError::NonFinite { index }),
        None => Ok(values),
    }
}

/// `1 + sign·c1·B^step + sign·c2·B^(2·step) + ...` as a dense coefficient vector.
fn lag_polynomial(coeffs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut out = vec![0.0; coeffs.len() * step + 1];
    out[0] = 1.0;
    for (i, c) in coeffs.iter().enumerate() {
        out[(i + 1) * step] = sign * c;
    }
    out
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(order: [usize; 3]) -> SarimaxParams {
        SarimaxParams {
            order,
            seasonal_order: [0, 0, 0, 0],
            intercept: 0.0,
            exog_coef: 0.0,
            ar: vec![],
            ma: vec![],
            seasonal_ar: vec![],
            seasonal_ma: vec![],
            sigma2: None,
            endog: vec![],
            exog: vec![],
        }
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len(), "{a:?} vs {b:?}");
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn seasonal_ar_polynomial_expansion() {
        let p = poly_mul(&lag_polynomial(&[0.5], 1, -1.0), &lag_polynomial(&[0.2], 4, -1.0));
        assert_close(&p, &[1.0, -0.5, 0.0, 0.0, -0.2, 0.1]);
    }

    #[test]
    fn ar1_fitted_and_forecast() {
        let model = Sarimax::from_params(SarimaxParams {
            ar: vec![0.5],
            endog: vec![1.0, 2.0, 4.0],
            exog: vec![0.0; 3],
            ..params([1, 0, 0])
        })
        .unwrap();

        let fitted = model.fitted(3, &[0.0; 3]).unwrap();
        assert_close(&fitted, &[0.0, 0.5, 1.0]);

        let fc = model.forecast(&[0.0, 0.0], 2).unwrap();
        assert_close(&fc, &[2.0, 1.0]);
    }

    #[test]
    fn random_walk_with_exog() {
        let model = Sarimax::from_params(SarimaxParams {
            exog_coef: 0.1,
            endog: vec![11.0, 13.0, 16.0],
            exog: vec![10.0, 10.0, 10.0],
            ..params([0, 1, 0])
        })
        .unwrap();

        // u = [10, 12, 15]; burn-in repeats the first observation.
        let fitted = model.fitted(3, &[10.0, 10.0, 10.0]).unwrap();
        assert_close(&fitted, &[11.0, 11.0, 13.0]);

        // Future u stays at 15; the regression term follows the new exog.
        let fc = model.forecast(&[20.0, 30.0], 2).unwrap();
        assert_close(&fc, &[17.0, 18.0]);
    }

    #[test]
    fn ma1_uses_innovations() {
        let model = Sarimax::from_params(SarimaxParams {
            ma: vec![0.5],
            endog: vec![1.0, 2.0],
            exog: vec![0.0, 0.0],
            ..params([0, 0, 1])
        })
        .unwrap();

        let fitted = model.fitted(2, &[0.0, 0.0]).unwrap();
        assert_close(&fitted, &[0.0, 0.5]);
        let fc = model.forecast(&[0.0, 0.0], 2).unwrap();
        assert_close(&fc, &[0.75, 0.0]);
    }

    #[test]
    fn fitted_extends_past_training_sample() {
        let model = Sarimax::from_params(SarimaxParams {
            ar: vec![0.5],
            endog: vec![1.0, 2.0, 4.0],
            exog: vec![0.0; 3],
            ..params([1, 0, 0])
        })
        .unwrap();

        let fitted = model.fitted(5, &[0.0; 5]).unwrap();
        assert_close(&fitted, &[0.0, 0.5, 1.0, 2.0, 1.0]);
        assert!(model.fitted(5, &[0.0; 4]).is_err());
    }

    #[test]
    fn forecast_requires_enough_exog() {
        let model = Sarimax::from_params(SarimaxParams {
            endog: vec![1.0, 2.0],
            exog: vec![0.0, 0.0],
            ..params([0, 0, 0])
        })
        .unwrap();
        let err = model.forecast(&[1.0], 3).unwrap_err();
        assert_eq!(err, PredictionError::LengthMismatch { expected: 3, got: 1 });
    }

    #[test]
    fn invalid_parameter_files_are_rejected() {
        let bad_len = SarimaxParams {
            ar: vec![0.5, 0.1],
            endog: vec![1.0, 2.0],
            exog: vec![0.0, 0.0],
            ..params([1, 0, 0])
        };
        assert!(Sarimax::from_params(bad_len).is_err());

        let bad_season = SarimaxParams {
            seasonal_order: [1, 0, 0, 1],
            seasonal_ar: vec![0.3],
            endog: vec![1.0, 2.0],
            exog: vec![0.0, 0.0],
            ..params([0, 0, 0])
        };
        assert!(Sarimax::from_params(bad_season).is_err());

        let too_short = SarimaxParams {
            endog: vec![1.0],
            exog: vec![0.0],
            ..params([0, 1, 0])
        };
        assert!(Sarimax::from_params(too_short).is_err());

        assert!(Sarimax::from_json_str("{\"order\": [1, 0]}").is_err());
    }

    #[test]
    fn parses_json_parameter_file() {
        let text = r#"{
            "order": [1, 0, 0],
            "seasonal_order": [0, 0, 0, 0],
            "intercept": 0.5,
            "exog_coef": 0.04,
            "ar": [0.8],
            "sigma2": 0.0021,
            "endog": [3.5, 3.6, 3.55],
            "exog": [75.0, 76.0, 74.0]
        }"#;
        let model = Sarimax::from_json_str(text).unwrap();
        assert_eq!(model.training_len(), 3);
        assert_eq!(model.sigma2(), Some(0.0021));
        let fc = model.forecast(&[75.0, 75.0, 75.0], 3).unwrap();
        assert_eq!(fc.len(), 3);
        assert!(fc.iter().all(|v| v.is_finite()));
    }
}
