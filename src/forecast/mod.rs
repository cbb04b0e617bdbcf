// src/forecast/mod.rs
//! Short-horizon projection of one yearly series.
//!
//! The primary method is an ARIMA(1,1,1) fit ([`arima`]); whenever that is
//! not applicable the engine falls back to a fixed growth schedule
//! ([`fallback`]) and says so in the result.

pub mod arima;
pub mod fallback;
pub mod optimize;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{ConfigError, ForecastError, ModelFitFailure};
use arima::{Arima111, ArimaParams, FitBudget};
use fallback::DEFAULT_GROWTH_MULTIPLIERS;

/// Which procedure produced a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Estimate from the fitted statistical model
    Model,
    /// Approximation from the growth schedule
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    pub horizon: usize,
    pub values: Vec<f64>,
    pub method: Method,
    /// Fitted coefficients when `method == Model`
    pub model: Option<ArimaParams>,
    /// Why the model was skipped when `method == Fallback`
    pub fallback_reason: Option<ModelFitFailure>,
}

impl ForecastResult {
    pub fn is_fallback(&self) -> bool {
        self.method == Method::Fallback
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Shortest series the model is attempted on
    pub min_points: usize,
    pub growth_multipliers: Vec<f64>,
    pub max_iterations: usize,
    pub max_fit_time_ms: u64,
    /// When false the model is treated as unavailable and every forecast falls back
    pub primary_enabled: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_points: 5,
            growth_multipliers: DEFAULT_GROWTH_MULTIPLIERS.to_vec(),
            max_iterations: 500,
            max_fit_time_ms: 250,
            primary_enabled: true,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_points < 4 {
            return Err(ConfigError::Invalid {
                name: "min_points",
                reason: format!("{} is below the 4 points an ARIMA(1,1,1) fit needs", self.min_points),
            });
        }
        if self.growth_multipliers.is_empty() {
            return Err(ConfigError::Invalid {
                name: "growth_multipliers",
                reason: "at least one multiplier is required".into(),
            });
        }
        let mut prev = 1.0;
        for &m in &self.growth_multipliers {
            if !m.is_finite() || m <= prev {
                return Err(ConfigError::Invalid {
                    name: "growth_multipliers",
                    reason: format!("{:?} must be finite, above 1.0 and strictly increasing", self.growth_multipliers),
                });
            }
            prev = m;
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid {
                name: "max_iterations",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    fn budget(&self) -> FitBudget {
        FitBudget {
            max_iterations: self.max_iterations,
            max_duration: Duration::from_millis(self.max_fit_time_ms),
        }
    }
}

/// Stateless apart from its configuration; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct ForecastEngine {
    config: ForecastConfig,
}

impl ForecastEngine {
    pub fn new(config: ForecastConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Project `horizon` values past the end of `series`.
    ///
    /// Fit failures are recovered with the growth schedule. An empty or
    /// non-finite series is a caller error and is returned as such.
    #[tracing::instrument(level = "debug", skip(self, series), fields(points = series.len()))]
    pub fn forecast(&self, series: &[f64], horizon: usize) -> Result<ForecastResult, ForecastError> {
        let Some(&last) = series.last() else {
            return Err(ForecastError::EmptySeries);
        };
        if let Some((index, &value)) = series.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ForecastError::InvalidSeries { index, value });
        }

        let attempt = self.fit_and_project(series, horizon);
        self.resolve(last, horizon, attempt)
    }

    /// Turn a fit attempt into a labeled result. Every fit failure falls back
    /// to the growth schedule and keeps its reason on the result.
    fn resolve(
        &self,
        last: f64,
        horizon: usize,
        attempt: Result<(Vec<f64>, ArimaParams), ModelFitFailure>,
    ) -> Result<ForecastResult, ForecastError> {
        match attempt {
            Ok((values, params)) => {
                info!(horizon, phi = params.phi, theta = params.theta, "model forecast");
                Ok(ForecastResult {
                    horizon,
                    values,
                    method: Method::Model,
                    model: Some(params),
                    fallback_reason: None,
                })
            }
            Err(reason) => {
                warn!(horizon, %reason, "model unavailable, using growth schedule");
                Ok(ForecastResult {
                    horizon,
                    values: fallback::project(last, &self.config.growth_multipliers, horizon)?,
                    method: Method::Fallback,
                    model: None,
                    fallback_reason: Some(reason),
                })
            }
        }
    }

    fn fit_and_project(
        &self,
        series: &[f64],
        horizon: usize,
    ) -> Result<(Vec<f64>, ArimaParams), ModelFitFailure> {
        if !self.config.primary_enabled {
            return Err(ModelFitFailure::Disabled);
        }
        if series.len() < self.config.min_points {
            return Err(ModelFitFailure::TooShort {
                required: self.config.min_points,
                actual: series.len(),
            });
        }
        let model = Arima111::fit(series, &self.config.budget())?;
        let values = model.predict(horizon)?;
        Ok((values, model.params().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ForecastEngine {
        ForecastEngine::new(ForecastConfig::default()).unwrap()
    }

    #[test]
    fn test_length_matches_horizon_for_any_length() {
        let e = engine();
        for len in 1..=12 {
            let series: Vec<f64> = (0..len).map(|t| 10.0 + 2.0 * t as f64).collect();
            let fc = e.forecast(&series, 3).unwrap();
            assert_eq!(fc.values.len(), 3, "series length {}", len);
            assert_eq!(fc.horizon, 3);
        }
    }

    #[test]
    fn test_short_series_uses_fallback() {
        let fc = engine().forecast(&[90.0, 95.0, 100.0], 3).unwrap();
        assert_eq!(fc.method, Method::Fallback);
        assert_eq!(
            fc.fallback_reason,
            Some(ModelFitFailure::TooShort {
                required: 5,
                actual: 3
            })
        );
        let expected = [108.0, 115.0, 122.0];
        for (a, b) in fc.values.iter().zip(expected) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_long_series_uses_model() {
        let series = arima::tests::ar_series();
        let fc = engine().forecast(&series, 3).unwrap();
        assert_eq!(fc.method, Method::Model);
        assert!(fc.fallback_reason.is_none());

        let params = fc.model.unwrap();
        let last = *series.last().unwrap();
        let d1 = fc.values[0] - last;
        let d2 = fc.values[1] - fc.values[0];
        assert!((d2 - params.phi * d1).abs() < 1e-9);
    }

    #[test]
    fn test_timeout_falls_back() {
        let e = ForecastEngine::new(ForecastConfig {
            max_fit_time_ms: 0,
            ..Default::default()
        })
        .unwrap();
        let series = arima::tests::ar_series();
        let fc = e.forecast(&series, 4).unwrap();
        assert_eq!(fc.method, Method::Fallback);
        assert_eq!(fc.fallback_reason, Some(ModelFitFailure::Timeout { budget_ms: 0 }));
        assert_eq!(fc.values.len(), 4);
        assert!(fc.model.is_none());
    }

    #[test]
    fn test_unstable_fit_falls_back() {
        let reason = ModelFitFailure::Unstable {
            reason: "phi 1 is not stationary".into(),
        };
        let fc = engine().resolve(200.0, 3, Err(reason.clone())).unwrap();
        assert_eq!(fc.method, Method::Fallback);
        assert_eq!(fc.fallback_reason, Some(reason));
        assert_eq!(fc.values.len(), 3);
        assert!((fc.values[0] - 216.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_overflow_is_an_error() {
        let series = [f64::MAX / 2.0, f64::MAX / 1.5, f64::MAX];
        let err = engine().forecast(&series, 3).unwrap_err();
        assert!(matches!(err, ForecastError::Overflow { step: 1, .. }), "{:?}", err);
    }

    #[test]
    fn test_disabled_model_falls_back() {
        let e = ForecastEngine::new(ForecastConfig {
            primary_enabled: false,
            ..Default::default()
        })
        .unwrap();
        let series: Vec<f64> = (0..10).map(|t| t as f64).collect();
        let fc = e.forecast(&series, 2).unwrap();
        assert!(fc.is_fallback());
        assert_eq!(fc.fallback_reason, Some(ModelFitFailure::Disabled));
    }

    #[test]
    fn test_iteration_cap_falls_back() {
        let e = ForecastEngine::new(ForecastConfig {
            max_iterations: 1,
            ..Default::default()
        })
        .unwrap();
        let series = [3.0, 7.0, 4.0, 9.0, 5.0, 11.0, 6.0];
        let fc = e.forecast(&series, 3).unwrap();
        assert!(fc.is_fallback());
        assert!(matches!(
            fc.fallback_reason,
            Some(ModelFitFailure::NotConverged { .. })
        ));
        assert_eq!(fc.values.len(), 3);
    }

    #[test]
    fn test_invalid_series_fails_loudly() {
        let e = engine();
        assert_eq!(e.forecast(&[], 3).unwrap_err(), ForecastError::EmptySeries);
        let err = e.forecast(&[1.0, f64::NAN, 3.0], 3).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidSeries { index: 1, .. }));
    }

    #[test]
    fn test_config_validation() {
        let bad = ForecastConfig {
            growth_multipliers: vec![1.1, 1.05],
            ..Default::default()
        };
        assert!(ForecastEngine::new(bad).is_err());

        let too_small = ForecastConfig {
            min_points: 2,
            ..Default::default()
        };
        assert!(too_small.validate().is_err());
    }
}
