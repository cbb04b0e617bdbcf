// src/forecast/arima.rs
//! ARIMA(1,1,1) without constant, fitted by conditional sum of squares.
//!
//! On the first difference `w_t = y_t - y_{t-1}` the model is
//!
//! ```text
//! w_t = φ w_{t-1} + e_t + θ e_{t-1}
//! ```
//!
//! `φ` and `θ` are searched through `tanh`. The search can still saturate
//! `tanh` to exactly ±1, so the fitted pair is checked before use.

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

use super::optimize::{nelder_mead, NelderMeadConfig, Termination};
use crate::error::ModelFitFailure;

/// Fitted coefficients, reported alongside model forecasts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArimaParams {
    pub phi: f64,
    pub theta: f64,
    /// Residual variance of the fit
    pub sigma2: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct FitBudget {
    pub max_iterations: usize,
    pub max_duration: Duration,
}

/// A fitted model, ready to project.
#[derive(Debug, Clone)]
pub struct Arima111 {
    params: ArimaParams,
    last_level: f64,
    last_diff: f64,
    last_residual: f64,
}

impl Arima111 {
    /// Fit to `series` (levels, not differences). The caller has already
    /// checked length and finiteness.
    pub fn fit(series: &[f64], budget: &FitBudget) -> Result<Self, ModelFitFailure> {
        let w: Vec<f64> = series.windows(2).map(|p| p[1] - p[0]).collect();
        if w.len() < 3 {
            return Err(ModelFitFailure::TooShort {
                required: 4,
                actual: series.len(),
            });
        }

        let n = w.len() as f64;
        let rms = (w.iter().map(|x| x * x).sum::<f64>() / n).sqrt();
        let scale = if rms > 0.0 { rms } else { 1.0 };

        let unpack = |x: &[f64]| (x[0].tanh(), x[1].tanh());
        let objective = |x: &[f64]| {
            let (phi, theta) = unpack(x);
            let (sse, _) = css(&w, phi, theta);
            sse / (n * scale * scale)
        };

        let config = NelderMeadConfig {
            max_iterations: budget.max_iterations,
            deadline: Some(Instant::now() + budget.max_duration),
            ..Default::default()
        };
        let res = nelder_mead(objective, &[0.0, 0.0], &config);
        debug!(
            iterations = res.iterations,
            value = res.value,
            termination = ?res.termination,
            "css optimisation finished"
        );

        match res.termination {
            Termination::Converged => {}
            Termination::MaxIterations => {
                return Err(ModelFitFailure::NotConverged {
                    iterations: res.iterations,
                })
            }
            Termination::Deadline => {
                return Err(ModelFitFailure::Timeout {
                    budget_ms: budget.max_duration.as_millis() as u64,
                })
            }
        }

        let (phi, theta) = unpack(&res.point);
        let (sse, last_residual) = css(&w, phi, theta);
        let sigma2 = sse / (n - 1.0);
        check_params(phi, theta, sigma2)?;

        Ok(Self {
            params: ArimaParams {
                phi,
                theta,
                sigma2,
                iterations: res.iterations,
            },
            last_level: series[series.len() - 1],
            last_diff: w[w.len() - 1],
            last_residual,
        })
    }

    pub fn params(&self) -> &ArimaParams {
        &self.params
    }

    /// Project `steps` levels past the end of the fitted series.
    pub fn predict(&self, steps: usize) -> Result<Vec<f64>, ModelFitFailure> {
        let ArimaParams { phi, theta, .. } = self.params;

        let mut out = Vec::with_capacity(steps);
        let mut level = self.last_level;
        let mut prev_diff = self.last_diff;
        for step in 0..steps {
            // future shocks are zero; only the first step sees the last residual
            let ma = if step == 0 { theta * self.last_residual } else { 0.0 };
            let diff = phi * prev_diff + ma;
            level += diff;
            if !level.is_finite() {
                return Err(ModelFitFailure::Unstable {
                    reason: format!("projection diverged at step {}", step + 1),
                });
            }
            out.push(level);
            prev_diff = diff;
        }
        Ok(out)
    }
}

/// Accept only finite, stationary (`|φ| < 1`) and invertible (`|θ| < 1`) fits.
pub fn check_params(phi: f64, theta: f64, sigma2: f64) -> Result<(), ModelFitFailure> {
    for (name, v) in [("phi", phi), ("theta", theta), ("sigma2", sigma2)] {
        if !v.is_finite() {
            return Err(ModelFitFailure::Unstable {
                reason: format!("{} is {}", name, v),
            });
        }
    }
    if phi.abs() >= 1.0 {
        return Err(ModelFitFailure::Unstable {
            reason: format!("phi {} is not stationary", phi),
        });
    }
    if theta.abs() >= 1.0 {
        return Err(ModelFitFailure::Unstable {
            reason: format!("theta {} is not invertible", theta),
        });
    }
    Ok(())
}

/// Conditional sum of squares with `e_0 = 0`; returns (SSE, last residual).
fn css(w: &[f64], phi: f64, theta: f64) -> (f64, f64) {
    let mut prev_e = 0.0;
    let mut sse = 0.0;
    for t in 1..w.len() {
        let e = w[t] - phi * w[t - 1] - theta * prev_e;
        sse += e * e;
        prev_e = e;
    }
    (sse, prev_e)
}
