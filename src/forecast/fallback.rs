// src/forecast/fallback.rs

use crate::error::ForecastError;

/// Growth multipliers applied to the last observation, one per horizon step.
pub const DEFAULT_GROWTH_MULTIPLIERS: [f64; 3] = [1.08, 1.15, 1.22];

/// Multiplier for `step` (0-based). Past the end of `multipliers` the last
/// increment keeps repeating, so `[1.08, 1.15, 1.22]` continues 1.29, 1.36, ...
/// A single-entry list repeats its own growth over 1.0.
pub fn multiplier(multipliers: &[f64], step: usize) -> f64 {
    match multipliers {
        [] => 1.0,
        _ if step < multipliers.len() => multipliers[step],
        [only] => 1.0 + (only - 1.0) * (step + 1) as f64,
        [.., prev, last] => {
            let extra = (step + 1 - multipliers.len()) as f64;
            last + (last - prev) * extra
        }
    }
}

/// Deterministic trend projection from the last observed value. A product
/// that leaves the f64 range is an error, not an infinity.
pub fn project(last: f64, multipliers: &[f64], horizon: usize) -> Result<Vec<f64>, ForecastError> {
    (0..horizon)
        .map(|step| {
            let value = last * multiplier(multipliers, step);
            if value.is_finite() {
                Ok(value)
            } else {
                Err(ForecastError::Overflow {
                    step: step + 1,
                    last,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_projection() {
        let fc = project(100.0, &DEFAULT_GROWTH_MULTIPLIERS, 3).unwrap();
        let expected = [108.0, 115.0, 122.0];
        for (a, b) in fc.iter().zip(expected) {
            assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_projection_extends_past_list() {
        let fc = project(100.0, &DEFAULT_GROWTH_MULTIPLIERS, 5).unwrap();
        assert_eq!(fc.len(), 5);
        assert!((fc[3] - 129.0).abs() < 1e-9);
        assert!((fc[4] - 136.0).abs() < 1e-9);
        assert!(fc.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_single_multiplier_compounds_linearly() {
        assert!((multiplier(&[1.1], 0) - 1.1).abs() < 1e-12);
        assert!((multiplier(&[1.1], 2) - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_zero_horizon() {
        assert!(project(50.0, &DEFAULT_GROWTH_MULTIPLIERS, 0).unwrap().is_empty());
    }

    #[test]
    fn test_overflow_is_reported() {
        let err = project(f64::MAX, &DEFAULT_GROWTH_MULTIPLIERS, 3).unwrap_err();
        assert_eq!(
            err,
            ForecastError::Overflow {
                step: 1,
                last: f64::MAX
            }
        );
        let near = project(f64::MAX / 1.1, &DEFAULT_GROWTH_MULTIPLIERS, 3).unwrap_err();
        assert!(matches!(near, ForecastError::Overflow { step: 2, .. }));
    }
}
