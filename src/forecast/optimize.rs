// src/forecast/optimize.rs
//! Derivative-free minimization (Nelder–Mead downhill simplex).

use std::time::Instant;

const TINY: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Hard cap on simplex iterations
    pub max_iterations: usize,
    /// Relative spread of vertex values at which the simplex is considered settled
    pub ftol: f64,
    /// Initial displacement along each axis when building the simplex
    pub initial_step: f64,
    /// Abort once this instant has passed
    pub deadline: Option<Instant>,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            ftol: 1e-8,
            initial_step: 0.5,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Converged,
    MaxIterations,
    Deadline,
}

#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub termination: Termination,
}

/// Minimize `f` starting from `x0`. NaN objective values are treated as +inf,
/// so the simplex walks away from regions where the objective breaks down.
pub fn nelder_mead<F>(mut f: F, x0: &[f64], config: &NelderMeadConfig) -> NelderMeadResult
where
    F: FnMut(&[f64]) -> f64,
{
    let n = x0.len();
    let mut eval = |x: &[f64]| {
        let v = f(x);
        if v.is_nan() {
            f64::INFINITY
        } else {
            v
        }
    };

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for i in 0..n {
        let mut v = x0.to_vec();
        v[i] += config.initial_step;
        simplex.push(v);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0;
    let termination = loop {
        // order vertices best → worst
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let best = values[0];
        let worst = values[n];
        if 2.0 * (worst - best).abs() <= config.ftol * (worst.abs() + best.abs() + TINY) {
            break Termination::Converged;
        }
        if iterations >= config.max_iterations {
            break Termination::MaxIterations;
        }
        if config.deadline.is_some_and(|d| Instant::now() >= d) {
            break Termination::Deadline;
        }
        iterations += 1;

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|v| v[j]).sum::<f64>() / n as f64)
            .collect();
        let toward = |t: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[n])
                .map(|(c, w)| c + t * (w - c))
                .collect()
        };

        let reflected = toward(-1.0);
        let f_reflected = eval(&reflected);

        if f_reflected < best {
            let expanded = toward(-2.0);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
            continue;
        }

        let (contracted, f_contracted) = if f_reflected < worst {
            let c = toward(-0.5);
            let fc = eval(&c);
            (c, fc)
        } else {
            let c = toward(0.5);
            let fc = eval(&c);
            (c, fc)
        };

        if f_contracted < worst.min(f_reflected) {
            simplex[n] = contracted;
            values[n] = f_contracted;
            continue;
        }

        // shrink toward the best vertex
        let anchor = simplex[0].clone();
        for i in 1..=n {
            let shrunk: Vec<f64> = anchor
                .iter()
                .zip(&simplex[i])
                .map(|(a, x)| a + 0.5 * (x - a))
                .collect();
            values[i] = eval(&shrunk);
            simplex[i] = shrunk;
        }
    };

    NelderMeadResult {
        point: simplex[0].clone(),
        value: values[0],
        iterations,
        termination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_quadratic_bowl() {
        let res = nelder_mead(
            |x| (x[0] - 1.5).powi(2) + 2.0 * (x[1] + 0.5).powi(2) + 3.0,
            &[0.0, 0.0],
            &NelderMeadConfig::default(),
        );
        assert_eq!(res.termination, Termination::Converged);
        assert!((res.point[0] - 1.5).abs() < 1e-3);
        assert!((res.point[1] + 0.5).abs() < 1e-3);
        assert!((res.value - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_rosenbrock_hits_iteration_cap() {
        let cfg = NelderMeadConfig {
            max_iterations: 5,
            ..Default::default()
        };
        let res = nelder_mead(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2),
            &[-1.2, 1.0],
            &cfg,
        );
        assert_eq!(res.termination, Termination::MaxIterations);
        assert_eq!(res.iterations, 5);
    }

    #[test]
    fn test_expired_deadline_stops_immediately() {
        let cfg = NelderMeadConfig {
            deadline: Some(Instant::now() - Duration::from_millis(1)),
            ..Default::default()
        };
        let res = nelder_mead(|x| (x[0] - 3.0).powi(2), &[0.0], &cfg);
        assert_eq!(res.termination, Termination::Deadline);
        assert_eq!(res.iterations, 0);
    }

    #[test]
    fn test_nan_region_is_avoided() {
        let res = nelder_mead(
            |x| if x[0] < 0.0 { f64::NAN } else { (x[0] - 0.25).powi(2) },
            &[1.0],
            &NelderMeadConfig::default(),
        );
        assert!(res.value.is_finite());
        assert!((res.point[0] - 0.25).abs() < 1e-3);
    }
}
