// src/analysis/simulation.rs

use rand::prelude::*;
use rand_distr::{Distribution as _, Normal, Uniform};
use tracing::{debug, warn};

use super::normalize::ProcessedExpression;
use crate::error::CalcError;
use crate::expr::{compile, Distribution, Environment};

pub fn build_rng(seed: Option<u64>) -> StdRng {
    if let Some(seed) = seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_entropy()
    }
}

/// Draws one value. Invalid parameters (min > max, non-finite bounds,
/// negative spread) give NaN so only the current iteration is lost.
pub fn sample_distribution<R: Rng + ?Sized>(distribution: Distribution, rng: &mut R) -> f64 {
    match distribution {
        Distribution::Uniform { min, max } => {
            if !min.is_finite() || !max.is_finite() || min > max {
                f64::NAN
            } else if min == max {
                min
            } else if (max - min).is_finite() {
                Uniform::new_inclusive(min, max).sample(rng)
            } else {
                // The span overflows f64; draw on the halved interval and scale back.
                2.0 * Uniform::new_inclusive(min / 2.0, max / 2.0).sample(rng)
            }
        }
        Distribution::Normal { mean, std_dev } => {
            if !mean.is_finite() || !std_dev.is_finite() || std_dev < 0.0 {
                f64::NAN
            } else if std_dev == 0.0 {
                mean
            } else {
                Normal::new(mean, std_dev).map_or(f64::NAN, |normal| normal.sample(rng))
            }
        }
        Distribution::Triangular { min, mode, max } => {
            let valid = [min, mode, max].iter().all(|v| v.is_finite()) && min <= mode && mode <= max;
            if !valid {
                f64::NAN
            } else if min == max {
                min
            } else {
                sample_triangular(min, max, mode, rng)
            }
        }
    }
}

fn sample_triangular<R: Rng + ?Sized>(min: f64, max: f64, mode: f64, rng: &mut R) -> f64 {
    let u: f64 = rng.gen();

    // Cumulative probability at the mode
    let f_c = (mode - min) / (max - min);

    if u < f_c {
        min + (u * (mode - min) * (max - min)).sqrt()
    } else {
        max - ((1.0 - u) * (max - mode) * (max - min)).sqrt()
    }
}

struct SamplingEnvironment<'a, R: Rng + ?Sized> {
    rng: &'a mut R,
}

impl<R: Rng + ?Sized> Environment for SamplingEnvironment<'_, R> {
    fn draw(&mut self, distribution: Distribution) -> f64 {
        sample_distribution(distribution, &mut *self.rng)
    }
}

/// Runs `iterations` independent evaluations of the normalized expression.
/// The result always has `iterations` entries; failed iterations are NaN.
pub fn run_simulation(processed: &ProcessedExpression, iterations: usize) -> Vec<f64> {
    run_simulation_with_rng(processed, iterations, &mut build_rng(None))
}

pub fn run_simulation_with_rng<R: Rng + ?Sized>(
    processed: &ProcessedExpression,
    iterations: usize,
    rng: &mut R,
) -> Vec<f64> {
    let program = match compile(&processed.expression) {
        Ok(program) => program,
        Err(e) => {
            warn!(expression = %processed.expression, "{}", CalcError::from(e));
            return vec![f64::NAN; iterations];
        }
    };

    let mut env = SamplingEnvironment { rng };
    let mut results = Vec::with_capacity(iterations);
    let mut failures = 0usize;

    for _ in 0..iterations {
        let value = match program.sample(&mut env) {
            Ok(value) if value.is_finite() => value,
            Ok(_) => {
                failures += 1;
                f64::NAN
            }
            Err(e) => {
                failures += 1;
                debug!("iteration failed: {}", e);
                f64::NAN
            }
        };
        results.push(value);
    }

    debug!(iterations, failures, "simulation finished");
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::normalize::process;

    fn simulate(raw: &str, iterations: usize) -> Vec<f64> {
        run_simulation_with_rng(&process(raw), iterations, &mut build_rng(Some(42)))
    }

    #[test]
    fn test_uniform_draws_stay_in_range() {
        let results = simulate("3~7", 2000);
        assert_eq!(results.len(), 2000);
        assert!(results.iter().all(|v| (3.0..=7.0).contains(v)));
    }

    #[test]
    fn test_degenerate_range_is_exact() {
        let results = simulate("5~5", 100);
        assert!(results.iter().all(|&v| v == 5.0));
    }

    #[test]
    fn test_inverted_range_is_invalid() {
        let results = simulate("7~3", 50);
        assert!(results.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_failed_iterations_do_not_abort_the_run() {
        let results = simulate("1 / round(-1~1)", 2000);
        assert_eq!(results.len(), 2000);
        assert!(results.iter().any(|v| v.is_nan()));
        assert!(results.iter().any(|v| v.is_finite()));
    }

    #[test]
    fn test_compile_failure_yields_all_nan() {
        let results = simulate("(1~2", 10);
        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let a = simulate("1~2 * 3~4", 100);
        let b = simulate("1~2 * 3~4", 100);
        assert_eq!(a, b);
    }

    #[test]
    fn test_span_wider_than_f64_still_samples() {
        let mut rng = build_rng(Some(3));
        let (min, max) = (-9e307, 9e307);
        for _ in 0..500 {
            let v = sample_distribution(Distribution::Uniform { min, max }, &mut rng);
            assert!(v.is_finite() && (min..=max).contains(&v));
        }
    }

    #[test]
    fn test_bare_distributions_are_sampled() {
        let results = simulate("uniform(1, 2) + normal(0, 0)", 300);
        assert!(results.iter().all(|v| (1.0..=2.0).contains(v)));
        let results = simulate("triangular(0, 1, 2) * 1~1", 300);
        assert!(results.iter().all(|v| (0.0..=2.0).contains(v)));
    }

    #[test]
    fn test_other_distributions() {
        let mut rng = build_rng(Some(7));
        for _ in 0..500 {
            let t = sample_distribution(Distribution::Triangular { min: 1.0, mode: 2.0, max: 4.0 }, &mut rng);
            assert!((1.0..=4.0).contains(&t));
        }
        assert_eq!(
            sample_distribution(Distribution::Normal { mean: 3.0, std_dev: 0.0 }, &mut rng),
            3.0
        );
        assert!(sample_distribution(Distribution::Normal { mean: 0.0, std_dev: -1.0 }, &mut rng).is_nan());
    }
}
