// src/analysis/calculator.rs

use rand::Rng;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::bounds::{solve_bounds, Bounds};
use super::deterministic::evaluate_deterministic;
use super::normalize::{normalize, normalize_lexical, ProcessedExpression};
use super::ranges::{extract_ranges, RangeSpec};
use super::simulation::{build_rng, run_simulation_with_rng};
use super::statistics::{summarize, ConfidenceInterval, HistogramBin, Percentile, Summary};
use crate::config::Settings;
use crate::error::{CalcError, Warning};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationOutcome {
    pub id: Uuid,
    pub timestamp: String,
    pub expression: String,
    pub normalized: String,
    pub is_deterministic: bool,
    pub ranges: Vec<RangeSpec>,
    /// Value with every range at its midpoint.
    pub nominal: Option<f64>,
    pub analytical: Option<Bounds>,
    /// Set when `analytical` came from the all-min/all-max approximation.
    pub approximate: bool,
    pub simulated: Option<Bounds>,
    pub mean: f64,
    pub std_dev: f64,
    pub percentiles: Vec<Percentile>,
    pub confidence_intervals: Vec<ConfidenceInterval>,
    pub histogram: Vec<HistogramBin>,
    pub iterations: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub warnings: Vec<Warning>,
    pub error: Option<String>,
}

impl CalculationOutcome {
    fn new(expression: &str, processed: &ProcessedExpression) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            expression: expression.to_string(),
            normalized: processed.expression.clone(),
            is_deterministic: !processed.is_probabilistic,
            ranges: processed.ranges.clone(),
            nominal: None,
            analytical: None,
            approximate: false,
            simulated: None,
            mean: f64::NAN,
            std_dev: f64::NAN,
            percentiles: Vec::new(),
            confidence_intervals: Vec::new(),
            histogram: Vec::new(),
            iterations: 0,
            valid_count: 0,
            invalid_count: 0,
            warnings: Vec::new(),
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn apply_summary(&mut self, summary: Summary) {
        self.simulated = (summary.valid_count > 0).then_some(Bounds { min: summary.min, max: summary.max });
        self.mean = summary.mean;
        self.std_dev = summary.std_dev;
        self.percentiles = summary.percentiles;
        self.confidence_intervals = summary.confidence_intervals;
        self.histogram = summary.histogram;
        self.valid_count = summary.valid_count;
        self.invalid_count = summary.invalid_count;
    }
}

/// Runs the whole pipeline for one expression with a fresh random source.
pub fn calculate(raw: &str, settings: &Settings) -> CalculationOutcome {
    calculate_with_rng(raw, settings, &mut build_rng(settings.seed))
}

pub fn calculate_with_rng<R: Rng + ?Sized>(raw: &str, settings: &Settings, rng: &mut R) -> CalculationOutcome {
    // Ranges are extracted from the lexically normalized text so that the
    // bound solver sees the same implicit multiplications as the sampler.
    let extraction = extract_ranges(&normalize_lexical(raw));
    let processed = ProcessedExpression {
        ranges: extraction.ranges,
        ..normalize(raw)
    };
    debug!(normalized = %processed.expression, ranges = processed.ranges.len(), "processed expression");

    let mut outcome = CalculationOutcome::new(raw, &processed);
    outcome.warnings.extend(
        extraction
            .errors
            .iter()
            .map(|e| Warning::InvalidRange(e.to_string())),
    );

    if !processed.is_probabilistic {
        run_deterministic(&mut outcome, &processed, settings);
        return outcome;
    }

    outcome.nominal = evaluate_deterministic(&extraction.substituted_expr).ok();

    let solution = solve_bounds(&extraction.placeholder_expr, &processed.ranges);
    outcome.analytical = solution.bounds;
    outcome.approximate = solution.approximate;
    outcome.warnings.extend(solution.warnings);
    let bound_error = solution.error;

    let results = run_simulation_with_rng(&processed, settings.iterations, rng);
    outcome.iterations = results.len();
    outcome.apply_summary(summarize(
        &results,
        settings.histogram_bins,
        &settings.percentiles,
        settings.confidence,
    ));

    if outcome.invalid_count > 0 {
        outcome.warnings.push(Warning::InvalidSamples {
            invalid: outcome.invalid_count,
            total: outcome.iterations,
        });
    }

    if outcome.valid_count == 0 {
        let err = CalcError::AllInvalid(format!(
            "all {} iterations of '{}' were invalid",
            outcome.iterations, processed.expression
        ));
        warn!("{}", err);
        outcome.error = Some(err.to_string());
    } else if let Some(err) = bound_error {
        match err {
            CalcError::AllInvalid(_) => outcome.error = Some(err.to_string()),
            other => outcome.warnings.push(Warning::AnalyticalUnavailable(other.to_string())),
        }
    }

    info!(
        expression = raw,
        valid = outcome.valid_count,
        invalid = outcome.invalid_count,
        "calculation finished"
    );
    outcome
}

fn run_deterministic(outcome: &mut CalculationOutcome, processed: &ProcessedExpression, settings: &Settings) {
    match evaluate_deterministic(&processed.expression) {
        Ok(value) => {
            outcome.nominal = Some(value);
            outcome.analytical = Some(Bounds::point(value));
            outcome.iterations = 1;
            outcome.apply_summary(summarize(
                &[value],
                settings.histogram_bins,
                &settings.percentiles,
                settings.confidence,
            ));
        }
        Err(err) => {
            warn!(expression = %processed.expression, "{}", err);
            outcome.error = Some(err.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(iterations: usize) -> Settings {
        Settings { iterations, seed: Some(1234), ..Settings::default() }
    }

    #[test]
    fn test_deterministic_expression() {
        let outcome = calculate("2 + 3 * 4", &settings(1000));
        assert!(outcome.is_ok());
        assert!(outcome.is_deterministic);
        assert_eq!(outcome.mean, 14.0);
        assert_eq!(outcome.std_dev, 0.0);
        assert_eq!(outcome.analytical, Some(Bounds::point(14.0)));
        assert_eq!(outcome.simulated, Some(Bounds::point(14.0)));
        assert_eq!(outcome.histogram.len(), 1);
    }

    #[test]
    fn test_deterministic_failure_is_reported() {
        let outcome = calculate("1 / 0", &settings(10));
        assert!(!outcome.is_ok());
        assert!(outcome.error.unwrap().contains("non-finite"));
    }

    #[test]
    fn test_degenerate_range_collapses() {
        let outcome = calculate("5~5", &settings(500));
        assert!(outcome.is_ok());
        assert_eq!(outcome.analytical, Some(Bounds::point(5.0)));
        assert_eq!(outcome.simulated, Some(Bounds::point(5.0)));
        assert_eq!(outcome.std_dev, 0.0);
        assert_eq!(outcome.histogram.len(), 1);
    }

    #[test]
    fn test_range_sum() {
        let outcome = calculate("1~2 + 1~2", &settings(5000));
        assert!(outcome.is_ok());
        assert!(!outcome.is_deterministic);
        assert_eq!(outcome.analytical, Some(Bounds { min: 2.0, max: 4.0 }));
        assert_eq!(outcome.nominal, Some(3.0));
        let simulated = outcome.simulated.unwrap();
        assert!(simulated.min >= 2.0 && simulated.max <= 4.0);
        assert!((outcome.mean - 3.0).abs() < 0.05);
        assert_eq!(outcome.histogram.len(), 23);
        assert_eq!(outcome.iterations, 5000);
    }

    #[test]
    fn test_division_through_zero_survives() {
        let outcome = calculate("1 / round(-1~1)", &settings(2000));
        assert!(outcome.is_ok());
        assert!(outcome.invalid_count > 0);
        assert!(outcome.mean.is_finite());
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::InvalidSamples { .. })));
    }

    #[test]
    fn test_all_invalid_is_an_error() {
        let outcome = calculate("7~3", &settings(100));
        assert!(!outcome.is_ok());
        assert_eq!(outcome.valid_count, 0);
        assert!(outcome.simulated.is_none());
    }

    #[test]
    fn test_bare_distributions_are_not_blocking() {
        let outcome = calculate("uniform(1, 2)", &settings(400));
        assert!(outcome.is_ok());
        assert!(!outcome.is_deterministic);
        assert!(outcome.analytical.is_none());
        assert_eq!(outcome.valid_count, 400);
        assert!((1.0..=2.0).contains(&outcome.mean));
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::AnalyticalUnavailable(_))));

        let outcome = calculate("1~2 + normal(0, 1)", &settings(400));
        assert!(outcome.is_ok());
        assert_eq!(outcome.ranges.len(), 1);
        assert_eq!(outcome.valid_count, 400);
    }

    #[test]
    fn test_extreme_finite_bounds_do_not_abort() {
        let huge = format!("9{}", "0".repeat(307));
        let outcome = calculate(&format!("-{}~{}", huge, huge), &settings(300));
        assert!(outcome.is_ok());
        assert_eq!(outcome.analytical, Some(Bounds { min: -9e307, max: 9e307 }));
        assert_eq!(outcome.valid_count, 300);
        let simulated = outcome.simulated.unwrap();
        assert!(simulated.min >= -9e307 && simulated.max <= 9e307);
    }

    #[test]
    fn test_unparsable_bound_is_an_error() {
        let outcome = calculate(&format!("1~{} + 1", "9".repeat(400)), &settings(50));
        assert!(!outcome.is_ok());
        assert!(outcome.ranges[0].max_val.is_nan());
        assert_eq!(outcome.valid_count, 0);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::InvalidRange(_))));
    }

    #[test]
    fn test_outcome_ids_are_unique() {
        let a = calculate("1 + 1", &settings(1));
        let b = calculate("1 + 1", &settings(1));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_approximation_flag() {
        let raw = (0..9).map(|_| "0~1").collect::<Vec<_>>().join(" + ");
        let outcome = calculate(&raw, &settings(200));
        assert!(outcome.is_ok());
        assert!(outcome.approximate);
        assert_eq!(outcome.analytical, Some(Bounds { min: 0.0, max: 9.0 }));
    }
}
