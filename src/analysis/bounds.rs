// src/analysis/bounds.rs

use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use super::deterministic::finite;
use super::ranges::RangeSpec;
use crate::error::{CalcError, Warning};
use crate::expr::{compile_with, Program};

/// Above this many ranges the 2^n corner search is replaced by the
/// all-min / all-max approximation.
pub const EXACT_RANGE_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn point(value: f64) -> Self {
        Self { min: value, max: value }
    }

    fn include(self, value: f64) -> Self {
        Self { min: self.min.min(value), max: self.max.max(value) }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundSolution {
    pub bounds: Option<Bounds>,
    pub approximate: bool,
    /// Combinations that produced a finite value.
    pub evaluated: usize,
    /// Combinations not attempted because they used an invalid range bound.
    pub skipped: usize,
    /// Combinations that failed to evaluate or were non-finite.
    pub failed: usize,
    pub warnings: Vec<Warning>,
    pub error: Option<CalcError>,
}

pub fn solve_bounds(placeholder_expr: &str, ranges: &[RangeSpec]) -> BoundSolution {
    let mut solution = BoundSolution::default();

    for range in ranges.iter().filter(|r| !r.is_valid()) {
        solution.warnings.push(Warning::InvalidRange(format!(
            "{} has bounds [{}, {}]; combinations using them are skipped",
            range.placeholder, range.min_val, range.max_val
        )));
    }

    let names: Vec<&str> = ranges.iter().map(|r| r.placeholder.as_str()).collect();
    let program = match compile_with(placeholder_expr, &names) {
        Ok(program) => program,
        Err(e) => {
            solution.error = Some(e.into());
            return solution;
        }
    };

    // Draws that are not ranges have no corners to enumerate.
    if program.is_probabilistic() {
        let detail = "expression samples a distribution that is not a range".to_string();
        debug!("{}", detail);
        solution.warnings.push(Warning::AnalyticalUnavailable(detail));
        return solution;
    }

    let corners: Box<dyn Iterator<Item = Vec<f64>> + '_> = if ranges.len() > EXACT_RANGE_LIMIT {
        solution.approximate = true;
        solution.warnings.push(Warning::Approximation { range_count: ranges.len() });
        Box::new(extreme_points(ranges))
    } else {
        Box::new(corner_combinations(ranges))
    };

    let mut last_error = None;
    for values in corners {
        if values.iter().any(|v| v.is_nan()) {
            solution.skipped += 1;
            continue;
        }
        match evaluate_corner(&program, &values) {
            Ok(value) => {
                solution.evaluated += 1;
                solution.bounds = Some(match solution.bounds {
                    Some(bounds) => bounds.include(value),
                    None => Bounds::point(value),
                });
            }
            Err(e) => {
                solution.failed += 1;
                last_error = Some(e);
            }
        }
    }

    debug!(
        ranges = ranges.len(),
        evaluated = solution.evaluated,
        skipped = solution.skipped,
        failed = solution.failed,
        "solved analytical bounds"
    );

    if solution.bounds.is_none() {
        let detail = match (ranges.len(), last_error) {
            (0, Some(e)) => e.to_string(),
            (_, Some(e)) => format!("every range combination failed; last error: {}", e),
            (_, None) => "every range combination used an invalid bound".to_string(),
        };
        warn!("{}", detail);
        solution.error = Some(CalcError::AllInvalid(detail));
    }

    solution
}

fn evaluate_corner(program: &Program, values: &[f64]) -> Result<f64, CalcError> {
    let value = program.evaluate(values)?;
    finite(value)
}

/// Every min/max assignment; bit `j` of counter `i` picks range `j`'s max.
fn corner_combinations(ranges: &[RangeSpec]) -> impl Iterator<Item = Vec<f64>> + '_ {
    (0..1usize << ranges.len()).map(move |i| {
        ranges
            .iter()
            .enumerate()
            .map(|(j, r)| if (i >> j) & 1 == 1 { r.max_val } else { r.min_val })
            .collect()
    })
}

fn extreme_points(ranges: &[RangeSpec]) -> impl Iterator<Item = Vec<f64>> + '_ {
    let all_min: Vec<f64> = ranges.iter().map(|r| r.min_val).collect();
    let all_max: Vec<f64> = ranges.iter().map(|r| r.max_val).collect();
    [all_min, all_max].into_iter()
}
