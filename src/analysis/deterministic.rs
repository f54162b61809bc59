// src/analysis/deterministic.rs

use crate::error::{CalcError, CalcResult};
use crate::expr::compile;

/// Evaluates an expression that contains no ranges or sampling calls.
/// Infinite and NaN results are reported as [`CalcError::NonFiniteResult`].
pub fn evaluate_deterministic(expr: &str) -> CalcResult<f64> {
    let program = compile(expr)?;
    let value = program.evaluate(&[])?;
    finite(value)
}

/// Collapses a raw evaluation value into the finite-or-error representation.
pub fn finite(value: f64) -> CalcResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalcError::NonFiniteResult(value))
    }
}
