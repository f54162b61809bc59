// src/error.rs
use std::fmt;

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::expr::{EvalError, ParseError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("range '{range}': bound '{bound}' is not a finite number")]
    RangeParse { range: String, bound: String },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("expression produced a non-finite result ({0})")]
    NonFiniteResult(f64),

    #[error("no valid results: {0}")]
    AllInvalid(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type CalcResult<T> = Result<T, CalcError>;

/// Non-blocking diagnostics attached to a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Warning {
    InvalidRange(String),
    Approximation { range_count: usize },
    InvalidSamples { invalid: usize, total: usize },
    AnalyticalUnavailable(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::InvalidRange(message) => write!(f, "invalid range definition: {}", message),
            Warning::Approximation { range_count } => write!(
                f,
                "analytical bounds are approximate: {} ranges exceed the exact corner search, \
                 so only the all-minimum and all-maximum combinations were evaluated; \
                 non-monotonic expressions may exceed these bounds",
                range_count
            ),
            Warning::InvalidSamples { invalid, total } => write!(
                f,
                "{} of {} iterations produced no finite value and were excluded",
                invalid, total
            ),
            Warning::AnalyticalUnavailable(message) => {
                write!(f, "analytical bounds unavailable: {}", message)
            }
        }
    }
}
