// src/expr/mod.rs
//! Arithmetic expressions shared by the bound solver and the sampler.
//! Parsing and evaluation are done by `meval`; this module adds named
//! placeholder bindings and the sampling calls (`sample`, `uniform`,
//! `normal`, `triangular`) on top of its context mechanism.

use thiserror::Error;

pub mod program;

pub use program::{compile, compile_with, Distribution, Environment, Program};

/// Structural failure: bad token, unbalanced parentheses, unknown name,
/// wrong number of arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(pub String);

impl From<meval::Error> for ParseError {
    fn from(err: meval::Error) -> Self {
        ParseError(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("no value bound for '{0}'")]
    MissingBinding(String),

    #[error("expression still contains a sampling construct")]
    UnresolvedSample,

    #[error("{0}")]
    Failed(String),
}

impl From<meval::Error> for EvalError {
    fn from(err: meval::Error) -> Self {
        EvalError::Failed(err.to_string())
    }
}
