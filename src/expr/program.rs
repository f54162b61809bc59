// src/expr/program.rs

use std::cell::{Cell, RefCell};
use std::fmt;

use meval::{Context, ContextProvider, Expr, FuncEvalError};

use super::{EvalError, ParseError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    Uniform { min: f64, max: f64 },
    Normal { mean: f64, std_dev: f64 },
    Triangular { min: f64, mode: f64, max: f64 },
}

impl Distribution {
    /// Interprets a function call as a draw. `None` when `name` is not a
    /// distribution.
    fn from_call(name: &str, args: &[f64]) -> Option<Result<Self, FuncEvalError>> {
        let distribution = match (name, args) {
            ("uniform", &[min, max]) => Distribution::Uniform { min, max },
            ("normal", &[mean, std_dev]) => Distribution::Normal { mean, std_dev },
            ("triangular", &[min, mode, max]) => Distribution::Triangular { min, mode, max },
            ("uniform" | "normal", _) => return Some(Err(FuncEvalError::NumberArgs(2))),
            ("triangular", _) => return Some(Err(FuncEvalError::NumberArgs(3))),
            _ => return None,
        };
        Some(Ok(distribution))
    }
}

/// Supplies random draws while a [`Program`] is sampled.
pub trait Environment {
    fn draw(&mut self, distribution: Distribution) -> f64;
}

// f64::min/max silently drop NaN operands; an invalid draw must stay invalid.
fn fold_nan_aware(args: &[f64], f: fn(f64, f64) -> f64) -> f64 {
    if args.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    args.iter().copied().reduce(f).unwrap_or(f64::NAN)
}

/// meval's builtins plus `log`/`log10` and NaN-preserving `min`/`max`.
fn builtins() -> Context<'static> {
    let mut ctx = Context::new();
    ctx.func("log", f64::log10);
    ctx.func("log10", f64::log10);
    ctx.funcn("min", |args: &[f64]| fold_nan_aware(args, f64::min), 1..);
    ctx.funcn("max", |args: &[f64]| fold_nan_aware(args, f64::max), 1..);
    ctx
}

/// Names visible to one evaluation: bound placeholders first, then builtins.
struct Scope<'a> {
    builtins: &'a Context<'static>,
    variables: &'a [String],
    values: &'a [f64],
}

impl ContextProvider for Scope<'_> {
    fn get_var(&self, name: &str) -> Option<f64> {
        match self.variables.iter().position(|v| v == name) {
            Some(slot) => self.values.get(slot).copied(),
            None => self.builtins.get_var(name),
        }
    }

    fn eval_func(&self, name: &str, args: &[f64]) -> Result<f64, FuncEvalError> {
        match (name, args) {
            ("sample", &[value]) => Ok(value),
            ("sample", _) => Err(FuncEvalError::NumberArgs(1)),
            _ => self.builtins.eval_func(name, args),
        }
    }
}

struct Sampling<'a, Env: ?Sized> {
    scope: Scope<'a>,
    env: RefCell<&'a mut Env>,
}

impl<Env: Environment + ?Sized> ContextProvider for Sampling<'_, Env> {
    fn get_var(&self, name: &str) -> Option<f64> {
        self.scope.get_var(name)
    }

    fn eval_func(&self, name: &str, args: &[f64]) -> Result<f64, FuncEvalError> {
        match Distribution::from_call(name, args) {
            Some(distribution) => {
                let distribution = distribution?;
                Ok(self.env.borrow_mut().draw(distribution))
            }
            None => self.scope.eval_func(name, args),
        }
    }
}

// Resolves every name at compile time and records whether any
// distribution is called.
struct Inspector<'a> {
    scope: Scope<'a>,
    sampled: &'a Cell<bool>,
}

impl ContextProvider for Inspector<'_> {
    fn get_var(&self, name: &str) -> Option<f64> {
        self.scope.get_var(name)
    }

    fn eval_func(&self, name: &str, args: &[f64]) -> Result<f64, FuncEvalError> {
        match Distribution::from_call(name, args) {
            Some(distribution) => {
                distribution?;
                self.sampled.set(true);
                Ok(0.0)
            }
            None => self.scope.eval_func(name, args),
        }
    }
}

/// A parsed expression whose names have all been resolved. Compile once,
/// evaluate many times.
pub struct Program {
    expr: Expr,
    source: String,
    variables: Vec<String>,
    probabilistic: bool,
    builtins: Context<'static>,
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("source", &self.source)
            .field("variables", &self.variables)
            .field("probabilistic", &self.probabilistic)
            .finish()
    }
}

pub fn compile(src: &str) -> Result<Program, ParseError> {
    compile_with::<&str>(src, &[])
}

/// Compiles `src` with `variables` as bindable names. Any other identifier
/// that is not a builtin constant or function is a parse error.
pub fn compile_with<S: AsRef<str>>(src: &str, variables: &[S]) -> Result<Program, ParseError> {
    let expr: Expr = src.parse()?;
    let variables: Vec<String> = variables.iter().map(|v| v.as_ref().to_string()).collect();
    let builtins = builtins();

    let sampled = Cell::new(false);
    let zeros = vec![0.0; variables.len()];
    // `Expr::check_context` is private; `bindn_with_context` with no extra
    // variables runs exactly that check against the given context.
    drop(expr.clone().bindn_with_context(
        Inspector {
            scope: Scope { builtins: &builtins, variables: &variables, values: &zeros },
            sampled: &sampled,
        },
        &[],
    )?);

    Ok(Program {
        expr,
        source: src.to_string(),
        variables,
        probabilistic: sampled.get(),
        builtins,
    })
}

impl Program {
    pub fn is_probabilistic(&self) -> bool {
        self.probabilistic
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    fn scope<'a>(&'a self, values: &'a [f64]) -> Scope<'a> {
        Scope { builtins: &self.builtins, variables: &self.variables, values }
    }

    /// Evaluates with `values` bound to the variables by position.
    /// Arithmetic faults are not errors: division by zero and friends come
    /// back as infinities or NaN for the caller to judge.
    pub fn evaluate(&self, values: &[f64]) -> Result<f64, EvalError> {
        if self.probabilistic {
            return Err(EvalError::UnresolvedSample);
        }
        if let Some(missing) = self.variables.get(values.len()) {
            return Err(EvalError::MissingBinding(missing.clone()));
        }
        Ok(self.expr.eval_with_context(self.scope(values))?)
    }

    /// Evaluates once, taking one draw from `env` per distribution call.
    pub fn sample<Env: Environment + ?Sized>(&self, env: &mut Env) -> Result<f64, EvalError> {
        let sampling = Sampling { scope: self.scope(&[]), env: RefCell::new(env) };
        Ok(self.expr.eval_with_context(sampling)?)
    }
}
