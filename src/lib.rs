// src/lib.rs
//! Monte Carlo evaluation of arithmetic expressions with uncertain
//! quantities written as ranges (`a~b`).
//!
//! ```
//! use rangecalc::{calculate, Settings};
//!
//! let settings = Settings { iterations: 1000, seed: Some(7), ..Settings::default() };
//! let outcome = calculate("1~2 + 1~2", &settings);
//! let bounds = outcome.analytical.unwrap();
//! assert_eq!((bounds.min, bounds.max), (2.0, 4.0));
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod expr;
pub mod ui;

pub use analysis::{calculate, CalculationOutcome};
pub use config::Settings;
pub use error::{CalcError, CalcResult, Warning};
